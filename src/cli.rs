use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use url::Url;

use crate::converter::{
    ExternalConverter, ExternalTool, ImageConverter, NativeConverter, NoConversion,
};
use crate::downloader::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::extractor::DEFAULT_HOST_PREFIX;
use crate::localizer::LocalizerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "image-localizer",
    about = "Download remote images referenced by a source file and point it at local copies",
    version,
    long_about = "Scans a source file for quoted image URLs, downloads every unique image, converts it to WebP when possible and rewrites the file to reference the local copies. Running without arguments processes src/data/books.ts into public/images."
)]
pub struct LocalizeCommand {
    /// Source file containing the image URLs; rewritten in place
    #[arg(short, long, default_value = "src/data/books.ts")]
    pub source: PathBuf,

    /// Directory the images are written to
    #[arg(short = 'o', long, default_value = "public/images")]
    pub images_dir: PathBuf,

    /// Path prefix written into the source file in place of each URL
    #[arg(long, default_value = "/images")]
    pub public_prefix: String,

    /// Only quoted URLs starting with this prefix are localized
    #[arg(long, default_value = DEFAULT_HOST_PREFIX, value_parser = parse_host_prefix)]
    pub host_prefix: String,

    /// How downloaded images are converted to WebP
    #[arg(short, long, value_enum, default_value_t = ConverterKind::Native)]
    pub converter: ConverterKind,

    /// WebP quality (1-100)
    #[arg(short, long, default_value = "80", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Timeout for each request in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// User agent string to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// List the URLs that would be downloaded and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of every URL's outcome to this file
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConverterKind {
    /// Built-in encoder
    Native,
    /// macOS `sips`
    Sips,
    /// libwebp's `cwebp`
    Cwebp,
    /// Keep every image in its original format
    #[value(name = "none")]
    Off,
}

impl ConverterKind {
    pub fn build(self, quality: u8) -> Box<dyn ImageConverter> {
        match self {
            ConverterKind::Native => Box::new(NativeConverter::new(quality)),
            ConverterKind::Sips => Box::new(ExternalConverter::new(ExternalTool::Sips, quality)),
            ConverterKind::Cwebp => Box::new(ExternalConverter::new(ExternalTool::Cwebp, quality)),
            ConverterKind::Off => Box::new(NoConversion),
        }
    }
}

impl LocalizeCommand {
    pub fn to_config(&self) -> LocalizerConfig {
        LocalizerConfig {
            source_path: self.source.clone(),
            images_dir: self.images_dir.clone(),
            public_prefix: self.public_prefix.clone(),
            host_prefix: self.host_prefix.clone(),
            dry_run: self.dry_run,
        }
    }
}

fn parse_host_prefix(value: &str) -> Result<String, String> {
    let url = Url::parse(value).map_err(|e| format!("invalid URL prefix: {}", e))?;

    match url.scheme() {
        "http" | "https" => Ok(value.to_string()),
        scheme => Err(format!("unsupported scheme: {}", scheme)),
    }
}
