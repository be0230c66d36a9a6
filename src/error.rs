use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failure while downloading a single image.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while converting a downloaded image to WebP.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("`{0}` command not found")]
    ToolNotFound(&'static str),

    #[error("`{tool}` exited with {status}")]
    ToolFailed {
        tool: &'static str,
        status: ExitStatus,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to encode WebP: {0}")]
    Encode(String),

    #[error("WebP file not created: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("conversion disabled")]
    Disabled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a URL could not be resolved to a local file.
#[derive(Error, Debug)]
pub enum UrlError {
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not keep original file: {0}")]
    Keep(#[source] std::io::Error),
}
