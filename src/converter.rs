//! WebP conversion backends.
//!
//! A conversion only counts when the backend returns `Ok` *and* the output file
//! exists afterwards; the pipeline checks the second half.

use image::io::Reader as ImageReader;
use image::DynamicImage;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::ConvertError;

pub const DEFAULT_QUALITY: u8 = 80;

/// Converts the image at `input` into a WebP file at `output`.
#[cfg_attr(test, mockall::automock)]
pub trait ImageConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;
}

impl<T: ImageConverter + ?Sized> ImageConverter for Box<T> {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        (**self).convert(input, output)
    }
}

/// In-process encoder built on the `image` and `webp` crates.
#[derive(Debug, Clone)]
pub struct NativeConverter {
    quality: f32,
}

impl NativeConverter {
    /// `quality` is clamped to 1..=100; the CLI validates the same range up front.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: f32::from(quality.clamp(1, 100)),
        }
    }
}

impl Default for NativeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl ImageConverter for NativeConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        // The staged file is always named `.jpg`, so sniff the real format.
        let decoded = ImageReader::open(input)?.with_guessed_format()?.decode()?;

        // libwebp only takes 8-bit RGB or RGBA.
        let image = if decoded.color().has_alpha() {
            DynamicImage::ImageRgba8(decoded.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(decoded.to_rgb8())
        };

        let encoder =
            webp::Encoder::from_image(&image).map_err(|e| ConvertError::Encode(e.to_string()))?;
        let encoded = encoder.encode(self.quality);
        fs::write(output, &*encoded)?;

        debug!(
            input = %input.display(),
            output = %output.display(),
            bytes = encoded.len(),
            "encoded WebP"
        );
        Ok(())
    }
}

/// Command-line converters that can write WebP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalTool {
    /// macOS `sips`.
    Sips,
    /// `cwebp` from libwebp.
    Cwebp,
}

impl ExternalTool {
    pub fn program(self) -> &'static str {
        match self {
            ExternalTool::Sips => "sips",
            ExternalTool::Cwebp => "cwebp",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExternalConverter {
    tool: ExternalTool,
    quality: u8,
}

impl ExternalConverter {
    pub fn new(tool: ExternalTool, quality: u8) -> Self {
        Self {
            tool,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(self.tool.program());
        match self.tool {
            ExternalTool::Sips => {
                command
                    .args(["-s", "format", "webp"])
                    .arg(input)
                    .arg("--out")
                    .arg(output);
            }
            ExternalTool::Cwebp => {
                command
                    .args(["-quiet", "-q"])
                    .arg(self.quality.to_string())
                    .arg(input)
                    .arg("-o")
                    .arg(output);
            }
        }
        command
    }
}

impl ImageConverter for ExternalConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let program = self.tool.program();
        if which::which(program).is_err() {
            return Err(ConvertError::ToolNotFound(program));
        }

        let status = self
            .command(input, output)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(ConvertError::ToolFailed {
                tool: program,
                status,
            });
        }
        Ok(())
    }
}

/// Never converts, so every image keeps its original encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConversion;

impl ImageConverter for NoConversion {
    fn convert(&self, _input: &Path, _output: &Path) -> Result<(), ConvertError> {
        Err(ConvertError::Disabled)
    }
}
