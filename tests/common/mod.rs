#![allow(dead_code)]

use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb, Rgba};
use image_localizer::{Fetch, FetchError};
use std::collections::HashMap;
use std::io::Cursor;

/// Serves fixed bytes per URL; unknown URLs answer 404.
pub struct MemoryFetcher {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new(entries: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            images: entries
                .into_iter()
                .map(|(url, bytes)| (url.to_string(), bytes))
                .collect(),
        }
    }
}

impl Fetch for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.images.get(url).cloned().ok_or_else(|| FetchError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            url: url.to_string(),
        })
    }
}

pub fn jpeg_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(16, 16, Rgb([30u8, 90, 200])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Jpeg(90))
        .unwrap();
    bytes
}

pub fn png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(16, 16, Rgba([250u8, 200, 0, 180])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

pub fn is_webp(bytes: &[u8]) -> bool {
    bytes.len() > 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}
