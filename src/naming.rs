//! Deterministic names for downloaded images.

use sha2::{Digest, Sha256};

/// Extension used for successfully converted images.
pub const WEBP_EXTENSION: &str = "webp";

/// Extension used when nothing better can be inferred.
pub const DEFAULT_EXTENSION: &str = "jpg";

const DIGEST_PREFIX_LEN: usize = 8;

/// Base file name for `url`: `img_` followed by the first 8 hex digits of its SHA-256.
///
/// The name depends only on the URL, so repeated runs land on the same file.
pub fn image_basename(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("img_{}", &digest[..DIGEST_PREFIX_LEN])
}

/// Extension for an image kept in its original encoding.
///
/// Matches `.png` anywhere in the URL, query string included.
pub fn infer_extension(url: &str) -> &'static str {
    if url.contains(".png") {
        "png"
    } else {
        DEFAULT_EXTENSION
    }
}
