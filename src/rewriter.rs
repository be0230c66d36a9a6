use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::extractor::UrlExtractor;

/// Replaces every quoted occurrence of each mapped URL with its local path.
///
/// Matching goes through the extractor's pattern, so only complete URLs are
/// replaced and unmapped URLs stay verbatim even when a mapped URL is a prefix
/// of them.
pub fn rewrite(
    extractor: &UrlExtractor,
    content: &str,
    mapping: &BTreeMap<String, String>,
) -> String {
    extractor.replace_matches(content, |url| mapping.get(url).cloned())
}

/// Replaces `path` with `content` through a sibling temp file and a rename.
///
/// Keeps the permissions of the file being replaced.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write temp file for {:?}", path))?;

    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .with_context(|| format!("Failed to copy permissions of {:?}", path))?;
    }
    temp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync temp file for {:?}", path))?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {:?}", path))?;

    Ok(())
}
