use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UrlOutcome {
    /// Converted to WebP.
    Converted { local_path: String },
    /// Conversion failed; the downloaded bytes were kept under an inferred extension.
    KeptOriginal { local_path: String, reason: String },
    /// Processing failed but a leftover download was kept as `.jpg`.
    Salvaged { local_path: String, reason: String },
    /// Nothing usable on disk; the URL stays in the source file.
    Failed { reason: String },
}

impl UrlOutcome {
    pub fn local_path(&self) -> Option<&str> {
        match self {
            UrlOutcome::Converted { local_path }
            | UrlOutcome::KeptOriginal { local_path, .. }
            | UrlOutcome::Salvaged { local_path, .. } => Some(local_path),
            UrlOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlReport {
    pub url: String,
    pub name: String,
    #[serde(flatten)]
    pub outcome: UrlOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub converted: usize,
    pub kept_original: usize,
    pub salvaged: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub source: PathBuf,
    pub raw_matches: usize,
    pub unique_urls: usize,
    pub dry_run: bool,
    /// Whether the source file was written back.
    pub rewritten: bool,
    pub entries: Vec<UrlReport>,
}

impl RunReport {
    /// URL to local path for every URL that ended up with a file on disk.
    pub fn mapping(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry
                    .outcome
                    .local_path()
                    .map(|path| (entry.url.clone(), path.to_string()))
            })
            .collect()
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for entry in &self.entries {
            match entry.outcome {
                UrlOutcome::Converted { .. } => counts.converted += 1,
                UrlOutcome::KeptOriginal { .. } => counts.kept_original += 1,
                UrlOutcome::Salvaged { .. } => counts.salvaged += 1,
                UrlOutcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))?;
        Ok(())
    }
}
