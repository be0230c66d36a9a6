use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::converter::ImageConverter;
use crate::downloader::Fetch;
use crate::error::{ConvertError, FetchError, UrlError};
use crate::extractor::{UrlExtractor, DEFAULT_HOST_PREFIX};
use crate::file_manager::FileManager;
use crate::naming::{image_basename, infer_extension, DEFAULT_EXTENSION, WEBP_EXTENSION};
use crate::report::{RunReport, UrlOutcome, UrlReport};
use crate::rewriter;

/// Where to read from, where to write to, and what to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizerConfig {
    pub source_path: PathBuf,
    pub images_dir: PathBuf,
    /// Prefix of the paths written into the source file, e.g. `/images`.
    pub public_prefix: String,
    pub host_prefix: String,
    /// List what would be downloaded without touching the network or disk.
    pub dry_run: bool,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("src/data/books.ts"),
            images_dir: PathBuf::from("public/images"),
            public_prefix: "/images".to_string(),
            host_prefix: DEFAULT_HOST_PREFIX.to_string(),
            dry_run: false,
        }
    }
}

/// Downloads the images referenced by a source file and points the file at local copies.
///
/// URLs are handled one at a time; a failure on one URL is recorded in the
/// report and never stops the run. Only reading or writing the source file,
/// and creating the images directory, are fatal.
pub struct ImageLocalizer<F, C> {
    config: LocalizerConfig,
    fetcher: F,
    converter: C,
}

impl<F: Fetch, C: ImageConverter> ImageLocalizer<F, C> {
    pub fn new(config: LocalizerConfig, fetcher: F, converter: C) -> Self {
        Self {
            config,
            fetcher,
            converter,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let source = &self.config.source_path;
        let content = fs::read_to_string(source)
            .with_context(|| format!("Failed to read source file: {:?}", source))?;

        let extractor = UrlExtractor::new(&self.config.host_prefix)?;
        let extraction = extractor.extract(&content);
        println!(
            "🔎 Found {} unique images ({} references) in {:?}",
            extraction.urls.len().to_string().cyan(),
            extraction.raw_matches,
            source
        );

        let mut report = RunReport {
            source: source.clone(),
            raw_matches: extraction.raw_matches,
            unique_urls: extraction.urls.len(),
            dry_run: self.config.dry_run,
            rewritten: false,
            entries: Vec::with_capacity(extraction.urls.len()),
        };

        if self.config.dry_run {
            for url in &extraction.urls {
                println!("   {} -> {}", url.blue(), image_basename(url));
            }
            return Ok(report);
        }

        let store = FileManager::new(&self.config.images_dir, &self.config.public_prefix)?;

        let total = extraction.urls.len();
        let progress = ProgressBar::new(total as u64);
        progress.set_style(
            ProgressStyle::default_bar().template("{spinner} [{bar:30}] {pos}/{len} {msg}")?,
        );

        for (i, url) in extraction.urls.iter().enumerate() {
            progress.suspend(|| println!("📥 Downloading [{}/{}]: {}", i + 1, total, url.blue()));
            progress.set_message(image_basename(url));

            let report_entry = self.localize_url(&store, url, &progress).await;
            report.entries.push(report_entry);
            progress.inc(1);
        }
        progress.finish_and_clear();

        let rewritten = rewriter::rewrite(&extractor, &content, &report.mapping());
        if rewritten != content {
            rewriter::write_atomic(source, &rewritten)?;
            report.rewritten = true;
            info!(source = %source.display(), "source file rewritten");
        } else {
            debug!(source = %source.display(), "source file unchanged");
        }

        Ok(report)
    }

    async fn localize_url(&self, store: &FileManager, url: &str, progress: &ProgressBar) -> UrlReport {
        let name = image_basename(url);

        let failure = match self.download(store, url, &name).await {
            Ok(()) => match self.convert_or_keep(store, url, &name, progress) {
                Ok(outcome) => {
                    return UrlReport {
                        url: url.to_string(),
                        name,
                        outcome,
                    }
                }
                Err(e) => UrlError::Keep(e),
            },
            Err(e) => UrlError::Fetch(e),
        };

        progress.suspend(|| println!("❌ Error processing {}: {}", url, failure));

        let outcome = match self.salvage(store, &name) {
            Some(local_path) => {
                progress.suspend(|| println!("🩹 Salvaged leftover download as {}", local_path));
                UrlOutcome::Salvaged {
                    local_path,
                    reason: failure.to_string(),
                }
            }
            None => UrlOutcome::Failed {
                reason: failure.to_string(),
            },
        };

        UrlReport {
            url: url.to_string(),
            name,
            outcome,
        }
    }

    async fn download(&self, store: &FileManager, url: &str, name: &str) -> Result<(), FetchError> {
        let bytes = self.fetcher.fetch(url).await?;
        let staged = store.save_temp(name, &bytes)?;
        debug!(%url, path = %staged.display(), bytes = bytes.len(), "download staged");
        Ok(())
    }

    /// Converts the staged download to WebP, or keeps its bytes under an inferred extension.
    fn convert_or_keep(
        &self,
        store: &FileManager,
        url: &str,
        name: &str,
        progress: &ProgressBar,
    ) -> std::io::Result<UrlOutcome> {
        let temp_path = store.temp_path(name);
        let webp_path = store.image_path(name, WEBP_EXTENSION);

        let reason = match self.try_convert(&temp_path, &webp_path) {
            Ok(()) => match store.discard(&temp_path) {
                Ok(()) => {
                    return Ok(UrlOutcome::Converted {
                        local_path: store.public_path(name, WEBP_EXTENSION),
                    })
                }
                Err(e) => ConvertError::Io(e),
            },
            Err(e) => e,
        };

        progress.suspend(|| {
            println!(
                "⚠️  Conversion failed for {}: {}, keeping original",
                url,
                reason.to_string().yellow()
            )
        });

        // A failed backend may leave a partial WebP behind; it must not shadow the kept file.
        if let Err(e) = store.discard(&webp_path) {
            warn!(path = %webp_path.display(), error = %e, "failed to remove partial WebP");
        }

        let extension = infer_extension(url);
        store.promote(name, extension)?;

        Ok(UrlOutcome::KeptOriginal {
            local_path: store.public_path(name, extension),
            reason: reason.to_string(),
        })
    }

    fn try_convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        self.converter.convert(input, output)?;

        if !output.exists() {
            return Err(ConvertError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }

    /// Keeps a leftover staged download as `.jpg`, if there is one.
    fn salvage(&self, store: &FileManager, name: &str) -> Option<String> {
        if !store.temp_path(name).exists() {
            return None;
        }

        match store.promote(name, DEFAULT_EXTENSION) {
            Ok(path) => {
                debug!(path = %path.display(), "salvaged staged download");
                Some(store.public_path(name, DEFAULT_EXTENSION))
            }
            Err(e) => {
                warn!(image = name, error = %e, "salvage rename failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{MockImageConverter, NoConversion};
    use std::collections::HashMap;
    use tempfile::{tempdir, TempDir};

    const URL_A: &str = "https://images.unsplash.com/photo-abc?w=400";
    const URL_PNG: &str = "https://images.unsplash.com/photo-def.png";

    struct MemoryFetcher {
        images: HashMap<String, Vec<u8>>,
    }

    impl MemoryFetcher {
        fn new(entries: &[(&str, &[u8])]) -> Self {
            Self {
                images: entries
                    .iter()
                    .map(|(url, bytes)| (url.to_string(), bytes.to_vec()))
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

    fn setup(content: &str) -> (TempDir, LocalizerConfig) {
        let temp_dir = tempdir().unwrap();
        let source_path = temp_dir.path().join("books.ts");
        fs::write(&source_path, content).unwrap();

        let config = LocalizerConfig {
            source_path,
            images_dir: temp_dir.path().join("public").join("images"),
            ..LocalizerConfig::default()
        };
        (temp_dir, config)
    }

    fn writing_converter() -> MockImageConverter {
        let mut converter = MockImageConverter::new();
        converter.expect_convert().returning(|_input, output| {
            fs::write(output, b"RIFF\0\0\0\0WEBPVP8 ")?;
            Ok(())
        });
        converter
    }

    #[tokio::test]
    async fn test_converted_url_is_rewritten() {
        let content = format!("a: '{URL_A}', b: '{URL_A}'");
        let (_temp_dir, config) = setup(&content);
        let images_dir = config.images_dir.clone();
        let source = config.source_path.clone();

        let localizer = ImageLocalizer::new(
            config,
            MemoryFetcher::new(&[(URL_A, b"jpeg bytes")]),
            writing_converter(),
        );
        let report = localizer.run().await.unwrap();

        let name = image_basename(URL_A);
        let expected = format!("/images/{name}.webp");
        assert_eq!(report.mapping().get(URL_A), Some(&expected));
        assert!(report.rewritten);
        assert_eq!(
            fs::read_to_string(&source).unwrap(),
            format!("a: '{expected}', b: '{expected}'")
        );
        assert!(images_dir.join(format!("{name}.webp")).exists());
        assert!(!images_dir.join(format!("{name}_temp.jpg")).exists());
        assert_eq!(fs::read_dir(&images_dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_output_counts_as_failed_conversion() {
        let content = format!("cover: '{URL_PNG}'");
        let (_temp_dir, config) = setup(&content);
        let images_dir = config.images_dir.clone();

        let mut converter = MockImageConverter::new();
        converter.expect_convert().times(1).returning(|_, _| Ok(()));

        let localizer =
            ImageLocalizer::new(config, MemoryFetcher::new(&[(URL_PNG, b"png bytes")]), converter);
        let report = localizer.run().await.unwrap();

        let name = image_basename(URL_PNG);
        assert!(matches!(
            report.entries[0].outcome,
            UrlOutcome::KeptOriginal { .. }
        ));
        assert_eq!(
            report.mapping().get(URL_PNG),
            Some(&format!("/images/{name}.png"))
        );
        assert_eq!(
            fs::read(images_dir.join(format!("{name}.png"))).unwrap(),
            b"png bytes"
        );
    }

    #[tokio::test]
    async fn test_partial_webp_is_removed_on_failure() {
        let content = format!("cover: '{URL_A}'");
        let (_temp_dir, config) = setup(&content);
        let images_dir = config.images_dir.clone();

        let mut converter = MockImageConverter::new();
        converter.expect_convert().returning(|_, output| {
            fs::write(output, b"truncated")?;
            Err(ConvertError::Encode("out of memory".to_string()))
        });

        let localizer =
            ImageLocalizer::new(config, MemoryFetcher::new(&[(URL_A, b"jpeg bytes")]), converter);
        let report = localizer.run().await.unwrap();

        let name = image_basename(URL_A);
        assert_eq!(
            report.mapping().get(URL_A),
            Some(&format!("/images/{name}.jpg"))
        );
        assert!(!images_dir.join(format!("{name}.webp")).exists());
    }

    #[tokio::test]
    async fn test_failed_download_leaves_url() {
        let content = format!("cover: '{URL_A}'");
        let (_temp_dir, config) = setup(&content);
        let source = config.source_path.clone();

        let mut converter = MockImageConverter::new();
        converter.expect_convert().never();

        let localizer = ImageLocalizer::new(config, MemoryFetcher::new(&[]), converter);
        let report = localizer.run().await.unwrap();

        assert!(matches!(report.entries[0].outcome, UrlOutcome::Failed { .. }));
        assert!(!report.rewritten);
        assert_eq!(fs::read_to_string(&source).unwrap(), content);
    }

    #[tokio::test]
    async fn test_lingering_temp_is_salvaged() {
        let content = format!("cover: '{URL_A}'");
        let (_temp_dir, config) = setup(&content);
        let images_dir = config.images_dir.clone();
        let name = image_basename(URL_A);

        fs::create_dir_all(&images_dir).unwrap();
        fs::write(images_dir.join(format!("{name}_temp.jpg")), b"partial").unwrap();

        let mut converter = MockImageConverter::new();
        converter.expect_convert().never();

        let localizer = ImageLocalizer::new(config, MemoryFetcher::new(&[]), converter);
        let report = localizer.run().await.unwrap();

        assert!(matches!(
            report.entries[0].outcome,
            UrlOutcome::Salvaged { .. }
        ));
        assert_eq!(
            report.mapping().get(URL_A),
            Some(&format!("/images/{name}.jpg"))
        );
        assert_eq!(
            fs::read(images_dir.join(format!("{name}.jpg"))).unwrap(),
            b"partial"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_blocked_fallback_is_salvaged_as_jpg() {
        let content = format!("cover: '{URL_PNG}'");
        let (_temp_dir, config) = setup(&content);
        let images_dir = config.images_dir.clone();
        let source = config.source_path.clone();
        let name = image_basename(URL_PNG);

        // A non-empty directory where the `.png` should go makes the rename fail.
        let blocker = images_dir.join(format!("{name}.png"));
        fs::create_dir_all(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let localizer =
            ImageLocalizer::new(config, MemoryFetcher::new(&[(URL_PNG, b"png bytes")]), NoConversion);
        let report = localizer.run().await.unwrap();

        let expected = format!("/images/{name}.jpg");
        match &report.entries[0].outcome {
            UrlOutcome::Salvaged { local_path, reason } => {
                assert_eq!(local_path, &expected);
                assert!(reason.starts_with("could not keep original file"));
            }
            other => panic!("expected salvage, got {:?}", other),
        }
        assert_eq!(
            fs::read(images_dir.join(format!("{name}.jpg"))).unwrap(),
            b"png bytes"
        );
        assert!(!images_dir.join(format!("{name}_temp.jpg")).exists());
        assert_eq!(fs::read_to_string(&source).unwrap(), format!("cover: '{expected}'"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_blocked_fallback_and_salvage_fails() {
        let content = format!("cover: '{URL_PNG}'");
        let (_temp_dir, config) = setup(&content);
        let images_dir = config.images_dir.clone();
        let source = config.source_path.clone();
        let name = image_basename(URL_PNG);

        for extension in ["png", "jpg"] {
            let blocker = images_dir.join(format!("{name}.{extension}"));
            fs::create_dir_all(&blocker).unwrap();
            fs::write(blocker.join("keep"), b"x").unwrap();
        }

        let localizer =
            ImageLocalizer::new(config, MemoryFetcher::new(&[(URL_PNG, b"png bytes")]), NoConversion);
        let report = localizer.run().await.unwrap();

        assert!(matches!(report.entries[0].outcome, UrlOutcome::Failed { .. }));
        assert!(report.mapping().is_empty());
        assert!(!report.rewritten);
        assert!(images_dir.join(format!("{name}_temp.jpg")).exists());
        assert_eq!(fs::read_to_string(&source).unwrap(), content);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_undeletable_temp_falls_back_to_original() {
        let content = format!("cover: '{URL_A}'");
        let (_temp_dir, config) = setup(&content);
        let images_dir = config.images_dir.clone();
        let name = image_basename(URL_A);

        // Swap the staged file for a non-empty directory so removing it fails.
        let mut converter = MockImageConverter::new();
        converter.expect_convert().times(1).returning(|input, output| {
            fs::remove_file(input)?;
            fs::create_dir(input)?;
            fs::write(input.join("raw"), b"jpeg bytes")?;
            fs::write(output, b"RIFF\0\0\0\0WEBPVP8 ")?;
            Ok(())
        });

        let localizer =
            ImageLocalizer::new(config, MemoryFetcher::new(&[(URL_A, b"jpeg bytes")]), converter);
        let report = localizer.run().await.unwrap();

        match &report.entries[0].outcome {
            UrlOutcome::KeptOriginal { local_path, reason } => {
                assert_eq!(local_path, &format!("/images/{name}.jpg"));
                assert!(reason.starts_with("IO error"));
            }
            other => panic!("expected original to be kept, got {:?}", other),
        }
        assert!(!images_dir.join(format!("{name}.webp")).exists());
        assert!(!images_dir.join(format!("{name}_temp.jpg")).exists());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let content = format!("cover: '{URL_A}'");
        let (_temp_dir, config) = setup(&content);
        let images_dir = config.images_dir.clone();
        let source = config.source_path.clone();

        let mut converter = MockImageConverter::new();
        converter.expect_convert().never();

        let localizer = ImageLocalizer::new(
            LocalizerConfig {
                dry_run: true,
                ..config
            },
            MemoryFetcher::new(&[(URL_A, b"jpeg bytes")]),
            converter,
        );
        let report = localizer.run().await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.unique_urls, 1);
        assert!(report.entries.is_empty());
        assert!(!images_dir.exists());
        assert_eq!(fs::read_to_string(&source).unwrap(), content);
    }

    #[tokio::test]
    async fn test_missing_source_is_fatal() {
        let temp_dir = tempdir().unwrap();
        let config = LocalizerConfig {
            source_path: temp_dir.path().join("missing.ts"),
            images_dir: temp_dir.path().join("images"),
            ..LocalizerConfig::default()
        };

        let localizer = ImageLocalizer::new(config, MemoryFetcher::new(&[]), MockImageConverter::new());
        assert!(localizer.run().await.is_err());
    }
}
