pub mod cli;
pub mod converter;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod file_manager;
pub mod localizer;
pub mod logging;
pub mod naming;
pub mod report;
pub mod rewriter;

// Re-export main types for convenience
pub use cli::{ConverterKind, LocalizeCommand};
pub use converter::{ExternalConverter, ExternalTool, ImageConverter, NativeConverter, NoConversion};
pub use downloader::{Fetch, HttpFetcher};
pub use error::{ConvertError, FetchError, UrlError};
pub use extractor::{Extraction, UrlExtractor};
pub use file_manager::FileManager;
pub use localizer::{ImageLocalizer, LocalizerConfig};
pub use report::{OutcomeCounts, RunReport, UrlOutcome, UrlReport};
