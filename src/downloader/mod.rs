// Downloader module: URL classification, yt-dlp configuration, progress
// aggregation and the orchestrator that ties them together

pub mod backends;
pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod tools;
pub mod traits;
pub mod url;
pub mod utils;

pub use config::{AudioCodec, DownloadConfiguration, PostProcessor};
pub use errors::DownloadError;
pub use models::{DownloadOutcome, DownloadProgress, DownloadRequest, MediaEntry, MediaInfo};
pub use orchestrator::{Downloader, RunState};
pub use progress::{ProgressAggregator, ProgressEvent, ProgressStatus, ProgressUpdate};
pub use traits::{MediaBackend, ProgressObserver, ProgressSink};
