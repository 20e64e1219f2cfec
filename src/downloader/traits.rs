// Backend and progress seams

use async_trait::async_trait;

use super::config::DownloadConfiguration;
use super::errors::DownloadError;
use super::models::MediaInfo;
use super::progress::{ProgressEvent, ProgressUpdate};

/// The external media library: resolves URLs and fetches media
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Metadata only, no media bytes transferred
    async fn probe(&self, config: &DownloadConfiguration) -> Result<MediaInfo, DownloadError>;

    /// Fetch and post-process. `observer` is called synchronously, in
    /// order, for every raw progress event before this returns.
    async fn download(
        &self,
        config: &DownloadConfiguration,
        observer: &mut (dyn ProgressObserver + Send),
    ) -> Result<MediaInfo, DownloadError>;
}

/// Receives raw byte-level events from a backend
pub trait ProgressObserver {
    fn on_progress(&mut self, event: ProgressEvent);
}

/// Receives normalized progress for display
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}
