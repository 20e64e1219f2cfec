// Orchestrator: one download request from URL to result text
//
// Idle -> Probing -> Downloading -> Formatting -> Done
// Failed is reachable from Idle (empty URL, output dir), Probing and
// Downloading. An audio-only run whose conversion fails goes back from
// Downloading to Probing exactly once with the fallback codec.

use std::path::PathBuf;

use log::{debug, error, info, warn};

use super::config::{AudioCodec, DownloadConfiguration};
use super::errors::DownloadError;
use super::models::{DownloadOutcome, DownloadRequest, MediaInfo};
use super::progress::{ProgressAggregator, ProgressUpdate};
use super::report;
use super::traits::{MediaBackend, ProgressSink};
use super::url::playlist_kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Probing,
    Downloading,
    Formatting,
    Done,
    Failed,
}

impl RunState {
    fn can_move_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Probing)
                | (Idle, Failed)
                | (Probing, Downloading)
                | (Probing, Failed)
                | (Downloading, Probing)
                | (Downloading, Formatting)
                | (Downloading, Failed)
                | (Formatting, Done)
        )
    }
}

/// Codec fallback is allowed once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retried,
}

/// Bookkeeping for one `download` call
#[derive(Debug)]
pub struct DownloadRun {
    state: RunState,
    attempt: Attempt,
    history: Vec<RunState>,
}

impl DownloadRun {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
            attempt: Attempt::First,
            history: vec![RunState::Idle],
        }
    }

    fn enter(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_move_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("[Downloader] {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Consume the single retry. Returns false if it was already used.
    fn take_retry(&mut self) -> bool {
        match self.attempt {
            Attempt::First => {
                self.attempt = Attempt::Retried;
                true
            }
            Attempt::Retried => false,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }
}

pub struct Downloader {
    backend: Box<dyn MediaBackend>,
    output_dir: PathBuf,
    audio_codec: AudioCodec,
}

impl Downloader {
    pub fn new(backend: Box<dyn MediaBackend>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
            audio_codec: AudioCodec::platform_default(),
        }
    }

    /// Primary codec for audio-only runs
    pub fn with_audio_codec(mut self, codec: AudioCodec) -> Self {
        self.audio_codec = codec;
        self
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    /// Run one request to completion. Progress goes to `sink`.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> DownloadOutcome {
        self.download_traced(request, sink).await.0
    }

    /// Like `download`, also returning the run's state trace
    pub async fn download_traced(
        &self,
        request: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> (DownloadOutcome, DownloadRun) {
        let mut run = DownloadRun::new();

        let outcome = match self.execute(&mut run, request, sink).await {
            Ok((summary_text, notification_text)) => {
                info!("[Downloader] ✓ {}", notification_text);
                DownloadOutcome::Success {
                    summary_text,
                    notification_text,
                }
            }
            Err(e) => {
                run.enter(RunState::Failed);
                error!("[Downloader] ✗ {} failed: {}", request.url, e);
                DownloadOutcome::Failure {
                    error_text: report::failure_text(&e.to_string(), &request.url),
                }
            }
        };
        (outcome, run)
    }

    async fn execute(
        &self,
        run: &mut DownloadRun,
        request: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<(String, String), DownloadError> {
        if !request.has_url() {
            return Err(DownloadError::EmptyUrl);
        }

        let mut config =
            DownloadConfiguration::build_with_codec(request, &self.output_dir, self.audio_codec)?;
        info!(
            "[Downloader] {} ({}) via {}",
            request.url,
            if request.audio_only { "audio only" } else { "video" },
            self.backend.name()
        );

        sink.report(ProgressUpdate::new(0.0, "Starting download..."));
        match playlist_kind(&request.url) {
            Some(kind) => sink.report(ProgressUpdate::new(
                0.01,
                format!("Processing {} - this may take longer...", kind.label()),
            )),
            None => sink.report(ProgressUpdate::new(0.01, "Extracting video information...")),
        }

        let mut demoted_from = None;
        let info = loop {
            match self.attempt(run, &config, sink).await {
                Ok(info) => break info,
                // Nothing to fall back to when already on the fallback codec
                Err(e)
                    if e.is_audio_conversion_failure()
                        && config.can_demote_audio_codec()
                        && run.take_retry() =>
                {
                    let from = config.audio_codec().unwrap_or(self.audio_codec);
                    let to = AudioCodec::fallback();
                    warn!(
                        "[Downloader] {} conversion failed ({}), retrying with {}",
                        from.label(),
                        e,
                        to.label()
                    );
                    sink.report(ProgressUpdate::new(
                        0.1,
                        format!(
                            "{} conversion failed, trying {} format instead...",
                            from.label(),
                            to.label()
                        ),
                    ));
                    config.demote_audio_codec();
                    demoted_from = Some(from);
                }
                Err(e) => return Err(e),
            }
        };

        run.enter(RunState::Formatting);
        let mut summary_text = report::summary(&info, &config);
        if let Some(from) = demoted_from {
            summary_text.push_str(&format!(
                "\nNote: Using {} format instead of {} for better compatibility",
                AudioCodec::fallback().label(),
                from.label()
            ));
        }
        let notification_text = report::notification(&info, &config);

        sink.report(ProgressUpdate::new(1.0, "Download complete!"));
        run.enter(RunState::Done);
        Ok((summary_text, notification_text))
    }

    /// Probe then download with the current configuration
    async fn attempt(
        &self,
        run: &mut DownloadRun,
        config: &DownloadConfiguration,
        sink: &dyn ProgressSink,
    ) -> Result<MediaInfo, DownloadError> {
        run.enter(RunState::Probing);
        let probed = self.backend.probe(config).await?;

        let mut aggregator = ProgressAggregator::new(sink);
        if probed.is_collection() {
            let accessible = probed.accessible_count();
            let skipped = probed.skipped_count();
            if skipped > 0 {
                warn!(
                    "[Downloader] {} of {} playlist items are unavailable",
                    skipped,
                    probed.total_count()
                );
            }
            aggregator.begin_collection(accessible);
            sink.report(ProgressUpdate::new(
                0.02,
                format!(
                    "Found {} available items in playlist. Starting downloads...",
                    accessible
                ),
            ));
        }

        run.enter(RunState::Downloading);
        self.backend.download(config, &mut aggregator).await
    }
}
