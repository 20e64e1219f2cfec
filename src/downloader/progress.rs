// Progress aggregation across single items and collections
//
// yt-dlp reports per-file byte counters. The aggregator folds them into one
// overall fraction for the whole request. For collections the bar is split
// into equal slots, one per accessible item.

use std::path::Path;

use super::traits::{ProgressObserver, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Downloading,
    Finished,
    Other,
}

impl ProgressStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "downloading" => Self::Downloading,
            "finished" => Self::Finished,
            _ => Self::Other,
        }
    }
}

/// Raw event from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub filename: Option<String>,
}

/// Normalized progress for display
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Overall fraction in [0, 1]; `None` means indeterminate
    pub fraction: Option<f64>,
    pub label: String,
}

impl ProgressUpdate {
    pub fn new(fraction: f64, label: impl Into<String>) -> Self {
        Self {
            fraction: Some(fraction.clamp(0.0, 1.0)),
            label: label.into(),
        }
    }

    pub fn indeterminate(label: impl Into<String>) -> Self {
        Self {
            fraction: None,
            label: label.into(),
        }
    }
}

/// Per-run counters. Owned by exactly one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    /// 1-based index of the item being fetched
    pub current_item: usize,
    pub total_items: usize,
    pub last_filename: Option<String>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            current_item: 1,
            total_items: 1,
            last_filename: None,
        }
    }
}

impl ProgressState {
    pub fn is_multi_item(&self) -> bool {
        self.total_items > 1
    }

    /// Item number shown to the user, never past the last item
    fn display_item(&self) -> usize {
        self.current_item.min(self.total_items)
    }

    fn completed_items(&self) -> usize {
        self.display_item().saturating_sub(1)
    }
}

pub struct ProgressAggregator<'a> {
    state: ProgressState,
    sink: &'a dyn ProgressSink,
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            state: ProgressState::default(),
            sink,
        }
    }

    /// Must be called before the first event of a collection download
    pub fn begin_collection(&mut self, accessible_items: usize) {
        self.state = ProgressState {
            current_item: 1,
            total_items: accessible_items.max(1),
            last_filename: None,
        };
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Translate one raw event into at most one update
    pub fn translate(&mut self, event: &ProgressEvent) -> Option<ProgressUpdate> {
        match event.status {
            ProgressStatus::Downloading => self.on_downloading(event),
            ProgressStatus::Finished => Some(self.on_finished()),
            ProgressStatus::Other => None,
        }
    }

    fn on_downloading(&mut self, event: &ProgressEvent) -> Option<ProgressUpdate> {
        let filename = event
            .filename
            .as_deref()
            .map(short_name)
            .unwrap_or_default();
        let prefix = if self.state.is_multi_item() {
            format!(
                "Item {}/{}: ",
                self.state.display_item(),
                self.state.total_items
            )
        } else {
            String::new()
        };
        self.state.last_filename = Some(filename.clone());

        let total = self.state.total_items as f64;
        let done = self.state.completed_items() as f64;

        match (event.downloaded_bytes, event.total_bytes) {
            (Some(downloaded), Some(total_bytes)) if total_bytes > 0 => {
                let item_fraction = (downloaded as f64 / total_bytes as f64).clamp(0.0, 1.0);
                let overall = if self.state.is_multi_item() {
                    (done + item_fraction) / total
                } else {
                    item_fraction
                };
                Some(ProgressUpdate::new(
                    overall,
                    format!("{}Downloading: {}", prefix, filename),
                ))
            }
            (Some(downloaded), _) => {
                let label = format!(
                    "{}Downloading: {} ({:.1} MB)",
                    prefix,
                    filename,
                    downloaded as f64 / 1024.0 / 1024.0
                );
                if self.state.is_multi_item() {
                    // Unknown size: park the bar halfway through the current
                    // slot. An estimate, not a measurement.
                    Some(ProgressUpdate::new(done / total + 0.5 / total, label))
                } else {
                    Some(ProgressUpdate::indeterminate(label))
                }
            }
            _ => None,
        }
    }

    fn on_finished(&mut self) -> ProgressUpdate {
        if self.state.is_multi_item() {
            let item = self.state.display_item();
            let update = ProgressUpdate::new(
                item as f64 / self.state.total_items as f64,
                format!(
                    "Item {}/{} complete, processing...",
                    item, self.state.total_items
                ),
            );
            self.state.current_item += 1;
            update
        } else {
            ProgressUpdate::new(1.0, "Download complete, processing file...")
        }
    }
}

impl ProgressObserver for ProgressAggregator<'_> {
    fn on_progress(&mut self, event: ProgressEvent) {
        if let Some(update) = self.translate(&event) {
            self.sink.report(update);
        }
    }
}

fn short_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}
