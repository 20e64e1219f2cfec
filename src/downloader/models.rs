// Common data models for the downloader

use serde::{Deserialize, Serialize};
use std::fmt;

/// Password for protected videos (Vimeo). Forwarded to yt-dlp as-is and
/// never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoPassword(String);

impl VideoPassword {
    /// Blank input counts as no password.
    pub fn new(raw: Option<String>) -> Option<Self> {
        raw.filter(|p| !p.trim().is_empty()).map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VideoPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VideoPassword(***)")
    }
}

/// One user action: what to fetch and how
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub password: Option<VideoPassword>,
    pub audio_only: bool,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, password: Option<String>, audio_only: bool) -> Self {
        Self {
            url: url.into(),
            password: VideoPassword::new(password),
            audio_only,
        }
    }

    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Metadata yt-dlp reports for a URL, either a single item or a collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    /// Present for playlists/showcases. `None` items could not be resolved
    /// (private, removed, region locked).
    #[serde(default)]
    pub entries: Option<Vec<Option<MediaEntry>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
}

impl MediaEntry {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown")
    }
}

impl MediaInfo {
    pub fn is_collection(&self) -> bool {
        self.entries.is_some()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown")
    }

    /// Entries that resolved; 1 for a single item
    pub fn accessible_count(&self) -> usize {
        match &self.entries {
            Some(entries) => entries.iter().filter(|e| e.is_some()).count(),
            None => 1,
        }
    }

    pub fn total_count(&self) -> usize {
        match &self.entries {
            Some(entries) => entries.len(),
            None => 1,
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.total_count() - self.accessible_count()
    }
}

/// Terminal result of one download request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Success {
        summary_text: String,
        notification_text: String,
    },
    Failure {
        error_text: String,
    },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short pass/fail line for a toast
    pub fn notification(&self) -> &str {
        match self {
            Self::Success {
                notification_text, ..
            } => notification_text,
            Self::Failure { .. } => "Download failed. See details in the result box.",
        }
    }

    /// Long text for the result area
    pub fn text(&self) -> &str {
        match self {
            Self::Success { summary_text, .. } => summary_text,
            Self::Failure { error_text } => error_text,
        }
    }
}

/// Download progress payload sent to the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// 0..=100, `None` when the size is unknown
    pub percent: Option<f32>,
    pub status: String,
}

/// Network configuration passed to yt-dlp
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Socket timeout in seconds
    pub timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(30),
        }
    }
}
