// Error types for the download pipeline

use thiserror::Error;

/// Substrings (lowercase) that mark a failure as an audio conversion problem.
/// These trigger the codec fallback for audio-only runs.
const AUDIO_CONVERSION_MARKERS: [&str; 4] = [
    "mp3",
    "audio conversion failed",
    "encoder not found",
    "postprocessor",
];

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// No URL was given; nothing was sent to yt-dlp
    #[error("Please enter a URL")]
    EmptyUrl,

    /// Metadata-only probe failed
    #[error("Failed to read media information: {0}")]
    Probe(String),

    /// Transfer or post-processing failed
    #[error("{0}")]
    Download(String),

    /// Post-processing failed while converting audio
    #[error("{0}")]
    AudioConversion(String),

    /// yt-dlp or ffmpeg not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local filesystem failure (output directory, pipes)
    #[error("I/O error: {0}")]
    Io(String),

    /// Anything else, passed through verbatim
    #[error("{0}")]
    Unknown(String),
}

impl DownloadError {
    /// Classify a failed download's message. Audio conversion problems get
    /// their own variant so the orchestrator can retry with another codec.
    pub fn classify_download(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if AUDIO_CONVERSION_MARKERS.iter().any(|m| lower.contains(m)) {
            return Self::AudioConversion(message);
        }

        if lower.contains("command not found") || lower.contains("no such file") {
            return Self::ToolNotFound(message);
        }

        Self::Download(message)
    }

    pub fn is_audio_conversion_failure(&self) -> bool {
        matches!(self, Self::AudioConversion(_))
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
