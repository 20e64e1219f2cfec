// Per-request yt-dlp configuration
//
// Derived from a DownloadRequest. The only mutation allowed afterwards is
// the audio codec demotion, which rewrites the extraction step and the file
// extension together.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use super::errors::DownloadError;
use super::models::{DownloadRequest, VideoPassword};
use super::url::is_playlist;

/// Container used for merged and converted video
pub const VIDEO_CONTAINER: &str = "mp4";

/// Target bitrate for extracted audio, in kbps
pub const AUDIO_QUALITY_KBPS: u32 = 192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Mp3,
    M4a,
}

impl AudioCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::M4a => "M4A",
        }
    }

    /// M4A on Windows, MP3 elsewhere
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::M4a
        } else {
            Self::Mp3
        }
    }

    /// Codec used after the primary one failed to encode
    pub fn fallback() -> Self {
        Self::M4a
    }
}

/// A step yt-dlp runs after fetching the media
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    /// FFmpegExtractAudio
    ExtractAudio { codec: AudioCodec, quality_kbps: u32 },
    /// FFmpegVideoConvertor
    ConvertVideo { container: String },
}

#[derive(Debug, Clone)]
pub struct DownloadConfiguration {
    url: String,
    audio_only: bool,
    format_selector: String,
    file_extension: String,
    post_processors: Vec<PostProcessor>,
    merge_output_format: Option<String>,
    output_dir: PathBuf,
    password: Option<VideoPassword>,
    verbose: bool,
    ignore_errors: bool,
}

impl DownloadConfiguration {
    /// Build the configuration for `request`, creating `output_dir` if needed.
    pub fn build(request: &DownloadRequest, output_dir: &Path) -> Result<Self, DownloadError> {
        Self::build_with_codec(request, output_dir, AudioCodec::platform_default())
    }

    /// Like `build`, extracting audio as `codec` instead of the platform default
    pub fn build_with_codec(
        request: &DownloadRequest,
        output_dir: &Path,
        codec: AudioCodec,
    ) -> Result<Self, DownloadError> {
        std::fs::create_dir_all(output_dir).map_err(|e| {
            DownloadError::Io(format!(
                "Failed to create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        Ok(Self::for_codec(request, output_dir, codec))
    }

    fn for_codec(request: &DownloadRequest, output_dir: &Path, codec: AudioCodec) -> Self {
        let playlist = is_playlist(&request.url);

        let (format_selector, file_extension, post_processors, merge_output_format) =
            if request.audio_only {
                (
                    "bestaudio".to_string(),
                    codec.as_str().to_string(),
                    vec![PostProcessor::ExtractAudio {
                        codec,
                        quality_kbps: AUDIO_QUALITY_KBPS,
                    }],
                    None,
                )
            } else {
                (
                    "bestvideo+bestaudio".to_string(),
                    VIDEO_CONTAINER.to_string(),
                    vec![PostProcessor::ConvertVideo {
                        container: VIDEO_CONTAINER.to_string(),
                    }],
                    Some(VIDEO_CONTAINER.to_string()),
                )
            };

        let config = Self {
            url: request.url.clone(),
            audio_only: request.audio_only,
            format_selector,
            file_extension,
            post_processors,
            merge_output_format,
            output_dir: output_dir.to_path_buf(),
            password: request.password.clone(),
            verbose: playlist,
            ignore_errors: playlist,
        };
        debug!(
            "[Config] format={} ext={} playlist={} password={}",
            config.format_selector,
            config.file_extension,
            playlist,
            config.password.is_some()
        );
        config
    }

    /// Whether `demote_audio_codec` would change the extraction codec
    pub fn can_demote_audio_codec(&self) -> bool {
        self.audio_codec()
            .is_some_and(|codec| codec != AudioCodec::fallback())
    }

    /// Switch audio extraction to the fallback codec. Returns whether
    /// anything changed; video runs and already-demoted configs are left
    /// untouched.
    pub fn demote_audio_codec(&mut self) -> bool {
        if !self.audio_only {
            return false;
        }
        let fallback = AudioCodec::fallback();
        let mut changed = false;
        if let Some(PostProcessor::ExtractAudio { codec, .. }) = self.post_processors.first_mut() {
            if *codec != fallback {
                *codec = fallback;
                changed = true;
            }
        }
        self.file_extension = fallback.as_str().to_string();
        changed
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_audio_only(&self) -> bool {
        self.audio_only
    }

    pub fn format_selector(&self) -> &str {
        &self.format_selector
    }

    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    pub fn post_processors(&self) -> &[PostProcessor] {
        &self.post_processors
    }

    pub fn merge_output_format(&self) -> Option<&str> {
        self.merge_output_format.as_deref()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn password(&self) -> Option<&VideoPassword> {
        self.password.as_ref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn ignore_errors(&self) -> bool {
        self.ignore_errors
    }

    /// Codec of the audio extraction step, if any
    pub fn audio_codec(&self) -> Option<AudioCodec> {
        self.post_processors.iter().find_map(|pp| match pp {
            PostProcessor::ExtractAudio { codec, .. } => Some(*codec),
            PostProcessor::ConvertVideo { .. } => None,
        })
    }

    /// yt-dlp output template: `<dir>/%(title)s.%(ext)s`
    pub fn output_template(&self) -> String {
        self.output_dir
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .to_string()
    }

    /// Where an item with this title ends up after post-processing
    pub fn destination_for(&self, title: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", title, self.file_extension))
    }
}
