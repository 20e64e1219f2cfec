// App settings storage

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::downloader::backends::YtDlpBackend;
use crate::downloader::config::AudioCodec;
use crate::downloader::models::NetworkConfig;
use crate::downloader::tools::ToolManager;
use crate::downloader::Downloader;

const APP_DIR_NAME: &str = "video-downloader";
const OUTPUT_DIR_ENV: &str = "VIDEO_DOWNLOADER_OUTPUT_DIR";
const YTDLP_PATH_ENV: &str = "YTDLP_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Where files land. Defaults to `./downloads`.
    pub output_dir: Option<PathBuf>,
    /// Explicit yt-dlp executable
    pub ytdlp_path: Option<String>,
    /// Directory or path of ffmpeg, forwarded to yt-dlp
    pub ffmpeg_location: Option<String>,
    pub proxy: Option<String>,
    /// Primary codec for audio-only downloads; platform default when unset
    pub audio_codec: Option<AudioCodec>,
    pub socket_timeout_secs: u32,
    /// Upper bound for the metadata probe; large playlists resolve slowly
    pub probe_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            output_dir: None,
            ytdlp_path: None,
            ffmpeg_location: None,
            proxy: None,
            audio_codec: None,
            socket_timeout_secs: 30,
            probe_timeout_secs: 300,
        }
    }
}

impl AppSettings {
    /// `<config_dir>/video-downloader/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Settings file plus environment overrides. Never fails: a missing or
    /// broken file yields defaults.
    pub fn load() -> Self {
        let mut settings = match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!("[Settings] {} not found, using defaults", path.display());
            return Self::default();
        }

        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str(&json).map_err(|e| e.to_string()));

        match parsed {
            Ok(settings) => settings,
            Err(e) => {
                warn!("[Settings] ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var(OUTPUT_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = var(YTDLP_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.ytdlp_path = Some(path);
        }
    }

    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("downloads")
        })
    }

    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            proxy: self.proxy.clone(),
            timeout: Some(self.socket_timeout_secs),
        }
    }

    pub fn tool_manager(&self) -> ToolManager {
        ToolManager::new(self.ytdlp_path.clone(), self.ffmpeg_location.clone())
    }

    /// Downloader wired to the yt-dlp executable these settings point at
    pub fn build_downloader(&self) -> Downloader {
        let backend = YtDlpBackend::new(self.tool_manager().ytdlp_command())
            .with_network(self.network())
            .with_ffmpeg_location(self.ffmpeg_location.clone())
            .with_probe_timeout(self.probe_timeout_secs);
        Downloader::new(Box::new(backend), self.resolved_output_dir())
            .with_audio_codec(self.audio_codec.unwrap_or_else(AudioCodec::platform_default))
    }
}
