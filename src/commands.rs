// Tauri commands backing the download form

use tauri::{AppHandle, Emitter, State};
use tauri_plugin_opener::OpenerExt;
use tokio::sync::Mutex;

use crate::downloader::models::{DownloadOutcome, DownloadProgress, DownloadRequest};
use crate::downloader::progress::ProgressUpdate;
use crate::downloader::tools::ToolInfo;
use crate::downloader::traits::ProgressSink;
use crate::downloader::url::{self, UrlClassification};
use crate::downloader::Downloader;
use crate::settings::AppSettings;

pub struct AppState {
    settings: AppSettings,
    downloader: Downloader,
    /// Held for the duration of a download: one at a time per session
    busy: Mutex<()>,
}

impl AppState {
    pub fn new(settings: AppSettings) -> Self {
        let downloader = settings.build_downloader();
        Self {
            settings,
            downloader,
            busy: Mutex::new(()),
        }
    }
}

/// Forwards progress to the webview as `download-progress` events
pub struct ProgressEmitter {
    app_handle: AppHandle,
}

impl ProgressEmitter {
    pub fn new(app_handle: AppHandle) -> Self {
        Self { app_handle }
    }
}

impl ProgressSink for ProgressEmitter {
    fn report(&self, update: ProgressUpdate) {
        let _ = self.app_handle.emit(
            "download-progress",
            DownloadProgress {
                percent: update.fraction.map(|f| (f * 100.0) as f32),
                status: update.label,
            },
        );
    }
}

#[tauri::command]
pub fn classify_url(url: String) -> UrlClassification {
    url::classify(&url)
}

#[tauri::command]
pub async fn download_video(
    url: String,
    video_password: Option<String>,
    audio_only: bool,
    app_handle: AppHandle,
    state: State<'_, AppState>,
) -> Result<DownloadOutcome, String> {
    let Ok(_guard) = state.busy.try_lock() else {
        return Ok(DownloadOutcome::Failure {
            error_text: "Error: Another download is already running. Wait for it to finish."
                .to_string(),
        });
    };

    let request = DownloadRequest::new(url, video_password, audio_only);
    let emitter = ProgressEmitter::new(app_handle);
    Ok(state.downloader.download(&request, &emitter).await)
}

#[tauri::command]
pub async fn get_tools_status(state: State<'_, AppState>) -> Result<Vec<ToolInfo>, String> {
    let manager = state.settings.tool_manager();
    tauri::async_runtime::spawn_blocking(move || manager.get_all_tools())
        .await
        .map_err(|e| format!("Tool check failed: {}", e))
}

#[tauri::command]
pub fn open_output_dir(app_handle: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    let dir = state.downloader.output_dir();
    std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
    app_handle
        .opener()
        .open_path(dir.to_string_lossy().to_string(), None::<&str>)
        .map_err(|e| format!("Failed to open {}: {}", dir.display(), e))
}
