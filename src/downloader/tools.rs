// Discovery of the external executables the downloader drives

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

use log::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

/// Locates tools, honoring explicit paths from settings first
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    ytdlp_override: Option<String>,
    ffmpeg_override: Option<String>,
}

impl ToolManager {
    pub fn new(ytdlp_override: Option<String>, ffmpeg_override: Option<String>) -> Self {
        Self {
            ytdlp_override,
            ffmpeg_override,
        }
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.locate(tool_type);
        let version = path
            .as_deref()
            .and_then(|p| Self::get_version(p, tool_type));

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::Ffmpeg),
        ]
    }

    /// Path to run yt-dlp with. Falls back to the bare name so a missing
    /// binary surfaces as a spawn error.
    pub fn ytdlp_command(&self) -> String {
        self.locate(ToolType::YtDlp)
            .unwrap_or_else(|| ToolType::YtDlp.as_str().to_string())
    }

    pub fn locate(&self, tool_type: ToolType) -> Option<String> {
        let override_path = match tool_type {
            ToolType::YtDlp => self.ytdlp_override.as_deref(),
            ToolType::Ffmpeg => self.ffmpeg_override.as_deref(),
        };
        if let Some(path) = override_path {
            let candidate = Path::new(path);
            if candidate.is_dir() {
                let inside = candidate.join(tool_type.as_str());
                if inside.exists() {
                    return Some(inside.to_string_lossy().to_string());
                }
            } else if candidate.exists() {
                return Some(path.to_string());
            }
            debug!("[Tools] configured {} path {} does not exist", tool_type.as_str(), path);
        }

        let binary_name = tool_type.as_str();

        // 1. PATH
        if let Ok(path) = which::which(binary_name) {
            return Some(path.to_string_lossy().to_string());
        }

        // 2. Common install locations not always on PATH (GUI launches on macOS)
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];
        common_paths
            .into_iter()
            .find(|p| Path::new(p).exists())
    }

    fn get_version(path: &str, tool_type: ToolType) -> Option<String> {
        match Command::new(path).arg(tool_type.version_arg()).output() {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|l| l.trim().to_string()),
            _ => None,
        }
    }
}
