// Human-readable result text for finished and failed runs

use super::config::DownloadConfiguration;
use super::models::MediaInfo;
use super::url::{is_playlist, is_vimeo_showcase};

fn item_noun(config: &DownloadConfiguration) -> &'static str {
    if config.is_audio_only() {
        "audio tracks"
    } else {
        "videos"
    }
}

/// Result area text
pub fn summary(info: &MediaInfo, config: &DownloadConfiguration) -> String {
    match &info.entries {
        Some(entries) => {
            let mut out = format!("Playlist title: {}\n", info.display_title());
            out.push_str(&format!(
                "Number of {}: {} (downloaded) / {} (total)\n",
                item_noun(config),
                info.accessible_count(),
                info.total_count()
            ));
            let skipped = info.skipped_count();
            if skipped > 0 {
                out.push_str(&format!(
                    "Skipped {} private or unavailable items\n",
                    skipped
                ));
            }
            out.push('\n');

            for (i, entry) in entries.iter().enumerate() {
                match entry {
                    Some(entry) => out.push_str(&format!(
                        "{}. {} - Downloaded to: {}\n",
                        i + 1,
                        entry.display_title(),
                        config.destination_for(entry.display_title()).display()
                    )),
                    None => out.push_str(&format!(
                        "{}. [Private or unavailable item - skipped]\n",
                        i + 1
                    )),
                }
            }
            out
        }
        None => format!(
            "Downloaded to: {}",
            config.destination_for(info.display_title()).display()
        ),
    }
}

/// Short toast text
pub fn notification(info: &MediaInfo, config: &DownloadConfiguration) -> String {
    if !info.is_collection() {
        return "Download complete!".to_string();
    }

    let downloaded = info.accessible_count();
    let skipped = info.skipped_count();
    if skipped > 0 {
        format!(
            "Download complete! {} {} downloaded, {} skipped.",
            downloaded,
            item_noun(config),
            skipped
        )
    } else {
        format!(
            "Download complete! {} {} downloaded.",
            downloaded,
            item_noun(config)
        )
    }
}

/// Error text with hints for collections and password-protected showcases
pub fn failure_text(error: &str, url: &str) -> String {
    let mut message = format!("Error: {}", error);
    if is_playlist(url) {
        message.push_str("\n\nFor playlists, some videos might be unavailable or restricted.");
        if is_vimeo_showcase(url) {
            message.push_str(
                "\nFor Vimeo showcases, make sure you have the correct password if it's protected.",
            );
        }
    }
    message
}
