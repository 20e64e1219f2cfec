// URL classification for YouTube and Vimeo links
//
// All predicates are total: malformed input simply classifies as false.

use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static::lazy_static! {
    static ref VIMEO_RE: Regex = Regex::new(r"vimeo\.com").unwrap();
    static ref VIMEO_SHOWCASE_RE: Regex = Regex::new(r"vimeo\.com/showcase/").unwrap();
    static ref YOUTUBE_PLAYLIST_RE: Regex = Regex::new(r"youtube\.com/playlist").unwrap();
    static ref YOUTUBE_LIST_PARAM_RE: Regex = Regex::new(r"youtube\.com/.*list=").unwrap();
}

/// Kind of multi-item collection a URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaylistKind {
    YouTubePlaylist,
    VimeoShowcase,
}

impl PlaylistKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::YouTubePlaylist => "YouTube playlist",
            Self::VimeoShowcase => "Vimeo showcase",
        }
    }
}

pub fn is_vimeo_url(url: &str) -> bool {
    VIMEO_RE.is_match(url)
}

pub fn is_vimeo_showcase(url: &str) -> bool {
    VIMEO_SHOWCASE_RE.is_match(url)
}

/// YouTube playlist page, a YouTube link carrying `list=`, or a Vimeo showcase
pub fn is_playlist(url: &str) -> bool {
    playlist_kind(url).is_some()
}

pub fn playlist_kind(url: &str) -> Option<PlaylistKind> {
    if YOUTUBE_PLAYLIST_RE.is_match(url) || YOUTUBE_LIST_PARAM_RE.is_match(url) {
        return Some(PlaylistKind::YouTubePlaylist);
    }
    if is_vimeo_showcase(url) {
        return Some(PlaylistKind::VimeoShowcase);
    }
    None
}

/// What the form needs to know about the URL being typed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlClassification {
    /// Submit is disabled while the field is blank
    pub can_submit: bool,
    /// Password input is shown only for Vimeo links
    pub show_password: bool,
    pub is_playlist: bool,
    pub playlist_kind: Option<PlaylistKind>,
}

pub fn classify(url: &str) -> UrlClassification {
    let kind = playlist_kind(url);
    UrlClassification {
        can_submit: !url.trim().is_empty(),
        show_password: is_vimeo_url(url),
        is_playlist: kind.is_some(),
        playlist_kind: kind,
    }
}
