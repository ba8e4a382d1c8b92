//! Classifies a target URL into a post or a profile.
//!
//! Post URLs are recognised by a fixed path marker (`/video/` on TikTok,
//! `/status/` on X). Profile URLs are `<scheme>://<host>/<segment>` with no
//! further path. Anything else is rejected.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ScrapeError, ScrapeResult};
use crate::types::{EntityKind, Platform};

fn profile_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://[^/?#]+/[^/?#]+(?:[?#][^/]*)?$").expect("profile regex is valid")
    })
}

/// Path marker that identifies a single post on each platform.
fn post_marker(platform: Platform) -> &'static str {
    match platform {
        Platform::Tiktok => "/video/",
        Platform::Twitter => "/status/",
    }
}

/// Classify `url` for `platform`.
pub fn classify(platform: Platform, url: &str) -> ScrapeResult<EntityKind> {
    let url = url.trim();
    if url.contains(post_marker(platform)) {
        return Ok(EntityKind::Post);
    }
    if profile_re().is_match(url) {
        return Ok(EntityKind::Profile);
    }
    Err(ScrapeError::UnsupportedUrl {
        platform,
        url: url.to_string(),
    })
}

/// Handle embedded in a profile or post URL (`https://x.com/<handle>/...`).
pub fn handle_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .find(|s| !s.is_empty())
        .map(|s| s.trim_start_matches('@').to_string())
}

/// Last non-empty path segment of a URL (`.../status/<id>` yields `<id>`).
pub fn trailing_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(String::from)
}
