//! TikTok video and music segments.

use serde_json::Value;

use super::{count, text};
use crate::model::{MusicInfo, VideoInfo};

pub fn video_segment(raw: &Value) -> VideoInfo {
    VideoInfo {
        vq_score: text(raw, &["VQScore"]),
        language_code: text(raw, &["claInfo", "originalLanguageInfo", "languageCode"]),
        cover: text(raw, &["cover"]),
        definition: text(raw, &["definition"]),
        duration: count(raw, &["duration"]),
        format: text(raw, &["format"]),
        play_addr: text(raw, &["playAddr"]),
    }
}

pub fn music_segment(raw: &Value) -> MusicInfo {
    MusicInfo {
        id: text(raw, &["id"]),
        title: text(raw, &["title"]),
        album: text(raw, &["album"]),
        author_name: text(raw, &["authorName"]),
        cover_thumb: text(raw, &["coverThumb"]),
        duration: count(raw, &["duration"]),
        play_url: text(raw, &["playUrl"]),
    }
}
