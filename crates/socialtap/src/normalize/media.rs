//! Media segment for X tweet results.

use serde_json::Value;

use super::{count, first_of, lookup, text};
use crate::model::{Bitrate, MediaItem, Variant};

/// Media types that carry a variant list.
const VARIANT_TYPES: [&str; 2] = ["video", "animated_gif"];

/// Media attached to a tweet: `legacy.extended_entities.media` when present,
/// else `legacy.entities.media`, else nothing.
pub fn media_segment(tweet: &Value) -> Vec<MediaItem> {
    first_of(
        tweet,
        &[
            &["legacy", "extended_entities", "media"],
            &["legacy", "entities", "media"],
        ],
    )
    .and_then(Value::as_array)
    .map(|list| list.iter().map(media_item).collect())
    .unwrap_or_default()
}

fn media_item(raw: &Value) -> MediaItem {
    let media_type = text(raw, &["type"]);
    let video_info = VARIANT_TYPES
        .contains(&media_type.as_str())
        .then(|| variants(raw));

    MediaItem {
        url: text(raw, &["media_url_https"]),
        alt: text(raw, &["display_url"]),
        sizes: lookup(raw, &["sizes"]).cloned().unwrap_or(Value::Null),
        id: text(raw, &["id_str"]),
        video_info,
        media_type,
    }
}

fn variants(raw: &Value) -> Vec<Variant> {
    lookup(raw, &["video_info", "variants"])
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|v| Variant {
                    url: text(v, &["url"]),
                    bitrate: match count(v, &["bitrate"]) {
                        0 => Bitrate::NotAvailable,
                        bps => Bitrate::Bps(bps),
                    },
                    content_type: text(v, &["content_type"]),
                })
                .collect()
        })
        .unwrap_or_default()
}
