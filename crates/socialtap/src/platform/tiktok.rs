//! TikTok handlers. Data comes from the rehydration state embedded in the
//! server-rendered page rather than from network calls.

use tracing::debug;

use crate::error::ScrapeResult;
use crate::intercept::RawDocument;
use crate::model::{TiktokPost, TiktokProfile};
use crate::normalize::metrics::{post_metrics as post_stats, profile_metrics as profile_stats};
use crate::normalize::user::author_segment;
use crate::normalize::video::{music_segment, video_segment};
use crate::normalize::{lookup, text, Path};
use crate::session::Session;

/// Parsed contents of the rehydration script tag, or `null`.
const REHYDRATION_SCRIPT: &str = r#"(() => {
    const node = document.querySelector('#__UNIVERSAL_DATA_FOR_REHYDRATION__');
    if (!node) return null;
    try { return JSON.parse(node.textContent); } catch (e) { return null; }
})()"#;

const ITEM_STRUCT: Path<'static> = &["__DEFAULT_SCOPE__", "webapp.video-detail", "itemInfo", "itemStruct"];
const USER_INFO: Path<'static> = &["__DEFAULT_SCOPE__", "webapp.user-detail", "userInfo"];

pub fn post_from_rehydration(doc: &RawDocument) -> ScrapeResult<TiktokPost> {
    let item = doc.require(ITEM_STRUCT)?;
    let null = serde_json::Value::Null;
    Ok(TiktokPost {
        id: text(item, &["id"]),
        content: text(item, &["desc"]),
        created_at: text(item, &["createTime"]),
        author: author_segment(lookup(item, &["author"]).unwrap_or(&null)),
        stats: post_stats(lookup(item, &["stats"]).unwrap_or(&null)),
        video: video_segment(lookup(item, &["video"]).unwrap_or(&null)),
        music: music_segment(lookup(item, &["music"]).unwrap_or(&null)),
    })
}

pub fn profile_from_rehydration(doc: &RawDocument) -> ScrapeResult<TiktokProfile> {
    let info = doc.require(USER_INFO)?;
    let null = serde_json::Value::Null;
    Ok(TiktokProfile {
        user: author_segment(lookup(info, &["user"]).unwrap_or(&null)),
        stats: profile_stats(lookup(info, &["stats"]).unwrap_or(&null)),
    })
}

async fn rehydration_state(session: &mut Session<'_>, url: &str) -> ScrapeResult<RawDocument> {
    session.visit(url).await?;
    let state = session.evaluate(REHYDRATION_SCRIPT).await?;
    debug!(url, found = !state.is_null(), "rehydration state read");
    Ok(RawDocument::new(url, state))
}

pub async fn post_metrics(session: &mut Session<'_>, url: &str) -> ScrapeResult<TiktokPost> {
    let doc = rehydration_state(session, url).await?;
    post_from_rehydration(&doc)
}

pub async fn profile_metrics(session: &mut Session<'_>, url: &str) -> ScrapeResult<TiktokProfile> {
    let doc = rehydration_state(session, url).await?;
    profile_from_rehydration(&doc)
}
