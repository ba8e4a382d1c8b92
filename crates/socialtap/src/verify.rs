//! Two-phase retweet verification.
//!
//! Phase 1 loads the source post and resolves its author's numeric id from
//! the conversation payload, provided the author's handle equals the handle in
//! the post URL (case-sensitive). Phase 2 loads the target account's timeline
//! and looks for a retweet of that post. When phase 1 resolves nothing the
//! answer is negative and the timeline is never loaded.

use tracing::{debug, info};

use crate::error::{ScrapeError, ScrapeResult};
use crate::intercept::{CapturePolicy, RawDocument};
use crate::model::RetweetVerification;
use crate::normalize::tweet::{entry_tweet, focal_tweet, instruction_entries, unwrap_tweet};
use crate::normalize::user::{tweet_author_handle, tweet_author_id};
use crate::normalize::{lookup, opt_text, text, Path};
use crate::router::{handle_from_url, trailing_segment};
use crate::session::Session;
use crate::types::{strip_at, Platform};

pub const CONVERSATION_INSTRUCTIONS: Path<'static> =
    &["data", "threaded_conversation_with_injections_v2", "instructions"];
pub const TIMELINE_INSTRUCTIONS: Path<'static> =
    &["data", "user", "result", "timeline_v2", "timeline", "instructions"];

const RETWEETED: Path<'static> = &["legacy", "retweeted_status_result", "result"];

/// Author and post resolved in phase 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostIdentity {
    pub author_id: String,
    pub post_id: String,
}

/// Phase 1 on a captured conversation document.
pub fn resolve_identity(doc: &RawDocument, post_url: &str) -> ScrapeResult<PostIdentity> {
    let expected = handle_from_url(post_url).unwrap_or_default();
    let not_found = || ScrapeError::IdentityNotFound(expected.clone());

    let post_id = trailing_segment(post_url).ok_or_else(not_found)?;
    let instructions = doc
        .locate(CONVERSATION_INSTRUCTIONS, CapturePolicy::Lenient)?
        .ok_or_else(not_found)?;
    let focal = focal_tweet(instructions, &post_id).ok_or_else(not_found)?;

    if tweet_author_handle(focal).as_deref() != Some(expected.as_str()) {
        debug!(expected = %expected, found = ?tweet_author_handle(focal), "post author does not match url handle");
        return Err(not_found());
    }
    let author_id = tweet_author_id(focal).ok_or_else(not_found)?;
    Ok(PostIdentity { author_id, post_id })
}

/// Phase 2 on a captured user timeline document.
pub fn find_retweet(doc: &RawDocument, identity: &PostIdentity) -> ScrapeResult<RetweetVerification> {
    let instructions = doc.require(TIMELINE_INSTRUCTIONS)?;
    let hit = instruction_entries(instructions)
        .filter_map(entry_tweet)
        .find_map(|tweet| {
            let original = unwrap_tweet(lookup(tweet, RETWEETED)?);
            let matches = tweet_author_id(original).as_deref() == Some(identity.author_id.as_str())
                && text(original, &["legacy", "conversation_id_str"]) == identity.post_id;
            matches.then(|| {
                opt_text(original, &["legacy", "created_at"])
                    .or_else(|| opt_text(tweet, &["legacy", "created_at"]))
            })
        });

    Ok(match hit {
        Some(date) => RetweetVerification {
            has_retweeted: true,
            retweet_date: date,
        },
        None => RetweetVerification::negative(),
    })
}

pub struct PredicateVerifier;

impl PredicateVerifier {
    /// Whether `target` retweeted the post at `post_url`.
    pub async fn verify_retweet(
        session: &mut Session<'_>,
        post_url: &str,
        target: &str,
    ) -> ScrapeResult<RetweetVerification> {
        let mut detail = session.capture("**/TweetDetail*").await?;
        session.visit(post_url).await?;
        let conversation = session.await_json(&mut detail).await?;
        session.drop_route(detail).await?;

        let identity = match resolve_identity(&conversation, post_url) {
            Ok(identity) => identity,
            Err(ScrapeError::IdentityNotFound(handle)) => {
                info!(handle = %handle, "post author not resolved, retweet check is negative");
                return Ok(RetweetVerification::negative());
            }
            Err(e) => return Err(e),
        };
        debug!(?identity, "post identity resolved");

        let mut timeline = session.capture("**/UserTweets*").await?;
        let timeline_url = format!("{}/{}", Platform::Twitter.origin(), strip_at(target));
        session.visit(&timeline_url).await?;
        let doc = session.await_json(&mut timeline).await?;
        find_retweet(&doc, &identity)
    }
}
