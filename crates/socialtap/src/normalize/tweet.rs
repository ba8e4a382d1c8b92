//! Tweet-level segments for X GraphQL payloads.

use serde_json::Value;

use super::media::media_segment;
use super::metrics::tweet_metrics;
use super::user::tweet_user_segment;
use super::{items, lookup, opt_text, text};
use crate::model::{Comment, CommentEntry, Mention, TweetContent};

/// Strip the visibility wrapper X puts around some tweet results.
pub fn unwrap_tweet(result: &Value) -> &Value {
    match lookup(result, &["__typename"]).and_then(Value::as_str) {
        Some("TweetWithVisibilityResults") => lookup(result, &["tweet"]).unwrap_or(result),
        _ => result,
    }
}

/// Whether a result is a plain tweet with both author and body.
pub fn is_full_tweet(tweet: &Value) -> bool {
    lookup(tweet, &["__typename"]).and_then(Value::as_str) == Some("Tweet")
        && lookup(tweet, &["core"]).is_some()
        && lookup(tweet, &["legacy"]).is_some()
}

/// Tweet result carried by a timeline entry or module item.
pub fn entry_tweet(entry: &Value) -> Option<&Value> {
    lookup(entry, &["content", "itemContent", "tweet_results", "result"])
        .or_else(|| lookup(entry, &["item", "itemContent", "tweet_results", "result"]))
        .map(unwrap_tweet)
}

/// Timeline entries of every instruction, in order.
pub fn instruction_entries(instructions: &Value) -> impl Iterator<Item = &Value> {
    instructions
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .flat_map(|instruction| items(instruction, &["entries"]).iter())
}

/// The focal tweet of a conversation: the entry whose id is `post_id`, else
/// the first tweet entry.
pub fn focal_tweet<'d>(instructions: &'d Value, post_id: &str) -> Option<&'d Value> {
    let mut tweets = instruction_entries(instructions).filter_map(entry_tweet).peekable();
    let first = tweets.peek().copied();
    tweets
        .find(|t| opt_text(t, &["rest_id"]).as_deref() == Some(post_id))
        .or(first)
}

pub fn tweet_content(tweet: &Value) -> TweetContent {
    TweetContent {
        content: text(tweet, &["legacy", "full_text"]),
        lang: text(tweet, &["legacy", "lang"]),
        created_at: text(tweet, &["legacy", "created_at"]),
        conversation_id: text(tweet, &["legacy", "conversation_id_str"]),
        medias: media_segment(tweet),
        link: opt_text(
            tweet,
            &[
                "note_tweet",
                "note_tweet_results",
                "result",
                "entity_set",
                "urls",
                "0",
                "expanded_url",
            ],
        ),
    }
}

pub fn hashtags(tweet: &Value) -> Vec<String> {
    items(tweet, &["legacy", "entities", "hashtags"])
        .iter()
        .map(|tag| text(tag, &["text"]))
        .collect()
}

pub fn user_mentions(tweet: &Value) -> Vec<Mention> {
    items(tweet, &["legacy", "entities", "user_mentions"])
        .iter()
        .map(|m| Mention {
            name: text(m, &["name"]),
            screen_name: text(m, &["screen_name"]),
            id: text(m, &["id_str"]),
        })
        .collect()
}

pub fn expanded_urls(tweet: &Value) -> Vec<String> {
    items(tweet, &["legacy", "entities", "urls"])
        .iter()
        .map(|u| text(u, &["expanded_url"]))
        .collect()
}

/// Handle this tweet replies to, if it is a reply.
pub fn in_reply_to(tweet: &Value) -> Option<String> {
    opt_text(tweet, &["legacy", "in_reply_to_screen_name"])
}

/// A tweet rendered as a comment with its author and no replies yet.
pub fn comment_entry(tweet: &Value) -> CommentEntry {
    CommentEntry {
        user: tweet_user_segment(tweet),
        comment: Comment {
            id: text(tweet, &["rest_id"]),
            content: text(tweet, &["legacy", "full_text"]),
            created_at: text(tweet, &["legacy", "created_at"]),
            media: media_segment(tweet),
            metrics: tweet_metrics(tweet),
            replies: Vec::new(),
        },
    }
}
