//! Comment thread reconstruction.
//!
//! X conversation payloads list replies flat, each carrying only the handle
//! it answers. Threads are rebuilt in one pass over arrival order:
//!
//! - a record that answers nobody becomes a top-level entry;
//! - a record that answers a handle is attached under the first top-level
//!   entry written by that handle;
//! - when no top-level entry matches, the record is demoted to top level.
//!
//! Only top-level entries are searched, so nesting never goes deeper than one
//! level. A reply to a reply lands under the nearest top-level entry by the
//! same author, or at top level.

use serde_json::Value;

use crate::model::{CommentEntry, CommentForest};
use crate::normalize::tweet::{comment_entry, in_reply_to};

#[derive(Debug, Default)]
pub struct ThreadReconstructor {
    top_level: Vec<CommentEntry>,
}

impl ThreadReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place one normalized entry.
    pub fn push(&mut self, entry: CommentEntry, reply_to: Option<&str>) {
        let parent = reply_to.and_then(|handle| {
            self.top_level
                .iter_mut()
                .find(|candidate| candidate.handle() == handle)
        });
        match parent {
            Some(parent) => parent.comment.replies.push(entry),
            None => self.top_level.push(entry),
        }
    }

    /// Normalize a raw tweet record and place it.
    pub fn push_tweet(&mut self, tweet: &Value) {
        let reply_to = in_reply_to(tweet);
        self.push(comment_entry(tweet), reply_to.as_deref());
    }

    pub fn finish(self) -> CommentForest {
        CommentForest {
            count: self.top_level.len(),
            comments: self.top_level,
        }
    }

    /// Reconstruct a forest from raw tweet records in arrival order.
    pub fn reconstruct<'a>(tweets: impl IntoIterator<Item = &'a Value>) -> CommentForest {
        let mut threads = Self::new();
        for tweet in tweets {
            threads.push_tweet(tweet);
        }
        threads.finish()
    }
}
