//! X handlers. All data comes from intercepted GraphQL responses.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ScrapeError, ScrapeResult};
use crate::intercept::{has_minimal_data, CapturePolicy, QueryRewrite, RawDocument};
use crate::model::{
    CommentForest, OriginalTweet, Retweet, TimelinePost, TimelinePosts, TwitterPost,
    TwitterProfile, UserComments,
};
use crate::normalize::metrics::{account_metrics, tweet_metrics};
use crate::normalize::tweet::{
    entry_tweet, expanded_urls, focal_tweet, hashtags, instruction_entries, is_full_tweet,
    tweet_content, unwrap_tweet, user_mentions,
};
use crate::normalize::user::{profile_user_segment, tweet_author_handle, tweet_user_segment};
use crate::normalize::{items, lookup, text, Path};
use crate::router::trailing_segment;
use crate::session::Session;
use crate::thread::ThreadReconstructor;
use crate::types::strip_at;
use crate::verify::{CONVERSATION_INSTRUCTIONS, TIMELINE_INSTRUCTIONS};

const TWEET_DETAIL: &str = "**/TweetDetail*";
const USER_BY_SCREEN_NAME: &str = "**/UserByScreenName*";
const USER_TWEETS: &str = "**/UserTweets*";

const USER_RESULT: Path<'static> = &["data", "user", "result"];
const RETWEETED: Path<'static> = &["legacy", "retweeted_status_result", "result"];

/// Focal post of a conversation document. Lenient: structure may be partly
/// missing, but the record must pass the minimal-data gate.
pub fn post_from_conversation(doc: &RawDocument, post_url: &str) -> ScrapeResult<TwitterPost> {
    let post_id = trailing_segment(post_url).unwrap_or_default();
    let tweet = doc
        .locate(CONVERSATION_INSTRUCTIONS, CapturePolicy::Lenient)?
        .and_then(|instructions| focal_tweet(instructions, &post_id))
        .unwrap_or(&Value::Null);
    if !has_minimal_data(tweet) {
        return Err(ScrapeError::InsufficientData(format!(
            "post {post_url} has no text, metrics or author"
        )));
    }
    Ok(TwitterPost {
        user: tweet_user_segment(tweet),
        post: tweet_content(tweet),
        metrics: tweet_metrics(tweet),
        hashtags: hashtags(tweet),
        user_mentions: user_mentions(tweet),
        urls: expanded_urls(tweet),
    })
}

/// Reply records of a conversation document in arrival order: complete
/// tweets inside conversation modules. Strict on the instruction list.
pub fn comment_records(doc: &RawDocument) -> ScrapeResult<Vec<&Value>> {
    let instructions = doc.require(CONVERSATION_INSTRUCTIONS)?;
    Ok(instruction_entries(instructions)
        .filter(|entry| {
            lookup(entry, &["content", "entryType"]).and_then(Value::as_str)
                == Some("TimelineTimelineModule")
        })
        .flat_map(|entry| items(entry, &["content", "items"]))
        .filter_map(entry_tweet)
        .filter(|tweet| is_full_tweet(tweet))
        .collect())
}

pub fn comment_forest(doc: &RawDocument) -> ScrapeResult<CommentForest> {
    Ok(ThreadReconstructor::reconstruct(comment_records(doc)?))
}

/// Top-level entries written by `handle` (leading `@` ignored).
pub fn user_comments(forest: CommentForest, handle: &str) -> UserComments {
    let handle = strip_at(handle);
    let comments: Vec<_> = forest
        .comments
        .into_iter()
        .filter(|entry| entry.handle() == handle)
        .collect();
    UserComments {
        has_commented: !comments.is_empty(),
        comments_count: comments.len(),
        comments,
    }
}

/// Account of a UserByScreenName document. Strict.
pub fn profile_from_user(doc: &RawDocument) -> ScrapeResult<TwitterProfile> {
    let user_result = doc.require(USER_RESULT)?;
    let (user, details) = profile_user_segment(user_result);
    Ok(TwitterProfile {
        user,
        details,
        metrics: account_metrics(user_result),
    })
}

/// Split a UserTweets timeline into original posts and retweets. Strict on
/// the instruction list; entries without a tweet body are skipped.
pub fn split_posts(doc: &RawDocument) -> ScrapeResult<TimelinePosts> {
    let instructions = doc.require(TIMELINE_INSTRUCTIONS)?;
    let mut posts = TimelinePosts::default();
    for tweet in instruction_entries(instructions)
        .filter_map(entry_tweet)
        .filter(|t| lookup(t, &["legacy"]).is_some())
    {
        let id = text(tweet, &["legacy", "id_str"]);
        let body = text(tweet, &["legacy", "full_text"]);
        let created_at = text(tweet, &["legacy", "created_at"]);
        match lookup(tweet, RETWEETED).map(unwrap_tweet) {
            Some(original) => posts.retweets.push(Retweet {
                id,
                text: body,
                created_at,
                original_tweet: OriginalTweet {
                    id: text(original, &["legacy", "id_str"]),
                    text: text(original, &["legacy", "full_text"]),
                    created_at: text(original, &["legacy", "created_at"]),
                    author: tweet_author_handle(original).unwrap_or_default(),
                },
            }),
            None => posts.original_posts.push(TimelinePost {
                id,
                text: body,
                created_at,
            }),
        }
    }
    Ok(posts)
}

pub async fn post_metrics(session: &mut Session<'_>, url: &str) -> ScrapeResult<TwitterPost> {
    let mut detail = session.capture(TWEET_DETAIL).await?;
    session.visit(url).await?;
    let doc = session.await_json(&mut detail).await?;
    post_from_conversation(&doc, url)
}

/// Conversation replies, newest first.
pub async fn recent_comments(session: &mut Session<'_>, url: &str) -> ScrapeResult<CommentForest> {
    let mut detail = session
        .rewrite(TWEET_DETAIL, QueryRewrite::recency_ranking())
        .await?;
    session.visit(url).await?;
    let doc = session.await_json(&mut detail).await?;
    let forest = comment_forest(&doc)?;
    info!(url, top_level = forest.count, "comments reconstructed");
    Ok(forest)
}

pub async fn check_user_comment(
    session: &mut Session<'_>,
    url: &str,
    handle: &str,
) -> ScrapeResult<UserComments> {
    let forest = recent_comments(session, url).await?;
    let found = user_comments(forest, handle);
    debug!(handle, count = found.comments_count, "user comments filtered");
    Ok(found)
}

pub async fn profile_metrics(session: &mut Session<'_>, url: &str) -> ScrapeResult<TwitterProfile> {
    let mut user = session.capture(USER_BY_SCREEN_NAME).await?;
    session.visit(url).await?;
    let doc = session.await_json(&mut user).await?;
    profile_from_user(&doc)
}

pub async fn posts(session: &mut Session<'_>, url: &str) -> ScrapeResult<TimelinePosts> {
    let mut timeline = session.capture(USER_TWEETS).await?;
    session.visit(url).await?;
    let doc = session.await_json(&mut timeline).await?;
    let posts = split_posts(&doc)?;
    info!(
        url,
        originals = posts.original_posts.len(),
        retweets = posts.retweets.len(),
        "timeline split"
    );
    Ok(posts)
}
