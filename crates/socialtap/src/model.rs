//! Normalized output schema.
//!
//! Every type here is a value object built fresh for one extraction call.
//! Field names are the stable public schema; vendor names never leak through.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// A user as seen on either platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedUser {
    pub id: String,
    pub name: String,
    pub username: String,
    pub verified: bool,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_count: Option<u64>,
}

/// Bitrate of a video variant. Sources that omit it get the `"N/A"` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitrate {
    Bps(u64),
    NotAvailable,
}

impl Serialize for Bitrate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Bitrate::Bps(b) => serializer.serialize_u64(*b),
            Bitrate::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

/// One encoding of a video or animated media item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub url: String,
    pub bitrate: Bitrate,
    pub content_type: String,
}

/// A photo, video or animated GIF attached to a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    pub alt: String,
    /// Size descriptor, passed through as the vendor shaped it.
    pub sizes: Value,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_info: Option<Vec<Variant>>,
}

/// TikTok counters for a single video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostMetrics {
    pub collect_count: u64,
    pub comment_count: u64,
    pub digg_count: u64,
    pub play_count: u64,
    pub share_count: u64,
}

/// TikTok counters for an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileMetrics {
    pub follower_count: u64,
    pub following_count: u64,
    pub heart_count: u64,
    pub video_count: u64,
    pub friend_count: u64,
}

/// X counters for a single tweet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TweetMetrics {
    pub replies: u64,
    pub likes: u64,
    pub retweets: u64,
    pub quotes: u64,
    pub bookmarks: u64,
    pub views: u64,
}

/// X counters for an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountMetrics {
    pub followers: u64,
    pub following: u64,
    pub tweet_count: u64,
    pub likes_count: u64,
    pub media_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoInfo {
    pub vq_score: String,
    pub language_code: String,
    pub cover: String,
    pub definition: String,
    pub duration: u64,
    pub format: String,
    pub play_addr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MusicInfo {
    pub id: String,
    pub title: String,
    pub album: String,
    pub author_name: String,
    pub cover_thumb: String,
    pub duration: u64,
    pub play_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TiktokPost {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub author: NormalizedUser,
    pub stats: PostMetrics,
    pub video: VideoInfo,
    pub music: MusicInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TiktokProfile {
    pub user: NormalizedUser,
    pub stats: ProfileMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TweetContent {
    pub content: String,
    pub lang: String,
    pub created_at: String,
    pub conversation_id: String,
    pub medias: Vec<MediaItem>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mention {
    pub name: String,
    pub screen_name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwitterPost {
    pub user: NormalizedUser,
    pub post: TweetContent,
    pub metrics: TweetMetrics,
    pub hashtags: Vec<String>,
    pub user_mentions: Vec<Mention>,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Website {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Profile-only attributes of an X account.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountDetails {
    pub cover: Option<String>,
    pub joined: String,
    pub birthdate: Option<Value>,
    pub is_identity_verified: Option<bool>,
    pub website: Website,
    pub professional: Option<String>,
    pub categories: Vec<Value>,
    pub pinned_tweet_ids: Vec<String>,
    pub highlights: u64,
    pub can_highlight_tweets: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwitterProfile {
    pub user: NormalizedUser,
    #[serde(flatten)]
    pub details: AccountDetails,
    pub metrics: AccountMetrics,
}

/// A reply under a post. `replies` is populated one level deep at most.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub media: Vec<MediaItem>,
    pub metrics: TweetMetrics,
    pub replies: Vec<CommentEntry>,
}

/// A comment together with its author.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentEntry {
    pub user: NormalizedUser,
    pub comment: Comment,
}

impl CommentEntry {
    pub fn handle(&self) -> &str {
        &self.user.username
    }
}

/// Threaded comments. `count` is the number of top-level entries only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommentForest {
    #[serde(rename = "comments_count")]
    pub count: usize,
    pub comments: Vec<CommentEntry>,
}

/// Top-level comments written by one handle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserComments {
    pub has_commented: bool,
    pub comments_count: usize,
    pub comments: Vec<CommentEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetweetVerification {
    pub has_retweeted: bool,
    pub retweet_date: Option<String>,
}

impl RetweetVerification {
    pub fn negative() -> Self {
        Self {
            has_retweeted: false,
            retweet_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePost {
    pub id: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginalTweet {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Retweet {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub original_tweet: OriginalTweet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimelinePosts {
    pub original_posts: Vec<TimelinePost>,
    pub retweets: Vec<Retweet>,
}

/// Result of one `scrape` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScrapeOutput {
    TiktokPost(TiktokPost),
    TiktokProfile(TiktokProfile),
    TwitterPost(TwitterPost),
    TwitterProfile(TwitterProfile),
    Comments(CommentForest),
    UserComments(UserComments),
    Retweet(RetweetVerification),
    Posts(TimelinePosts),
}
