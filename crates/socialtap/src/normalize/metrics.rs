//! Counter segments. Every counter coerces absent or non-numeric input to 0.

use serde_json::Value;

use super::count;
use crate::model::{AccountMetrics, PostMetrics, ProfileMetrics, TweetMetrics};

/// TikTok video `stats`.
pub fn post_metrics(raw: &Value) -> PostMetrics {
    PostMetrics {
        collect_count: count(raw, &["collectCount"]),
        comment_count: count(raw, &["commentCount"]),
        digg_count: count(raw, &["diggCount"]),
        play_count: count(raw, &["playCount"]),
        share_count: count(raw, &["shareCount"]),
    }
}

/// TikTok account `stats`.
pub fn profile_metrics(raw: &Value) -> ProfileMetrics {
    ProfileMetrics {
        follower_count: count(raw, &["followerCount"]),
        following_count: count(raw, &["followingCount"]),
        heart_count: count(raw, &["heart"]),
        video_count: count(raw, &["videoCount"]),
        friend_count: count(raw, &["friendCount"]),
    }
}

/// Counters of an X tweet result.
pub fn tweet_metrics(tweet: &Value) -> TweetMetrics {
    TweetMetrics {
        replies: count(tweet, &["legacy", "reply_count"]),
        likes: count(tweet, &["legacy", "favorite_count"]),
        retweets: count(tweet, &["legacy", "retweet_count"]),
        quotes: count(tweet, &["legacy", "quote_count"]),
        bookmarks: count(tweet, &["legacy", "bookmark_count"]),
        views: count(tweet, &["views", "count"]),
    }
}

/// Counters of an X account (`data.user.result`).
pub fn account_metrics(user_result: &Value) -> AccountMetrics {
    AccountMetrics {
        followers: count(user_result, &["legacy", "followers_count"]),
        following: count(user_result, &["legacy", "friends_count"]),
        tweet_count: count(user_result, &["legacy", "statuses_count"]),
        likes_count: count(user_result, &["legacy", "favourites_count"]),
        media_count: count(user_result, &["legacy", "media_count"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_strings_match_native_numbers() {
        let strings = json!({
            "collectCount": "12", "commentCount": "3", "diggCount": "4500",
            "playCount": "100000", "shareCount": "9"
        });
        let numbers = json!({
            "collectCount": 12, "commentCount": 3, "diggCount": 4500,
            "playCount": 100000, "shareCount": 9
        });
        assert_eq!(post_metrics(&strings), post_metrics(&numbers));

        let strings = json!({
            "followerCount": "10", "followingCount": "2", "heart": "77",
            "videoCount": "5", "friendCount": "1"
        });
        let numbers = json!({
            "followerCount": 10, "followingCount": 2, "heart": 77,
            "videoCount": 5, "friendCount": 1
        });
        assert_eq!(profile_metrics(&strings), profile_metrics(&numbers));
        assert_eq!(profile_metrics(&numbers).heart_count, 77);
    }

    #[test]
    fn test_empty_sources_default_to_zero() {
        assert_eq!(post_metrics(&json!({})), PostMetrics::default());
        assert_eq!(profile_metrics(&Value::Null), ProfileMetrics::default());
        assert_eq!(tweet_metrics(&json!({})), TweetMetrics::default());
        assert_eq!(account_metrics(&json!({})), AccountMetrics::default());
    }

    #[test]
    fn test_tweet_metrics_views_are_stringly() {
        let tweet = json!({
            "legacy": { "reply_count": 2, "favorite_count": 10, "retweet_count": 1 },
            "views": { "count": "5120", "state": "EnabledWithCount" }
        });
        let m = tweet_metrics(&tweet);
        assert_eq!(m.views, 5120);
        assert_eq!(m.likes, 10);
        assert_eq!(m.quotes, 0);
    }
}
