//! End-to-end extraction through the scripted browser.

mod support;

use std::sync::Arc;
use std::time::Duration;

use assert_json_diff::assert_json_include;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use socialtap::browser::ContextFactory;
use socialtap::{Action, EngineConfig, Platform, ScrapeError, ScrapeOutput, Scraper};
use support::*;

const POST_URL: &str = "https://x.com/author/status/1800";

fn config() -> EngineConfig {
    EngineConfig {
        pool_size: 2,
        settle_delay: Duration::ZERO,
        deadline: Duration::from_secs(5),
        ..EngineConfig::default()
    }
}

fn scraper(browser: &ScriptedBrowser, config: &EngineConfig) -> Scraper {
    Scraper::with_factory(Arc::new(browser.clone()), config)
}

fn tweet_detail() -> String {
    graphql_url(
        "TweetDetail",
        &json!({ "focalTweetId": "1800", "rankingMode": "Relevance", "withCommunity": true }),
    )
}

fn thread_browser() -> ScriptedBrowser {
    let body = conversation(
        tweet("1800", "42", "author", "shipping #rust"),
        vec![
            reply("1801", "ann", "author"),
            reply("1802", "bob", "ann"),
            reply("1803", "bob", "author"),
        ],
    );
    ScriptedBrowser::new().with_calls(POST_URL, vec![ScriptedCall::get(tweet_detail(), &body)])
}

#[tokio::test]
async fn test_post_metrics_from_conversation() {
    let browser = thread_browser();
    let scraper = scraper(&browser, &config());

    let out = scraper
        .scrape(Platform::Twitter, POST_URL, Action::GetMetrics, None)
        .await
        .unwrap();
    let ScrapeOutput::TwitterPost(post) = out else {
        panic!("expected an X post");
    };
    assert_eq!(post.post.content, "shipping #rust");
    assert_eq!(post.user.username, "author");
    assert_eq!(post.metrics.views, 250);
    assert_eq!(post.metrics.likes, 3);
    assert_eq!(post.hashtags, vec!["rust".to_string()]);

    let journal = browser.journal();
    assert_eq!(journal.navigations, vec![POST_URL.to_string()]);
    assert_eq!(journal.platforms, vec![Platform::Twitter]);
    // Capture-only routes forward the request untouched.
    assert_eq!(journal.sent, vec![tweet_detail()]);
}

#[tokio::test]
async fn test_recent_comments_force_recency_and_thread() {
    let browser = thread_browser();
    let scraper = scraper(&browser, &config());

    let out = scraper
        .scrape(Platform::Twitter, POST_URL, Action::GetRecentComments, None)
        .await
        .unwrap();
    let ScrapeOutput::Comments(forest) = out.clone() else {
        panic!("expected comments");
    };
    assert_eq!(forest.count, 2);
    assert_eq!(forest.comments[0].comment.id, "1801");
    assert_eq!(forest.comments[0].comment.replies.len(), 1);
    assert_eq!(forest.comments[0].comment.replies[0].comment.id, "1802");
    assert_eq!(forest.comments[1].comment.id, "1803");

    assert_json_include!(
        actual: serde_json::to_value(&out).unwrap(),
        expected: json!({ "comments_count": 2 })
    );

    let journal = browser.journal();
    let sent = variables_of(&journal.sent[0]);
    assert_eq!(sent["rankingMode"], "Recency");
    assert_eq!(sent["focalTweetId"], "1800");
    assert_eq!(sent["withCommunity"], true);
}

#[tokio::test]
async fn test_check_user_comment() {
    let browser = thread_browser();
    let scraper = scraper(&browser, &config());

    let out = scraper
        .scrape(Platform::Twitter, POST_URL, Action::CheckUserComment, Some("@bob"))
        .await
        .unwrap();
    let ScrapeOutput::UserComments(found) = out else {
        panic!("expected user comments");
    };
    // bob's nested reply under ann is not a top-level entry.
    assert!(found.has_commented);
    assert_eq!(found.comments_count, 1);
    assert_eq!(found.comments[0].comment.id, "1803");

    let out = scraper
        .scrape(Platform::Twitter, POST_URL, Action::CheckUserComment, Some("carl"))
        .await
        .unwrap();
    let ScrapeOutput::UserComments(found) = out else {
        panic!("expected user comments");
    };
    assert!(!found.has_commented);
    assert!(found.comments.is_empty());
}

#[tokio::test]
async fn test_verify_retweet_positive() {
    let focal = tweet("1800", "42", "author", "original");
    let user_tweets = graphql_url("UserTweets", &json!({ "userId": "77", "count": 20 }));
    let browser = ScriptedBrowser::new()
        .with_calls(
            POST_URL,
            vec![ScriptedCall::get(tweet_detail(), &conversation(focal.clone(), vec![]))],
        )
        .with_calls(
            "https://x.com/fan",
            vec![ScriptedCall::get(
                user_tweets,
                &timeline(vec![
                    tweet("1900", "77", "fan", "own post"),
                    retweet_of(focal, "1901", "Tue Jun 04 10:00:00 +0000 2024"),
                ]),
            )],
        );
    let scraper = scraper(&browser, &config());

    let out = scraper
        .scrape(Platform::Twitter, POST_URL, Action::VerifyRetweet, Some("@fan"))
        .await
        .unwrap();
    assert_json_include!(
        actual: serde_json::to_value(&out).unwrap(),
        expected: json!({
            "has_retweeted": true,
            "retweet_date": "Mon Jun 03 09:00:00 +0000 2024"
        })
    );
    assert_eq!(
        browser.journal().navigations,
        vec![POST_URL.to_string(), "https://x.com/fan".to_string()]
    );
}

#[tokio::test]
async fn test_verify_retweet_unresolved_author_skips_timeline() {
    // The post loads, but its author is not the account named in the URL.
    let focal = tweet("1800", "42", "someone_else", "original");
    let browser = ScriptedBrowser::new().with_calls(
        POST_URL,
        vec![ScriptedCall::get(tweet_detail(), &conversation(focal, vec![]))],
    );
    let scraper = scraper(&browser, &config());

    let out = scraper
        .scrape(Platform::Twitter, POST_URL, Action::VerifyRetweet, Some("fan"))
        .await
        .unwrap();
    let ScrapeOutput::Retweet(verdict) = out else {
        panic!("expected a retweet verdict");
    };
    assert!(!verdict.has_retweeted);
    assert_eq!(verdict.retweet_date, None);
    assert_eq!(browser.journal().navigations, vec![POST_URL.to_string()]);
}

#[tokio::test]
async fn test_profile_metrics_and_posts() {
    let profile_url = "https://x.com/author";
    let user = json!({ "data": { "user": { "result": {
        "rest_id": "42",
        "is_blue_verified": true,
        "legacy": {
            "screen_name": "author",
            "name": "The Author",
            "followers_count": "1200",
            "friends_count": 80,
            "statuses_count": 5000,
            "created_at": "Wed Jan 01 00:00:00 +0000 2020"
        }
    }}}});
    let original = tweet("10", "9", "other", "their take");
    let browser = ScriptedBrowser::new().with_calls(
        profile_url,
        vec![
            ScriptedCall::get(graphql_url("UserByScreenName", &json!({ "screen_name": "author" })), &user),
            ScriptedCall::get(
                graphql_url("UserTweets", &json!({ "userId": "42" })),
                &timeline(vec![
                    tweet("11", "42", "author", "mine"),
                    retweet_of(original, "12", "Thu Jun 06 08:00:00 +0000 2024"),
                ]),
            ),
        ],
    );
    let scraper = scraper(&browser, &config());

    let out = scraper
        .scrape(Platform::Twitter, profile_url, Action::GetProfileMetrics, None)
        .await
        .unwrap();
    let ScrapeOutput::TwitterProfile(profile) = out else {
        panic!("expected a profile");
    };
    assert_eq!(profile.user.username, "author");
    assert_eq!(profile.metrics.followers, 1200);
    assert_eq!(profile.metrics.following, 80);
    assert_eq!(profile.metrics.media_count, 0);

    let out = scraper
        .scrape(Platform::Twitter, profile_url, Action::GetPosts, None)
        .await
        .unwrap();
    let ScrapeOutput::Posts(posts) = out else {
        panic!("expected posts");
    };
    assert_eq!(posts.original_posts.len(), 1);
    assert_eq!(posts.original_posts[0].text, "mine");
    assert_eq!(posts.retweets.len(), 1);
    assert_eq!(posts.retweets[0].original_tweet.author, "other");
    assert_eq!(posts.retweets[0].original_tweet.id, "10");
}

#[tokio::test]
async fn test_failed_response_is_skipped_until_a_good_one() {
    let body = conversation(tweet("1800", "42", "author", "second try"), vec![]);
    let browser = ScriptedBrowser::new().with_calls(
        POST_URL,
        vec![
            ScriptedCall::get(tweet_detail(), &json!({})).status(429),
            ScriptedCall::get(tweet_detail(), &json!({})).raw_body("<html>"),
            ScriptedCall::get(tweet_detail(), &body),
        ],
    );
    let scraper = scraper(&browser, &config());

    let out = scraper
        .scrape(Platform::Twitter, POST_URL, Action::GetMetrics, None)
        .await
        .unwrap();
    let ScrapeOutput::TwitterPost(post) = out else {
        panic!("expected an X post");
    };
    assert_eq!(post.post.content, "second try");
}

#[tokio::test]
async fn test_tiktok_post_and_profile_from_rehydration() {
    let video_url = "https://www.tiktok.com/@creator/video/7300000000000000000";
    let profile_url = "https://www.tiktok.com/@creator";
    let browser = ScriptedBrowser::new()
        .with_state(
            video_url,
            json!({ "__DEFAULT_SCOPE__": { "webapp.video-detail": { "itemInfo": { "itemStruct": {
                "id": "7300000000000000000",
                "desc": "clip",
                "createTime": "1700000000",
                "author": { "id": "68", "uniqueId": "creator", "nickname": "Creator" },
                "stats": { "diggCount": 10, "playCount": 2500, "commentCount": "4" }
            }}}}}),
        )
        .with_state(
            profile_url,
            json!({ "__DEFAULT_SCOPE__": { "webapp.user-detail": { "userInfo": {
                "user": { "id": "68", "uniqueId": "creator" },
                "stats": { "followerCount": 900, "heart": 12000 }
            }}}}),
        );
    let scraper = scraper(&browser, &config());

    let out = scraper
        .scrape(Platform::Tiktok, video_url, Action::GetMetrics, None)
        .await
        .unwrap();
    let ScrapeOutput::TiktokPost(post) = out else {
        panic!("expected a TikTok post");
    };
    assert_eq!(post.id, "7300000000000000000");
    assert_eq!(post.stats.play_count, 2500);
    assert_eq!(post.stats.comment_count, 4);
    assert_eq!(post.stats.collect_count, 0);

    let out = scraper
        .scrape(Platform::Tiktok, profile_url, Action::GetProfileMetrics, None)
        .await
        .unwrap();
    let ScrapeOutput::TiktokProfile(profile) = out else {
        panic!("expected a TikTok profile");
    };
    assert_eq!(profile.user.username, "creator");
    assert_eq!(profile.stats.follower_count, 900);
    assert_eq!(browser.journal().platforms, vec![Platform::Tiktok, Platform::Tiktok]);
}

#[tokio::test]
async fn test_tiktok_page_without_state_is_missing_data() {
    let url = "https://www.tiktok.com/@creator";
    let browser = ScriptedBrowser::new().with_state(url, serde_json::Value::Null);
    let scraper = scraper(&browser, &config());

    let err = scraper
        .scrape(Platform::Tiktok, url, Action::GetMetrics, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::MissingData(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unsupported_action_never_opens_a_context() {
    let browser = ScriptedBrowser::new();
    let scraper = scraper(&browser, &config());

    let err = scraper
        .scrape(
            Platform::Tiktok,
            "https://www.tiktok.com/@creator/video/1",
            Action::GetRecentComments,
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E_UNSUPPORTED_ACTION");
    assert!(err.is_client_error());
    assert_eq!(browser.journal().contexts_created, 0);
}

#[tokio::test]
async fn test_missing_response_times_out_and_frees_the_slot() {
    // The page loads but never issues the API call.
    let browser = ScriptedBrowser::new().with_calls(POST_URL, vec![]);
    let config = EngineConfig {
        deadline: Duration::from_millis(150),
        ..config()
    };
    let scraper = scraper(&browser, &config);

    let err = scraper
        .scrape(Platform::Twitter, POST_URL, Action::GetMetrics, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Timeout(_)), "got {err:?}");
    assert_eq!(scraper.pool().available(), scraper.pool().capacity());

    let journal = browser.journal();
    assert_eq!(journal.contexts_created, 1);
    assert_eq!(journal.contexts_closed, 1);
}

#[tokio::test]
async fn test_hung_context_close_does_not_hold_the_caller() {
    let browser = thread_browser().with_wedged_close();
    let scraper = scraper(&browser, &config()).with_cleanup_grace(Duration::from_millis(50));

    let out = tokio::time::timeout(
        Duration::from_secs(2),
        scraper.scrape(Platform::Twitter, POST_URL, Action::GetMetrics, None),
    )
    .await
    .expect("cleanup is bounded by the grace period");
    assert!(matches!(out, Ok(ScrapeOutput::TwitterPost(_))));
    assert_eq!(scraper.pool().available(), scraper.pool().capacity());
    assert_eq!(browser.journal().contexts_closed, 0);
}

#[tokio::test]
async fn test_cancellation_stops_the_call() {
    let browser = ScriptedBrowser::new().with_calls(POST_URL, vec![]);
    let scraper = scraper(&browser, &config());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let err = scraper
        .scrape_with_cancel(Platform::Twitter, POST_URL, Action::GetMetrics, None, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Cancelled), "got {err:?}");
    assert_eq!(scraper.pool().available(), 2);
}

#[tokio::test]
async fn test_navigation_failure_propagates() {
    let browser = ScriptedBrowser::new();
    let scraper = scraper(&browser, &config());

    let err = scraper
        .scrape(Platform::Twitter, "https://x.com/ghost", Action::GetMetrics, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E_BROWSER");
    assert_eq!(browser.active_contexts(), 0);
}

#[tokio::test]
async fn test_concurrent_calls_share_the_pool() {
    let browser = thread_browser();
    let scraper = Arc::new(scraper(&browser, &config()));

    let calls = (0..4).map(|_| {
        let scraper = Arc::clone(&scraper);
        tokio::spawn(async move {
            scraper
                .scrape(Platform::Twitter, POST_URL, Action::GetRecentComments, None)
                .await
        })
    });
    for call in futures::future::join_all(calls).await {
        assert!(call.unwrap().is_ok());
    }

    let journal = browser.journal();
    assert_eq!(journal.contexts_created, 4);
    assert_eq!(journal.contexts_closed, 4);
}
