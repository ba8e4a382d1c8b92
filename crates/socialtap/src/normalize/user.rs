//! User segments.
//!
//! | field       | TikTok author          | X tweet author (`core.user_results.result`)       |
//! |-------------|------------------------|---------------------------------------------------|
//! | id          | `uid`, else `id`       | `rest_id`                                         |
//! | name        | `nickname`             | `legacy.name`, else `core.name`                   |
//! | username    | `uniqueId`             | `legacy.screen_name`, else `core.screen_name`     |
//! | verified    | `verified` (false)     | `is_blue_verified` (false)                        |
//! | avatar      | `avatarThumb` ("")     | `legacy.profile_image_url_https`, else `avatar.image_url` ("") |
//! | bio         | `signature` ("")       | `legacy.description` (profiles only)              |
//! | extras      | `bioLink`, `region`, `language`, undefined when absent | `location` as region |

use serde_json::Value;

use super::{count, first_text, flag, items, lookup, opt_text, text, Path};
use crate::model::{AccountDetails, NormalizedUser, Website};

const TWEET_AUTHOR: Path<'static> = &["core", "user_results", "result"];

/// TikTok `author` / `userInfo.user` object.
pub fn author_segment(raw: &Value) -> NormalizedUser {
    NormalizedUser {
        id: first_text(raw, &[&["uid"], &["id"]]).unwrap_or_default(),
        name: text(raw, &["nickname"]),
        username: text(raw, &["uniqueId"]),
        verified: flag(raw, &["verified"]),
        avatar: text(raw, &["avatarThumb"]),
        bio: Some(text(raw, &["signature"])),
        bio_link: first_text(raw, &[&["bioLink", "link"], &["bioLink"]]),
        region: opt_text(raw, &["region"]),
        language: opt_text(raw, &["language"]),
        followers_count: None,
        following_count: None,
    }
}

/// Author of an X tweet result.
pub fn tweet_user_segment(tweet: &Value) -> NormalizedUser {
    let author = lookup(tweet, TWEET_AUTHOR).unwrap_or(&Value::Null);
    NormalizedUser {
        followers_count: Some(count(author, &["legacy", "followers_count"])),
        following_count: Some(count(author, &["legacy", "friends_count"])),
        ..account_user(author)
    }
}

/// Handle of the author of an X tweet result, if present.
pub fn tweet_author_handle(tweet: &Value) -> Option<String> {
    let author = lookup(tweet, TWEET_AUTHOR)?;
    first_text(
        author,
        &[&["legacy", "screen_name"], &["core", "screen_name"]],
    )
}

/// Numeric id of the author of an X tweet result, if present.
pub fn tweet_author_id(tweet: &Value) -> Option<String> {
    let author = lookup(tweet, TWEET_AUTHOR)?;
    first_text(author, &[&["rest_id"], &["legacy", "id_str"]])
}

/// `data.user.result` of a UserByScreenName response.
pub fn profile_user_segment(user_result: &Value) -> (NormalizedUser, AccountDetails) {
    let user = NormalizedUser {
        bio: Some(text(user_result, &["legacy", "description"])),
        region: opt_text(user_result, &["legacy", "location"]),
        followers_count: Some(count(user_result, &["legacy", "followers_count"])),
        following_count: Some(count(user_result, &["legacy", "friends_count"])),
        ..account_user(user_result)
    };

    let website = lookup(user_result, &["legacy", "entities", "url", "urls", "0"])
        .map(|w| Website {
            name: opt_text(w, &["display_url"]),
            url: opt_text(w, &["expanded_url"]),
        })
        .unwrap_or_default();

    let details = AccountDetails {
        cover: opt_text(user_result, &["legacy", "profile_banner_url"]),
        joined: first_text(
            user_result,
            &[&["legacy", "created_at"], &["core", "created_at"]],
        )
        .unwrap_or_default(),
        birthdate: lookup(user_result, &["legacy", "birthdate"]).cloned(),
        is_identity_verified: lookup(
            user_result,
            &["verification_info", "is_identity_verified"],
        )
        .and_then(Value::as_bool),
        website,
        professional: opt_text(user_result, &["professional", "professional_type"]),
        categories: items(user_result, &["professional", "category"]).to_vec(),
        pinned_tweet_ids: items(user_result, &["legacy", "pinned_tweet_ids_str"])
            .iter()
            .filter_map(|id| id.as_str().map(String::from))
            .collect(),
        highlights: count(user_result, &["highlights_info", "highlighted_tweets"]),
        can_highlight_tweets: flag(user_result, &["highlights_info", "can_highlight_tweets"]),
    };

    (user, details)
}

/// Fields shared by every X account object.
fn account_user(account: &Value) -> NormalizedUser {
    NormalizedUser {
        id: first_text(account, &[&["rest_id"], &["legacy", "id_str"]]).unwrap_or_default(),
        name: first_text(account, &[&["legacy", "name"], &["core", "name"]]).unwrap_or_default(),
        username: first_text(
            account,
            &[&["legacy", "screen_name"], &["core", "screen_name"]],
        )
        .unwrap_or_default(),
        verified: flag(account, &["is_blue_verified"]),
        avatar: first_text(
            account,
            &[&["legacy", "profile_image_url_https"], &["avatar", "image_url"]],
        )
        .unwrap_or_default(),
        ..NormalizedUser::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_author_segment_defaults() {
        let user = author_segment(&json!({}));
        assert_eq!(user.id, "");
        assert!(!user.verified);
        assert_eq!(user.avatar, "");
        assert_eq!(user.bio.as_deref(), Some(""));
        assert_eq!(user.bio_link, None);
        assert_eq!(user.region, None);
        assert_eq!(user.language, None);
    }

    #[test]
    fn test_author_id_falls_back_to_id() {
        let user = author_segment(&json!({ "id": "6890", "uniqueId": "creator" }));
        assert_eq!(user.id, "6890");
        assert_eq!(user.username, "creator");

        let user = author_segment(&json!({ "uid": "1", "id": "2" }));
        assert_eq!(user.id, "1");
    }

    #[test]
    fn test_tweet_user_prefers_legacy_then_core() {
        let tweet = json!({
            "core": { "user_results": { "result": {
                "rest_id": "44196397",
                "is_blue_verified": true,
                "core": { "name": "Core Name", "screen_name": "corehandle" },
                "legacy": { "followers_count": "1200", "friends_count": 3 }
            }}}
        });
        let user = tweet_user_segment(&tweet);
        assert_eq!(user.id, "44196397");
        assert_eq!(user.name, "Core Name");
        assert_eq!(user.username, "corehandle");
        assert!(user.verified);
        assert_eq!(user.followers_count, Some(1200));
        assert_eq!(user.following_count, Some(3));
        assert_eq!(tweet_author_handle(&tweet).as_deref(), Some("corehandle"));
        assert_eq!(tweet_author_id(&tweet).as_deref(), Some("44196397"));
    }

    #[test]
    fn test_tweet_user_on_empty_record() {
        let user = tweet_user_segment(&json!({}));
        assert_eq!(user.username, "");
        assert_eq!(user.followers_count, Some(0));
        assert_eq!(tweet_author_handle(&json!({})), None);
    }

    #[test]
    fn test_profile_details() {
        let result = json!({
            "rest_id": "7",
            "is_blue_verified": false,
            "verification_info": { "is_identity_verified": true },
            "professional": { "professional_type": "Creator", "category": [{ "name": "Artist" }] },
            "highlights_info": { "can_highlight_tweets": true, "highlighted_tweets": "4" },
            "legacy": {
                "screen_name": "someone",
                "name": "Some One",
                "description": "bio text",
                "location": "Lyon",
                "created_at": "Tue Mar 21 20:50:14 +0000 2006",
                "pinned_tweet_ids_str": ["100", "200"],
                "entities": { "url": { "urls": [
                    { "display_url": "some.one", "expanded_url": "https://some.one" }
                ]}}
            }
        });
        let (user, details) = profile_user_segment(&result);
        assert_eq!(user.bio.as_deref(), Some("bio text"));
        assert_eq!(user.region.as_deref(), Some("Lyon"));
        assert_eq!(details.is_identity_verified, Some(true));
        assert_eq!(details.professional.as_deref(), Some("Creator"));
        assert_eq!(details.categories.len(), 1);
        assert_eq!(details.pinned_tweet_ids, vec!["100", "200"]);
        assert_eq!(details.highlights, 4);
        assert!(details.can_highlight_tweets);
        assert_eq!(details.website.url.as_deref(), Some("https://some.one"));
        assert_eq!(details.cover, None);
    }
}
