//! Request-side types: platforms, entity kinds, actions and the target reference.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;

/// Supported platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Tiktok,
    Twitter,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
        }
    }

    /// Canonical origin used when the engine builds URLs itself.
    pub fn origin(&self) -> &'static str {
        match self {
            Platform::Tiktok => "https://www.tiktok.com",
            Platform::Twitter => "https://x.com",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiktok" => Ok(Platform::Tiktok),
            "twitter" | "x" => Ok(Platform::Twitter),
            other => Err(ScrapeError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Coarse target classification produced by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Post,
    Profile,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Post => f.write_str("post"),
            EntityKind::Profile => f.write_str("profile"),
        }
    }
}

/// Actions a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "getMetrics")]
    GetMetrics,
    #[serde(rename = "getProfileMetrics")]
    GetProfileMetrics,
    #[serde(rename = "getRecentComments")]
    GetRecentComments,
    #[serde(rename = "checkUserComment")]
    CheckUserComment,
    #[serde(rename = "verifyRetweet")]
    VerifyRetweet,
    #[serde(rename = "getPosts")]
    GetPosts,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::GetMetrics,
        Action::GetProfileMetrics,
        Action::GetRecentComments,
        Action::CheckUserComment,
        Action::VerifyRetweet,
        Action::GetPosts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GetMetrics => "getMetrics",
            Action::GetProfileMetrics => "getProfileMetrics",
            Action::GetRecentComments => "getRecentComments",
            Action::CheckUserComment => "checkUserComment",
            Action::VerifyRetweet => "verifyRetweet",
            Action::GetPosts => "getPosts",
        }
    }

    /// Actions that compare the target against a caller-supplied handle.
    pub fn needs_target_identity(&self) -> bool {
        matches!(self, Action::CheckUserComment | Action::VerifyRetweet)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ScrapeError;

    /// Case-insensitive: message transports have been seen lowercasing names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ScrapeError::UnknownAction(wanted.to_string()))
    }
}

/// Immutable description of one extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub platform: Platform,
    pub url: String,
    pub kind: EntityKind,
    pub action: Action,
    pub target_identity: Option<String>,
}

impl TargetRef {
    /// Target identity with any leading `@` removed.
    pub fn target_handle(&self) -> Option<&str> {
        self.target_identity.as_deref().map(strip_at)
    }
}

/// Remove one leading `@` from a handle.
pub fn strip_at(handle: &str) -> &str {
    handle.strip_prefix('@').unwrap_or(handle)
}
