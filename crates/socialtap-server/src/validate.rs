//! Request validation against the action table, and input sanitizing.

use serde::{Deserialize, Serialize};

use socialtap::{Action, Platform};

use crate::error::{ApiError, ApiResult};

/// Body of `POST /scrape` and payload of a `get-scraping` message, as sent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub platform: Option<String>,
    pub action: Option<String>,
    pub url: Option<String>,
    pub user_target: Option<String>,
}

/// A request that passed validation, with sanitized fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRequest {
    pub platform: Platform,
    pub action: Action,
    pub url: String,
    pub user_target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Url,
    UserTarget,
}

impl Param {
    pub fn as_str(&self) -> &'static str {
        match self {
            Param::Url => "url",
            Param::UserTarget => "userTarget",
        }
    }
}

pub struct ActionRule {
    pub action: Action,
    pub required: &'static [Param],
    pub platforms: &'static [Platform],
}

const BOTH: &[Platform] = &[Platform::Tiktok, Platform::Twitter];
const X_ONLY: &[Platform] = &[Platform::Twitter];

pub const ACTION_RULES: &[ActionRule] = &[
    ActionRule {
        action: Action::VerifyRetweet,
        required: &[Param::Url, Param::UserTarget],
        platforms: X_ONLY,
    },
    ActionRule {
        action: Action::CheckUserComment,
        required: &[Param::Url, Param::UserTarget],
        platforms: X_ONLY,
    },
    ActionRule {
        action: Action::GetMetrics,
        required: &[Param::Url],
        platforms: BOTH,
    },
    ActionRule {
        action: Action::GetRecentComments,
        required: &[Param::Url],
        platforms: X_ONLY,
    },
    ActionRule {
        action: Action::GetProfileMetrics,
        required: &[Param::Url],
        platforms: BOTH,
    },
    ActionRule {
        action: Action::GetPosts,
        required: &[Param::Url],
        platforms: X_ONLY,
    },
];

pub fn rule_for(action: Action) -> Option<&'static ActionRule> {
    ACTION_RULES.iter().find(|rule| rule.action == action)
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Check `request` against the action table and return its sanitized form.
pub fn validate(request: &ScrapeRequest) -> ApiResult<ValidatedRequest> {
    let (Some(platform), Some(action)) = (present(&request.platform), present(&request.action))
    else {
        return Err(ApiError::Validation(
            "The \"platform\" and \"action\" parameters are required.".into(),
        ));
    };

    let platform_name = platform.to_ascii_lowercase();
    let unsupported = || {
        ApiError::Validation(format!(
            "Action \"{action}\" is not supported for platform \"{platform_name}\"."
        ))
    };
    let platform: Platform = platform_name.parse().map_err(|_| unsupported())?;
    let parsed: Action = action
        .parse()
        .map_err(|_| ApiError::Validation(format!("Unsupported action: {action}")))?;
    let rule = rule_for(parsed).ok_or_else(|| ApiError::Validation(format!("Unsupported action: {action}")))?;
    if !rule.platforms.contains(&platform) {
        return Err(unsupported());
    }

    let url = present(&request.url);
    let user_target = present(&request.user_target);
    for param in rule.required {
        let supplied = match param {
            Param::Url => url.is_some(),
            Param::UserTarget => user_target.is_some(),
        };
        if !supplied {
            return Err(ApiError::Validation(format!(
                "The \"{}\" parameter is required for action \"{}\".",
                param.as_str(),
                parsed
            )));
        }
    }

    Ok(ValidatedRequest {
        platform,
        action: parsed,
        url: url.unwrap_or_default(),
        user_target,
    })
}
