//! Per-platform handlers and the dispatch table that selects them.

pub mod tiktok;
pub mod twitter;

use crate::error::{ScrapeError, ScrapeResult};
use crate::model::ScrapeOutput;
use crate::session::Session;
use crate::types::{Action, EntityKind, Platform, TargetRef};
use crate::verify::PredicateVerifier;

/// Every supported (platform, kind, action) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    TiktokPostMetrics,
    TiktokProfileMetrics,
    TwitterPostMetrics,
    TwitterRecentComments,
    TwitterCheckUserComment,
    TwitterVerifyRetweet,
    TwitterProfileMetrics,
    TwitterPosts,
}

/// Look up the handler for a classified target. `None` means unsupported.
pub fn dispatch(platform: Platform, kind: EntityKind, action: Action) -> Option<Handler> {
    use Action::*;
    use EntityKind::*;
    use Platform::*;

    match (platform, kind, action) {
        (Tiktok, Post, GetMetrics) => Some(Handler::TiktokPostMetrics),
        (Tiktok, Profile, GetMetrics | GetProfileMetrics) => Some(Handler::TiktokProfileMetrics),
        (Twitter, Post, GetMetrics) => Some(Handler::TwitterPostMetrics),
        (Twitter, Post, GetRecentComments) => Some(Handler::TwitterRecentComments),
        (Twitter, Post, CheckUserComment) => Some(Handler::TwitterCheckUserComment),
        (Twitter, Post, VerifyRetweet) => Some(Handler::TwitterVerifyRetweet),
        (Twitter, Profile, GetMetrics | GetProfileMetrics) => Some(Handler::TwitterProfileMetrics),
        (Twitter, Profile, GetPosts) => Some(Handler::TwitterPosts),
        _ => None,
    }
}

impl Handler {
    /// Resolve the handler for `target` or fail with `UnsupportedAction`.
    pub fn for_target(target: &TargetRef) -> ScrapeResult<Self> {
        dispatch(target.platform, target.kind, target.action).ok_or(ScrapeError::UnsupportedAction {
            platform: target.platform,
            kind: target.kind,
            action: target.action,
        })
    }

    pub async fn run(self, session: &mut Session<'_>, target: &TargetRef) -> ScrapeResult<ScrapeOutput> {
        let url = target.url.as_str();
        let handle = || {
            target
                .target_handle()
                .ok_or(ScrapeError::TargetIdentityRequired(target.action))
        };
        Ok(match self {
            Handler::TiktokPostMetrics => ScrapeOutput::TiktokPost(tiktok::post_metrics(session, url).await?),
            Handler::TiktokProfileMetrics => {
                ScrapeOutput::TiktokProfile(tiktok::profile_metrics(session, url).await?)
            }
            Handler::TwitterPostMetrics => ScrapeOutput::TwitterPost(twitter::post_metrics(session, url).await?),
            Handler::TwitterRecentComments => {
                ScrapeOutput::Comments(twitter::recent_comments(session, url).await?)
            }
            Handler::TwitterCheckUserComment => {
                let handle = handle()?;
                ScrapeOutput::UserComments(twitter::check_user_comment(session, url, handle).await?)
            }
            Handler::TwitterVerifyRetweet => {
                let handle = handle()?;
                ScrapeOutput::Retweet(PredicateVerifier::verify_retweet(session, url, handle).await?)
            }
            Handler::TwitterProfileMetrics => {
                ScrapeOutput::TwitterProfile(twitter::profile_metrics(session, url).await?)
            }
            Handler::TwitterPosts => ScrapeOutput::Posts(twitter::posts(session, url).await?),
        })
    }
}
