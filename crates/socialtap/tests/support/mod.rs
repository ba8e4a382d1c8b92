//! Scripted stand-in for the browser: every page URL maps to the API calls
//! its front-end would issue and the state an evaluated script would see.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;

use socialtap::browser::{ContextController, ContextFactory, PageController, WaitPolicy};
use socialtap::intercept::{CapturedResponse, RouteHandle, RouteId, RouteRule};
use socialtap::{Platform, ScrapeError, ScrapeResult};

/// One API call a page makes while loading.
#[derive(Debug, Clone)]
pub struct ScriptedCall {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub body: String,
}

impl ScriptedCall {
    pub fn get(url: impl Into<String>, body: &Value) -> Self {
        Self {
            url: url.into(),
            method: "GET".into(),
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn raw_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    pub calls: Vec<ScriptedCall>,
    pub state: Value,
}

/// Everything observable about how the engine drove the browser.
#[derive(Debug, Default)]
pub struct Journal {
    pub navigations: Vec<String>,
    /// URLs actually sent after route rewrites.
    pub sent: Vec<String>,
    pub contexts_created: usize,
    pub contexts_closed: usize,
    pub platforms: Vec<Platform>,
}

#[derive(Clone, Default)]
pub struct ScriptedBrowser {
    pages: Arc<HashMap<String, ScriptedPage>>,
    journal: Arc<Mutex<Journal>>,
    wedged_close: bool,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: ScriptedPage) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), page);
        self
    }

    pub fn with_calls(self, url: &str, calls: Vec<ScriptedCall>) -> Self {
        self.page(
            url,
            ScriptedPage {
                calls,
                state: Value::Null,
            },
        )
    }

    pub fn with_state(self, url: &str, state: Value) -> Self {
        self.page(
            url,
            ScriptedPage {
                calls: Vec::new(),
                state,
            },
        )
    }

    /// Contexts never finish closing, like a hung CDP target.
    pub fn with_wedged_close(mut self) -> Self {
        self.wedged_close = true;
        self
    }

    pub fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }
}

#[async_trait]
impl ContextFactory for ScriptedBrowser {
    async fn create(&self, platform: Platform) -> ScrapeResult<Box<dyn ContextController>> {
        {
            let mut journal = self.journal.lock().unwrap();
            journal.contexts_created += 1;
            journal.platforms.push(platform);
        }
        Ok(Box::new(ScriptedContext {
            pages: Arc::clone(&self.pages),
            journal: Arc::clone(&self.journal),
            routes: Arc::new(Mutex::new(Vec::new())),
            wedged_close: self.wedged_close,
        }))
    }

    fn active_contexts(&self) -> usize {
        let journal = self.journal.lock().unwrap();
        journal.contexts_created - journal.contexts_closed
    }
}

type Routes = Arc<Mutex<Vec<(RouteId, RouteRule, UnboundedSender<CapturedResponse>)>>>;

struct ScriptedContext {
    pages: Arc<HashMap<String, ScriptedPage>>,
    journal: Arc<Mutex<Journal>>,
    routes: Routes,
    wedged_close: bool,
}

#[async_trait]
impl ContextController for ScriptedContext {
    async fn route(&self, rule: RouteRule) -> ScrapeResult<RouteHandle> {
        let (handle, tx) = RouteHandle::channel(&rule);
        self.routes.lock().unwrap().push((handle.id, rule, tx));
        Ok(handle)
    }

    async fn unroute(&self, id: RouteId) -> ScrapeResult<()> {
        self.routes.lock().unwrap().retain(|(rid, _, _)| *rid != id);
        Ok(())
    }

    async fn new_page(&self) -> ScrapeResult<Box<dyn PageController>> {
        Ok(Box::new(ScriptedTab {
            pages: Arc::clone(&self.pages),
            journal: Arc::clone(&self.journal),
            routes: Arc::clone(&self.routes),
            current: None,
        }))
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        if self.wedged_close {
            std::future::pending::<()>().await;
        }
        self.routes.lock().unwrap().clear();
        self.journal.lock().unwrap().contexts_closed += 1;
        Ok(())
    }
}

struct ScriptedTab {
    pages: Arc<HashMap<String, ScriptedPage>>,
    journal: Arc<Mutex<Journal>>,
    routes: Routes,
    current: Option<String>,
}

#[async_trait]
impl PageController for ScriptedTab {
    async fn navigate(&mut self, url: &str, _wait: WaitPolicy) -> ScrapeResult<()> {
        self.journal.lock().unwrap().navigations.push(url.to_string());
        let page = self
            .pages
            .get(url)
            .ok_or_else(|| ScrapeError::Browser(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))?;
        self.current = Some(url.to_string());

        let routes = self.routes.lock().unwrap();
        for call in &page.calls {
            let matching: Vec<_> = routes
                .iter()
                .filter(|(_, rule, _)| rule.applies_to(&call.url, &call.method))
                .collect();
            let sent = matching
                .iter()
                .find(|(_, rule, _)| rule.rewrite.is_some())
                .map(|(_, rule, _)| rule.forward_url(&call.url))
                .unwrap_or_else(|| call.url.clone());
            self.journal.lock().unwrap().sent.push(sent.clone());
            for (_, _, tx) in matching {
                let _ = tx.send(CapturedResponse {
                    url: sent.clone(),
                    method: call.method.clone(),
                    status: call.status,
                    body: call.body.clone(),
                });
            }
        }
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> ScrapeResult<Value> {
        Ok(self
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .map(|page| page.state.clone())
            .unwrap_or(Value::Null))
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        Ok(())
    }
}

// ---- Fixtures ----

pub fn graphql_url(operation: &str, variables: &Value) -> String {
    let encoded: String =
        url::form_urlencoded::byte_serialize(variables.to_string().as_bytes()).collect();
    format!("https://x.com/i/api/graphql/qId/{operation}?variables={encoded}&features=%7B%7D")
}

/// Decoded `variables` parameter of a GraphQL URL.
pub fn variables_of(url: &str) -> Value {
    let parsed = url::Url::parse(url).unwrap();
    let raw = parsed
        .query_pairs()
        .find(|(k, _)| k == "variables")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    serde_json::from_str(&raw).unwrap()
}

pub fn tweet(id: &str, author_id: &str, handle: &str, text: &str) -> Value {
    json!({
        "__typename": "Tweet",
        "rest_id": id,
        "core": { "user_results": { "result": {
            "rest_id": author_id,
            "is_blue_verified": false,
            "legacy": { "screen_name": handle, "name": handle, "followers_count": 10 }
        }}},
        "views": { "count": "250" },
        "legacy": {
            "id_str": id,
            "full_text": text,
            "created_at": "Mon Jun 03 09:00:00 +0000 2024",
            "conversation_id_str": id,
            "favorite_count": 3,
            "retweet_count": 1,
            "reply_count": 2,
            "entities": { "hashtags": [ { "text": "rust" } ], "user_mentions": [], "urls": [] }
        }
    })
}

pub fn reply(id: &str, handle: &str, reply_to: &str) -> Value {
    let mut t = tweet(id, &format!("u-{handle}"), handle, &format!("reply {id}"));
    t["legacy"]["in_reply_to_screen_name"] = json!(reply_to);
    json!({ "item": { "itemContent": { "tweet_results": { "result": t } } } })
}

pub fn conversation(focal: Value, replies: Vec<Value>) -> Value {
    json!({ "data": { "threaded_conversation_with_injections_v2": { "instructions": [
        { "type": "TimelineAddEntries", "entries": [
            { "entryId": "tweet-focal", "content": {
                "entryType": "TimelineTimelineItem",
                "itemContent": { "tweet_results": { "result": focal } } } },
            { "entryId": "conversationthread-1", "content": {
                "entryType": "TimelineTimelineModule",
                "items": replies } }
        ]}
    ]}}})
}

pub fn timeline(entries: Vec<Value>) -> Value {
    let entries: Vec<Value> = entries
        .into_iter()
        .map(|t| json!({ "content": { "itemContent": { "tweet_results": { "result": t } } } }))
        .collect();
    json!({ "data": { "user": { "result": { "timeline_v2": { "timeline": {
        "instructions": [ { "type": "TimelineAddEntries", "entries": entries } ]
    }}}}}})
}

pub fn retweet_of(original: Value, id: &str, date: &str) -> Value {
    json!({
        "__typename": "Tweet",
        "rest_id": id,
        "legacy": {
            "id_str": id,
            "full_text": "RT",
            "created_at": date,
            "retweeted_status_result": { "result": original }
        }
    })
}
