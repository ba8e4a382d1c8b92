//! Chromium-backed browser capabilities using chromiumoxide.
//!
//! Every [`ChromiumContext`] is an isolated CDP browser context. Routes are
//! implemented with the CDP `Fetch` domain: requests paused at the request
//! stage get their URL rewritten, requests paused at the response stage get
//! their body read and delivered to the route's handle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::fetch::{
    AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
    ContinueWithAuthParams, DisableParams, EnableParams, EventAuthRequired, EventRequestPaused,
    GetResponseBodyParams, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::storage::SetCookiesParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::storage_state::{StorageState, StoredCookie};
use super::{ContextController, ContextFactory, PageController, WaitPolicy};
use crate::config::{EngineConfig, ProxyConfig};
use crate::error::{ScrapeError, ScrapeResult};
use crate::intercept::{CapturedResponse, RouteHandle, RouteId, RouteRule};
use crate::types::Platform;

const READY_POLL: Duration = Duration::from_millis(50);

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    // 1. Configured path
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "configured chromium path does not exist");
    }

    // 2. SOCIALTAP_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("SOCIALTAP_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. ~/.socialtap/chromium/
    if let Some(home) = dirs::home_dir() {
        let root = home.join(".socialtap/chromium");
        let candidates = if cfg!(target_os = "macos") {
            vec![
                root.join("chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                root.join("chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                root.join("chrome"),
            ]
        } else {
            vec![root.join("chrome-linux64/chrome"), root.join("chrome")]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 4. System PATH
    ["google-chrome", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// A launched headless Chromium shared by all contexts.
pub struct ChromiumBrowser {
    browser: Arc<Browser>,
    state_dir: PathBuf,
    proxy: Option<ProxyConfig>,
    active_count: Arc<AtomicUsize>,
    handler_task: JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launch Chromium according to `config`.
    pub async fn launch(config: &EngineConfig) -> ScrapeResult<Self> {
        let chrome_path = find_chromium(config.chromium_path.as_deref()).ok_or_else(|| {
            ScrapeError::Browser(
                "Chromium not found; set SOCIALTAP_CHROMIUM_PATH or install google-chrome".into(),
            )
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled");
        builder = if config.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        if let Some(ua) = &config.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        if let Some(proxy) = &config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy.server));
        }
        let browser_config = builder
            .build()
            .map_err(|e| ScrapeError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        // Spawn the handler task
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler: {e}");
                }
            }
        });

        info!(path = %chrome_path.display(), headless = config.headless, "chromium launched");
        Ok(Self {
            browser: Arc::new(browser),
            state_dir: config.state_dir.clone(),
            proxy: config.proxy.clone(),
            active_count: Arc::new(AtomicUsize::new(0)),
            handler_task,
        })
    }

    async fn apply_storage_state(
        &self,
        context_id: &BrowserContextId,
        platform: Platform,
    ) -> ScrapeResult<()> {
        let state = StorageState::load(&self.state_dir, platform)?;
        if state.cookies.is_empty() {
            return Ok(());
        }
        let mut params = SetCookiesParams::new(state.cookies.iter().map(cookie_param).collect());
        params.browser_context_id = Some(context_id.clone());
        self.browser.execute(params).await?;
        Ok(())
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

fn cookie_param(cookie: &StoredCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone());
    param.path = Some(cookie.path.clone());
    param.secure = Some(cookie.secure);
    param.http_only = Some(cookie.http_only);
    param.same_site = match cookie.same_site.as_deref() {
        Some("Strict") => Some(CookieSameSite::Strict),
        Some("Lax") => Some(CookieSameSite::Lax),
        Some("None") => Some(CookieSameSite::None),
        _ => None,
    };
    if !cookie.is_session() {
        param.expires = Some(TimeSinceEpoch::new(cookie.expires));
    }
    param
}

#[async_trait]
impl ContextFactory for ChromiumBrowser {
    async fn create(&self, platform: Platform) -> ScrapeResult<Box<dyn ContextController>> {
        let created = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await?;
        let context_id = created.result.browser_context_id.clone();

        if let Err(e) = self.apply_storage_state(&context_id, platform).await {
            let _ = self
                .browser
                .execute(DisposeBrowserContextParams::new(context_id))
                .await;
            return Err(e);
        }

        self.active_count.fetch_add(1, Ordering::Relaxed);
        debug!(?context_id, %platform, "browser context created");

        Ok(Box::new(ChromiumContext {
            browser: Arc::clone(&self.browser),
            context_id,
            routes: Arc::new(Mutex::new(Vec::new())),
            pages: Mutex::new(Vec::new()),
            proxy_auth: self
                .proxy
                .as_ref()
                .and_then(|p| p.credentials())
                .map(|(u, p)| (u.to_string(), p.to_string())),
            active_count: Arc::clone(&self.active_count),
        }))
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

struct InstalledRoute {
    id: RouteId,
    rule: RouteRule,
    tx: mpsc::UnboundedSender<CapturedResponse>,
}

type RouteTable = Arc<Mutex<Vec<InstalledRoute>>>;

struct OpenPage {
    page: Page,
    tasks: Vec<JoinHandle<()>>,
}

/// An isolated CDP browser context.
pub struct ChromiumContext {
    browser: Arc<Browser>,
    context_id: BrowserContextId,
    routes: RouteTable,
    pages: Mutex<Vec<OpenPage>>,
    proxy_auth: Option<(String, String)>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    /// Push the current route set to every open page.
    async fn refresh_patterns(&self) -> ScrapeResult<()> {
        let routes = self.routes.lock().await;
        let pages = self.pages.lock().await;
        for open in pages.iter() {
            apply_patterns(&open.page, &routes, self.proxy_auth.is_some()).await?;
        }
        Ok(())
    }
}

async fn apply_patterns(page: &Page, routes: &[InstalledRoute], auth: bool) -> ScrapeResult<()> {
    if routes.is_empty() && !auth {
        page.execute(DisableParams::default()).await?;
        return Ok(());
    }
    let mut patterns = Vec::new();
    for route in routes {
        let url_pattern = Some(route.rule.pattern.to_cdp_wildcard());
        if route.rule.rewrite.is_some() {
            patterns.push(RequestPattern {
                url_pattern: url_pattern.clone(),
                resource_type: None,
                request_stage: Some(RequestStage::Request),
            });
        }
        patterns.push(RequestPattern {
            url_pattern,
            resource_type: None,
            request_stage: Some(RequestStage::Response),
        });
    }
    page.execute(EnableParams {
        patterns: Some(patterns),
        handle_auth_requests: Some(auth),
    })
    .await?;
    Ok(())
}

/// Resolve one paused request against the route table.
async fn handle_paused(page: &Page, event: &EventRequestPaused, routes: &RouteTable) -> ScrapeResult<()> {
    let url = event.request.url.as_str();
    let method = event.request.method.as_str();
    let mut params = ContinueRequestParams::new(event.request_id.clone());

    let at_response = event.response_status_code.is_some() || event.response_error_reason.is_some();
    if at_response {
        let senders: Vec<_> = routes
            .lock()
            .await
            .iter()
            .filter(|r| r.rule.applies_to(url, method))
            .map(|r| r.tx.clone())
            .collect();
        if !senders.is_empty() && event.response_error_reason.is_none() {
            let body = page
                .execute(GetResponseBodyParams::new(event.request_id.clone()))
                .await?;
            let body = decode_body(&body.result.body, body.result.base64_encoded)?;
            let captured = CapturedResponse {
                url: url.to_string(),
                method: method.to_string(),
                status: event
                    .response_status_code
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(0),
                body,
            };
            debug!(url, status = captured.status, "response captured");
            for tx in senders {
                let _ = tx.send(captured.clone());
            }
        }
    } else {
        let forward = routes
            .lock()
            .await
            .iter()
            .find(|r| r.rule.rewrite.is_some() && r.rule.applies_to(url, method))
            .map(|r| r.rule.forward_url(url));
        if let Some(rewritten) = forward.filter(|u| u != url) {
            debug!(from = url, to = %rewritten, "request rewritten");
            params.url = Some(rewritten);
        }
    }

    page.execute(params).await?;
    Ok(())
}

fn decode_body(body: &str, base64_encoded: bool) -> ScrapeResult<String> {
    if !base64_encoded {
        return Ok(body.to_string());
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body)
        .map_err(|e| ScrapeError::Extraction(format!("undecodable response body: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn spawn_interceptor(
    page: Page,
    mut paused: impl futures::Stream<Item = Arc<EventRequestPaused>> + Send + Unpin + 'static,
    routes: RouteTable,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            if let Err(e) = handle_paused(&page, &event, &routes).await {
                warn!(url = %event.request.url, "interception failed: {e}");
                let _ = page
                    .execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await;
            }
        }
    })
}

fn spawn_proxy_auth(
    page: Page,
    mut challenges: impl futures::Stream<Item = Arc<EventAuthRequired>> + Send + Unpin + 'static,
    (username, password): (String, String),
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = challenges.next().await {
            let mut answer =
                AuthChallengeResponse::new(AuthChallengeResponseResponse::ProvideCredentials);
            answer.username = Some(username.clone());
            answer.password = Some(password.clone());
            if let Err(e) = page
                .execute(ContinueWithAuthParams::new(event.request_id.clone(), answer))
                .await
            {
                warn!("proxy authentication failed: {e}");
            }
        }
    })
}

#[async_trait]
impl ContextController for ChromiumContext {
    async fn route(&self, rule: RouteRule) -> ScrapeResult<RouteHandle> {
        let (handle, tx) = RouteHandle::channel(&rule);
        self.routes.lock().await.push(InstalledRoute {
            id: handle.id,
            rule,
            tx,
        });
        self.refresh_patterns().await?;
        Ok(handle)
    }

    async fn unroute(&self, id: RouteId) -> ScrapeResult<()> {
        self.routes.lock().await.retain(|r| r.id != id);
        self.refresh_patterns().await
    }

    async fn new_page(&self) -> ScrapeResult<Box<dyn PageController>> {
        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(self.context_id.clone());
        let page = self.browser.new_page(target).await?;

        let mut tasks = Vec::new();
        let paused = page.event_listener::<EventRequestPaused>().await?;
        tasks.push(spawn_interceptor(page.clone(), paused, Arc::clone(&self.routes)));
        if let Some(credentials) = &self.proxy_auth {
            let challenges = page.event_listener::<EventAuthRequired>().await?;
            tasks.push(spawn_proxy_auth(page.clone(), challenges, credentials.clone()));
        }

        apply_patterns(&page, &self.routes.lock().await, self.proxy_auth.is_some()).await?;
        self.pages.lock().await.push(OpenPage {
            page: page.clone(),
            tasks,
        });
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        // Dropping the senders ends every outstanding route handle.
        self.routes.lock().await.clear();
        for open in self.pages.lock().await.drain(..) {
            open.tasks.iter().for_each(JoinHandle::abort);
            let _ = open.page.close().await;
        }
        self.browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await?;
        debug!(context_id = ?self.context_id, "browser context disposed");
        Ok(())
    }
}

/// A single Chromium page.
pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl PageController for ChromiumPage {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> ScrapeResult<()> {
        match wait {
            WaitPolicy::Load => {
                self.page.goto(url).await?;
            }
            WaitPolicy::DomContentLoaded => {
                let nav = self.page.execute(NavigateParams::new(url)).await?;
                if let Some(reason) = nav.result.error_text.clone() {
                    return Err(ScrapeError::Browser(format!("navigation to {url} failed: {reason}")));
                }
                // The execution context may be swapped mid-navigation; keep
                // polling until the new document reports past `loading`.
                loop {
                    if let Ok(state) = self.evaluate("document.readyState").await {
                        if state.as_str().is_some_and(|s| s != "loading") {
                            break;
                        }
                    }
                    tokio::time::sleep(READY_POLL).await;
                }
            }
        }
        debug!(url, ?wait, "navigated");
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> ScrapeResult<Value> {
        let result = self.page.evaluate(script).await?;
        result
            .into_value()
            .map_err(|e| ScrapeError::Extraction(format!("failed to convert JS result: {e:?}")))
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.page.close().await?;
        Ok(())
    }
}
