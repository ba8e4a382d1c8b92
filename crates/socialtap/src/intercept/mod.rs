//! Network interception primitives shared by the browser layer and the engine.
//!
//! A [`RouteRule`] is installed on a browsing context before navigation. The
//! context applies the rule's rewrite to matching outgoing requests and feeds
//! every matching response into the rule's [`RouteHandle`].

pub mod capture;
pub mod rewrite;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use tokio::sync::mpsc;

pub use capture::{has_minimal_data, CapturePolicy, RawDocument, ResponseCapture};
pub use rewrite::{QueryRewrite, RequestRewriter};

/// Glob over full request URLs, Playwright style.
///
/// `**` matches any run of characters, `*` any run without `/`, `?` one
/// character. Everything else is literal.
#[derive(Clone)]
pub struct UrlPattern {
    glob: String,
    re: Regex,
}

impl UrlPattern {
    pub fn new(glob: &str) -> Self {
        let mut re = String::with_capacity(glob.len() * 2 + 2);
        re.push('^');
        let mut chars = glob.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    re.push_str(".*");
                }
                '*' => re.push_str("[^/]*"),
                '?' => re.push('.'),
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');
        let re = Regex::new(&re).expect("escaped glob is a valid regex");
        Self {
            glob: glob.to_string(),
            re,
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.re.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Looser CDP `Fetch` wildcard (`*` crosses `/`). Events it lets through
    /// are re-checked with [`UrlPattern::matches`].
    pub fn to_cdp_wildcard(&self) -> String {
        self.glob.replace("**", "*")
    }
}

impl fmt::Debug for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UrlPattern").field(&self.glob).finish()
    }
}

/// Identifier of an installed route, unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(u64);

impl RouteId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// What to do with requests whose URL matches `pattern`.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub pattern: UrlPattern,
    /// Only requests with this method are intercepted. `None` matches all.
    pub method: Option<String>,
    pub rewrite: Option<QueryRewrite>,
}

impl RouteRule {
    pub fn new(glob: &str) -> Self {
        Self {
            pattern: UrlPattern::new(glob),
            method: None,
            rewrite: None,
        }
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_ascii_uppercase());
        self
    }

    pub fn rewrite(mut self, rewrite: QueryRewrite) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    /// Whether a request is subject to this rule.
    pub fn applies_to(&self, url: &str, method: &str) -> bool {
        self.method
            .as_deref()
            .map_or(true, |m| m.eq_ignore_ascii_case(method))
            && self.pattern.matches(url)
    }

    /// URL to forward for a matching request: rewritten when the rule has a
    /// rewrite that applies, byte-identical otherwise.
    pub fn forward_url(&self, url: &str) -> String {
        self.rewrite
            .as_ref()
            .and_then(|r| r.apply(url))
            .unwrap_or_else(|| url.to_string())
    }
}

/// Response body of an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    /// URL the request was actually sent to (after any rewrite).
    pub url: String,
    pub method: String,
    pub status: u16,
    pub body: String,
}

/// Receiving end of an installed route.
#[derive(Debug)]
pub struct RouteHandle {
    pub id: RouteId,
    pub pattern: UrlPattern,
    responses: mpsc::UnboundedReceiver<CapturedResponse>,
}

impl RouteHandle {
    /// Create a handle and the sender the browsing context feeds.
    pub fn channel(rule: &RouteRule) -> (Self, mpsc::UnboundedSender<CapturedResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: RouteId::next(),
                pattern: rule.pattern.clone(),
                responses: rx,
            },
            tx,
        )
    }

    /// Next captured response; `None` once the context dropped the route.
    pub async fn recv(&mut self) -> Option<CapturedResponse> {
        self.responses.recv().await
    }
}
