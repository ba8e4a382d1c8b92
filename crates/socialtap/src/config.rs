//! Engine configuration.
//!
//! Defaults can be overridden through `SOCIALTAP_*` environment variables;
//! front-ends may override individual fields afterwards.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_POOL_SIZE: usize = 4;
const DEFAULT_SETTLE_MS: u64 = 2000;
const DEFAULT_DEADLINE_SECS: u64 = 60;

/// Upstream proxy for every browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// `host:port` or `scheme://host:port`.
    pub server: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            (Some(u), None) => Some((u.as_str(), "")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit browser binary; discovery runs when unset.
    pub chromium_path: Option<PathBuf>,
    pub headless: bool,
    /// Maximum concurrently open browsing contexts.
    pub pool_size: usize,
    /// Fixed wait after navigation before reading responses.
    pub settle_delay: Duration,
    /// Per-call deadline covering navigation, settle and capture.
    pub deadline: Duration,
    pub user_agent: Option<String>,
    pub proxy: Option<ProxyConfig>,
    /// Directory holding `<platform>-state.json` session files.
    pub state_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chromium_path: None,
            headless: true,
            pool_size: DEFAULT_POOL_SIZE,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_MS),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            user_agent: None,
            proxy: None,
            state_dir: default_state_dir(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let string = |name: &str| {
            get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |name: &str, default_value: u64| {
            string(name)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default_value)
        };
        let defaults = Self::default();

        let proxy = string("SOCIALTAP_PROXY_SERVER").map(|server| ProxyConfig {
            server,
            username: string("SOCIALTAP_PROXY_USERNAME"),
            password: string("SOCIALTAP_PROXY_PASSWORD"),
        });

        Self {
            chromium_path: string("SOCIALTAP_CHROMIUM_PATH").map(PathBuf::from),
            headless: string("SOCIALTAP_HEADLESS")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.headless),
            pool_size: (number("SOCIALTAP_POOL_SIZE", DEFAULT_POOL_SIZE as u64) as usize).max(1),
            settle_delay: Duration::from_millis(number("SOCIALTAP_SETTLE_MS", DEFAULT_SETTLE_MS)),
            deadline: Duration::from_secs(number("SOCIALTAP_DEADLINE_SECS", DEFAULT_DEADLINE_SECS).max(1)),
            user_agent: string("SOCIALTAP_USER_AGENT"),
            proxy,
            state_dir: string("SOCIALTAP_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".socialtap")
        .join("state")
}
