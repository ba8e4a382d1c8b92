//! Server-only settings. Engine settings live in [`socialtap::EngineConfig`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub stats_path: PathBuf,
    pub rate_window: Duration,
    pub rate_max: usize,
    /// Bearer token required on `/scrape` and `/ws` when set.
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 3000)),
            stats_path: default_stats_path(),
            rate_window: DEFAULT_WINDOW,
            rate_max: DEFAULT_MAX_REQUESTS,
            token: None,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `SOCIALTAP_LISTEN`, `SOCIALTAP_STATS_FILE`,
    /// `SOCIALTAP_RATE_WINDOW_SECS`, `SOCIALTAP_RATE_MAX` and
    /// `SOCIALTAP_TOKEN`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let string = |name: &str| {
            get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            listen: string("SOCIALTAP_LISTEN")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.listen),
            stats_path: string("SOCIALTAP_STATS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.stats_path),
            rate_window: string("SOCIALTAP_RATE_WINDOW_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_window),
            rate_max: string("SOCIALTAP_RATE_MAX")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_max),
            token: string("SOCIALTAP_TOKEN"),
        }
    }
}

fn default_stats_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".socialtap")
        .join("stats.json")
}
