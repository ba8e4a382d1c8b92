//! Stored session state in Playwright's `storageState` file format.
//!
//! A logged-in state file per platform is a precondition of scraping; the
//! engine never performs a login flow. Only cookies are applied; the
//! `origins` (localStorage) section is read and ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ScrapeError, ScrapeResult};
use crate::types::Platform;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix seconds; `-1` marks a session cookie.
    #[serde(default = "session_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

fn session_expiry() -> f64 {
    -1.0
}

impl StoredCookie {
    pub fn is_session(&self) -> bool {
        self.expires < 0.0
    }
}

/// `<dir>/<platform>-state.json`
pub fn state_path(dir: &Path, platform: Platform) -> PathBuf {
    dir.join(format!("{}-state.json", platform.as_str()))
}

impl StorageState {
    pub fn parse(raw: &str) -> ScrapeResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load the state stored for `platform` under `dir`.
    ///
    /// A missing file yields an empty state with a warning; an unreadable or
    /// malformed file is an error.
    pub fn load(dir: &Path, platform: Platform) -> ScrapeResult<Self> {
        let path = state_path(dir, platform);
        if !path.exists() {
            warn!(path = %path.display(), "no stored session for {platform}, continuing logged out");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            ScrapeError::Browser(format!("failed to read {}: {e}", path.display()))
        })?;
        let state = Self::parse(&raw)?;
        debug!(path = %path.display(), cookies = state.cookies.len(), "loaded stored session");
        Ok(state)
    }
}
