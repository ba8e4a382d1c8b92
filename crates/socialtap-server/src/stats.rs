//! Usage counters persisted to a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub post_request_count: u64,
    pub web_socket_request_count: u64,
    pub success_count: u64,
    pub error_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatEvent {
    PostRequest,
    WebSocketRequest,
    Success,
    Error,
}

impl UsageStats {
    fn bump(&mut self, event: StatEvent) {
        let counter = match event {
            StatEvent::PostRequest => &mut self.post_request_count,
            StatEvent::WebSocketRequest => &mut self.web_socket_request_count,
            StatEvent::Success => &mut self.success_count,
            StatEvent::Error => &mut self.error_count,
        };
        *counter += 1;
    }
}

/// Counters shared by every connection, written through on each change.
pub struct StatsStore {
    path: Option<PathBuf>,
    stats: Mutex<UsageStats>,
}

impl StatsStore {
    /// Open the store at `path`, creating the file with zeroed counters when
    /// it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let stats = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), "stats file unreadable, starting from zero: {e}");
                UsageStats::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let stats = UsageStats::default();
                write_stats(&path, &stats).await?;
                stats
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            path: Some(path),
            stats: Mutex::new(stats),
        })
    }

    /// Counters kept in memory only.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            stats: Mutex::new(UsageStats::default()),
        }
    }

    pub async fn snapshot(&self) -> UsageStats {
        *self.stats.lock().await
    }

    /// Count `event`. Persistence failures are logged, never surfaced.
    pub async fn record(&self, event: StatEvent) {
        let mut stats = self.stats.lock().await;
        stats.bump(event);
        if let Some(path) = &self.path {
            if let Err(e) = write_stats(path, &stats).await {
                warn!(path = %path.display(), "failed to persist stats: {e}");
            }
        }
    }
}

async fn write_stats(path: &Path, stats: &UsageStats) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_string_pretty(stats).map_err(std::io::Error::other)?;
    tokio::fs::write(path, body).await
}
