//! HTTP and WebSocket front end for the socialtap engine.

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod rate_limit;
pub mod stats;
pub mod validate;
pub mod ws;

pub use backend::ScrapeBackend;
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use http::{router, serve, AppState};
