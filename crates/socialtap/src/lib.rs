//! socialtap: interception-and-normalization extraction engine for TikTok
//! and X.
//!
//! A headless browser loads the target page while installed routes rewrite
//! and capture the platform's own API calls; the captured vendor JSON is then
//! mapped into a stable schema.

pub mod browser;
pub mod budget;
pub mod config;
pub mod engine;
pub mod error;
pub mod intercept;
pub mod model;
pub mod normalize;
pub mod platform;
pub mod pool;
pub mod router;
pub mod session;
pub mod thread;
pub mod types;
pub mod verify;

pub use config::EngineConfig;
pub use engine::Scraper;
pub use error::{ScrapeError, ScrapeResult};
pub use model::ScrapeOutput;
pub use types::{Action, EntityKind, Platform, TargetRef};
