//! edgeflags: a client-side feature-flag SDK.
//!
//! ```no_run
//! # async fn doc() -> edgeflags_core::Result<()> {
//! use edgeflags::{Config, FlagsClient};
//! use edgeflags_core::User;
//!
//! let config = Config::builder("mobile-key").build()?;
//! let user = User::new("user-123");
//! let client = FlagsClient::init(config, user).await?;
//!
//! let show_banner = client.bool_variation("new-banner", false).await;
//! # let _ = show_banner;
//! # Ok(())
//! # }
//! ```

mod analytics;
mod client;
mod config;
mod encoding;
mod events;
mod flusher;
mod log;
mod poll;
mod sse;
mod state;
mod store;
mod urls;

pub use analytics::{AnalyticsHook, FlagExposure, NoOpAnalyticsHook, SharedAnalyticsHook};
pub use client::FlagsClient;
pub use config::{Config, ConfigBuilder};
pub use log::{LogLevel, LogSink, SinkLayer};

pub use edgeflags_core::{Event, FlagValue, FlagsError, Result, User};
