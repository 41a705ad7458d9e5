//! # regwatch
//!
//! Blocking, cancellable change notifications for registry-like key trees.
//!
//! ## Overview
//!
//! `regwatch` watches a key in a hierarchical key/value namespace and calls
//! your code whenever it changes:
//! - One blocking [`subscribe`](notify::ChangeWatcher::subscribe) call per watched key
//! - An optional per-call duration after which the call simply returns
//! - A single [`stop_all`](notify::ChangeWatcher::stop_all) that wakes every
//!   subscription on a watcher, from any thread
//! - Handles released on every exit path, including a panicking callback
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(windows)]
//! # fn example() -> regwatch::error::Result<()> {
//! use regwatch::prelude::*;
//! use std::time::Duration;
//!
//! let watcher = ChangeWatcher::new()?;
//!
//! // Blocks for up to a minute, calling back on every change.
//! let exit = watcher.subscribe(
//!     "HKLM\\Software\\WinRAR",
//!     || println!("Change was detected!"),
//!     SubscribeOptions::new().with_duration(Duration::from_secs(60)),
//! )?;
//! println!("subscription ended: {:?}", exit);
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! - **Windows registry**: `RegistryNamespace`, built on `RegNotifyChangeKeyValue`
//! - **In-memory**: [`MemoryNamespace`](backend::MemoryNamespace), a portable
//!   tree with the same notification semantics, used for tests and non-Windows hosts
//!
//! ## Feature Flags
//!
//! - `toml`: parse [`SubscribeOptions`](core::SubscribeOptions) from TOML
//! - `metrics`: OpenTelemetry counters for subscriptions and notifications
//! - `tokio-runtime`: `subscribe_async` on tokio's blocking pool
//!
//! ```toml
//! [dependencies]
//! regwatch = { version = "0.1", features = ["metrics"] }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod backend;
pub mod core;
pub mod error;
pub mod notify;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ChangeTrigger, SubscribeOptions};
    pub use crate::error::{Result, WatchError};
    pub use crate::notify::{ChangeWatcher, WatchExit};

    #[cfg(windows)]
    pub use crate::backend::RegistryNamespace;
}
