//! Built-in metrics for watcher operations.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Subscriptions started and their exit reasons
//! - Notifications delivered to callbacks
//! - Subscription lifetime
//! - Active subscriptions
//!
//! # Examples
//!
//! ```rust,no_run
//! use regwatch::backend::MemoryNamespace;
//! use regwatch::metrics::WatcherMetrics;
//! use regwatch::prelude::*;
//! use opentelemetry::global;
//!
//! # fn example() -> Result<()> {
//! let meter = global::meter("my-app");
//!
//! let watcher = ChangeWatcher::with_namespace(MemoryNamespace::new())?
//!     .with_metrics(WatcherMetrics::new(meter));
//! # Ok(())
//! # }
//! ```

mod watcher_metrics;

pub use watcher_metrics::WatcherMetrics;
