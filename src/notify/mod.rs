//! Change notification: the watcher loop and its subscription bookkeeping.

pub mod registry;
pub mod watcher;

pub use registry::{Registration, SubscriptionInfo, SubscriptionRegistry};
pub use watcher::{ChangeWatcher, WatchExit};
