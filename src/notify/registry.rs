//! Bookkeeping for in-flight subscriptions.

use crate::core::SubscribeOptions;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// A snapshot of one in-flight subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionInfo {
    /// Identifier unique within the owning watcher
    pub id: u64,
    /// Resolved key path being watched
    pub path: String,
    /// Options the subscription was started with
    pub options: SubscribeOptions,
    /// When the subscription was registered
    pub started: Instant,
}

/// Internal registry state.
struct RegistryInner {
    entries: Vec<SubscriptionInfo>,
    next_id: u64,
}

/// Handle for a registered subscription.
///
/// When the handle is dropped, the subscription is removed from the registry.
pub struct Registration {
    id: u64,
    registry: Arc<Mutex<RegistryInner>>,
}

impl Registration {
    /// The identifier assigned at registration.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut inner = self.registry.lock();
        inner.entries.retain(|entry| entry.id != self.id);
    }
}

/// Registry tracking every subscription currently blocked on a watcher.
///
/// Many subscribing threads register and deregister concurrently, so all
/// access goes through a mutex.
///
/// # Examples
///
/// ```rust
/// use regwatch::notify::SubscriptionRegistry;
/// use regwatch::prelude::*;
///
/// let registry = SubscriptionRegistry::new();
/// let handle = registry.register("HKCU\\Software".into(), SubscribeOptions::default());
/// assert_eq!(registry.len(), 1);
///
/// drop(handle);
/// assert!(registry.is_empty());
/// ```
pub struct SubscriptionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                entries: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a subscription. Dropping the returned handle deregisters it.
    pub fn register(&self, path: String, options: SubscribeOptions) -> Registration {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(SubscriptionInfo {
            id,
            path,
            options,
            started: Instant::now(),
        });

        Registration {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Snapshot of all registered subscriptions, oldest first.
    pub fn snapshot(&self) -> Vec<SubscriptionInfo> {
        self.inner.lock().entries.clone()
    }

    /// Number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether no subscription is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
