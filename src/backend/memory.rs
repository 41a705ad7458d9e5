//! In-process namespace backend.
//!
//! Models a registry-like tree of keys holding string values. Mutations
//! raise the matching [`ChangeTrigger`] on the affected key, and armed
//! nodes are notified exactly like the native facility does: one
//! notification per arm. A change that reaches an opened node while it is
//! not armed is remembered once and fires as soon as the node is re-armed.

use super::{Event, Namespace, ResetMode, WaitOutcome, WaitResult, WatchFilter};
use crate::core::{ChangeTrigger, NamespaceResolver, ResolvedKey, RootKey, StandardResolver};
use crate::error::{Result, WatchError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Status reported when arming a node whose key has been deleted.
const STATUS_KEY_DELETED: u32 = 1018;

/// Backend operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// Opening a node.
    Open,
    /// Creating a signal.
    CreateSignal,
    /// Raising a signal.
    Raise,
    /// Arming a notification.
    Arm,
    /// Waiting on signals.
    Wait,
}

#[derive(Debug, Default)]
struct KeyData {
    values: BTreeMap<String, String>,
    access_denied: bool,
}

#[derive(Debug)]
struct NodeWatch {
    key: String,
    filter: Option<WatchFilter>,
    armed: Option<Event>,
    pending: bool,
}

#[derive(Debug, Default)]
struct Store {
    keys: BTreeMap<String, KeyData>,
    nodes: HashMap<u64, NodeWatch>,
    next_node: u64,
    faults: HashMap<FaultPoint, u32>,
    max_wait: Option<Duration>,
}

impl Store {
    fn take_fault(&mut self, point: FaultPoint) -> Option<u32> {
        self.faults.remove(&point)
    }

    fn key_mut(&mut self, norm: &str, display: &str) -> Result<&mut KeyData> {
        self.keys
            .get_mut(norm)
            .ok_or_else(|| WatchError::InvalidArgument(format!("key not found: {}", display)))
    }

    /// Deliver a change on `changed` to every node watching it.
    fn fire(&mut self, changed: &str, trigger: ChangeTrigger) {
        for node in self.nodes.values_mut() {
            let Some(filter) = node.filter else {
                continue;
            };
            if !filter.triggers.intersects(trigger) {
                continue;
            }

            let covers = node.key == changed
                || (filter.include_subtree
                    && changed.len() > node.key.len()
                    && changed.starts_with(node.key.as_str())
                    && changed[node.key.len()..].starts_with('\\'));
            if !covers {
                continue;
            }

            node.notify();
        }
    }

    /// Wake every node bound to `deleted` or a key below it, whatever its filter.
    fn fire_deleted(&mut self, deleted: &str) {
        for node in self.nodes.values_mut() {
            if node.filter.is_none() {
                continue;
            }
            let inside = node.key == deleted
                || (node.key.len() > deleted.len()
                    && node.key.starts_with(deleted)
                    && node.key[deleted.len()..].starts_with('\\'));
            if inside {
                node.notify();
            }
        }
    }
}

impl NodeWatch {
    fn notify(&mut self) {
        match self.armed.take() {
            Some(wakeup) => wakeup.set(),
            None => self.pending = true,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    store: Mutex<Store>,
    opens: AtomicUsize,
    live_nodes: AtomicUsize,
    live_signals: AtomicUsize,
}

/// Normalized lookup key: lowercase root token followed by lowercase segments.
fn normalize(key: &ResolvedKey) -> String {
    let mut norm = key.root.token().to_ascii_lowercase();
    for segment in key.segments() {
        norm.push('\\');
        norm.push_str(&segment.to_lowercase());
    }
    norm
}

fn parent_of(norm: &str) -> Option<&str> {
    norm.rfind('\\').map(|idx| &norm[..idx])
}

/// An in-memory registry-like namespace.
///
/// Cloning yields another handle to the same tree, so tests can mutate
/// the tree while a watcher owns a clone.
///
/// # Examples
///
/// ```rust
/// use regwatch::backend::MemoryNamespace;
///
/// let ns = MemoryNamespace::new();
/// ns.create_key("HKCU\\Software\\Acme").unwrap();
/// ns.set_value("HKCU\\Software\\Acme", "Theme", "dark").unwrap();
///
/// assert_eq!(ns.value("hkcu\\software\\acme", "Theme").as_deref(), Some("dark"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryNamespace {
    shared: Arc<Shared>,
}

impl MemoryNamespace {
    /// Create a namespace containing only the six root keys.
    pub fn new() -> Self {
        let mut store = Store::default();
        for root in RootKey::ALL {
            store
                .keys
                .insert(root.token().to_ascii_lowercase(), KeyData::default());
        }

        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(store),
                ..Default::default()
            }),
        }
    }

    fn resolve(path: &str) -> Result<(String, String)> {
        let key = StandardResolver.resolve(path)?;
        Ok((normalize(&key), key.to_string()))
    }

    /// Create `path` and any missing ancestors.
    ///
    /// Raises [`ChangeTrigger::SUBTREE`] on the parent of every key created.
    pub fn create_key(&self, path: &str) -> Result<()> {
        let (norm, _) = Self::resolve(path)?;
        let mut store = self.shared.store.lock();

        let mut created = Vec::new();
        let mut current = Some(norm.as_str());
        while let Some(key) = current {
            if store.keys.contains_key(key) {
                break;
            }
            created.push(key.to_string());
            current = parent_of(key);
        }

        for key in created.into_iter().rev() {
            store.keys.insert(key.clone(), KeyData::default());
            if let Some(parent) = parent_of(&key) {
                store.fire(parent, ChangeTrigger::SUBTREE);
            }
        }
        Ok(())
    }

    /// Delete `path` and everything below it.
    ///
    /// Raises [`ChangeTrigger::SUBTREE`] on the parent. Nodes opened on a
    /// deleted key are woken regardless of their trigger mask, and their
    /// next arm fails with status 1018.
    pub fn delete_key(&self, path: &str) -> Result<()> {
        let (norm, display) = Self::resolve(path)?;
        let Some(parent) = parent_of(&norm) else {
            return Err(WatchError::InvalidArgument(format!(
                "cannot delete root key {}",
                display
            )));
        };

        let mut store = self.shared.store.lock();
        store.key_mut(&norm, &display)?;
        store.fire_deleted(&norm);

        let prefix = format!("{}\\", norm);
        store
            .keys
            .retain(|key, _| key != &norm && !key.starts_with(&prefix));
        store.fire(parent, ChangeTrigger::SUBTREE);
        Ok(())
    }

    /// Whether `path` exists.
    pub fn key_exists(&self, path: &str) -> bool {
        match Self::resolve(path) {
            Ok((norm, _)) => self.shared.store.lock().keys.contains_key(&norm),
            Err(_) => false,
        }
    }

    /// Set a value on an existing key. Raises [`ChangeTrigger::VALUE`].
    pub fn set_value(&self, path: &str, name: &str, data: impl Into<String>) -> Result<()> {
        let (norm, display) = Self::resolve(path)?;
        let mut store = self.shared.store.lock();
        store
            .key_mut(&norm, &display)?
            .values
            .insert(name.to_lowercase(), data.into());
        store.fire(&norm, ChangeTrigger::VALUE);
        Ok(())
    }

    /// Delete a value. Returns whether it existed; only a removal raises
    /// [`ChangeTrigger::VALUE`].
    pub fn delete_value(&self, path: &str, name: &str) -> Result<bool> {
        let (norm, display) = Self::resolve(path)?;
        let mut store = self.shared.store.lock();
        let removed = store
            .key_mut(&norm, &display)?
            .values
            .remove(&name.to_lowercase())
            .is_some();
        if removed {
            store.fire(&norm, ChangeTrigger::VALUE);
        }
        Ok(removed)
    }

    /// Read a value.
    pub fn value(&self, path: &str, name: &str) -> Option<String> {
        let (norm, _) = Self::resolve(path).ok()?;
        let store = self.shared.store.lock();
        store.keys.get(&norm)?.values.get(&name.to_lowercase()).cloned()
    }

    /// Record an attribute change. Raises [`ChangeTrigger::ATTRIBUTES`].
    pub fn touch_attributes(&self, path: &str) -> Result<()> {
        let (norm, display) = Self::resolve(path)?;
        let mut store = self.shared.store.lock();
        store.key_mut(&norm, &display)?;
        store.fire(&norm, ChangeTrigger::ATTRIBUTES);
        Ok(())
    }

    /// Grant or deny notify access. Raises [`ChangeTrigger::SECURITY`].
    pub fn set_access_denied(&self, path: &str, denied: bool) -> Result<()> {
        let (norm, display) = Self::resolve(path)?;
        let mut store = self.shared.store.lock();
        store.key_mut(&norm, &display)?.access_denied = denied;
        store.fire(&norm, ChangeTrigger::SECURITY);
        Ok(())
    }

    /// Cap every bounded wait at `max`, the way the native wait caps its
    /// timeout. `None` removes the cap.
    pub fn set_max_wait(&self, max: Option<Duration>) {
        self.shared.store.lock().max_wait = max;
    }

    /// Make the next call to `point` fail with `code`.
    pub fn inject_fault(&self, point: FaultPoint, code: u32) {
        self.shared.store.lock().faults.insert(point, code);
    }

    /// Total number of nodes opened so far.
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Number of nodes currently open.
    pub fn live_nodes(&self) -> usize {
        self.shared.live_nodes.load(Ordering::SeqCst)
    }

    /// Number of signals currently alive.
    pub fn live_signals(&self) -> usize {
        self.shared.live_signals.load(Ordering::SeqCst)
    }

    /// Number of nodes with a notification currently armed.
    pub fn armed_count(&self) -> usize {
        self.shared
            .store
            .lock()
            .nodes
            .values()
            .filter(|node| node.armed.is_some())
            .count()
    }
}

impl Default for MemoryNamespace {
    fn default() -> Self {
        Self::new()
    }
}

/// An open node in a [`MemoryNamespace`].
#[derive(Debug)]
pub struct MemoryNode {
    id: u64,
    key: String,
    shared: Arc<Shared>,
}

impl MemoryNode {
    /// The normalized key this node is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for MemoryNode {
    fn drop(&mut self) {
        self.shared.store.lock().nodes.remove(&self.id);
        self.shared.live_nodes.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A signal created by a [`MemoryNamespace`].
#[derive(Debug)]
pub struct MemorySignal {
    event: Event,
    shared: Arc<Shared>,
}

impl MemorySignal {
    /// The underlying event.
    pub fn event(&self) -> &Event {
        &self.event
    }
}

impl Drop for MemorySignal {
    fn drop(&mut self) {
        self.shared.live_signals.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Namespace for MemoryNamespace {
    type Node = MemoryNode;
    type Signal = MemorySignal;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&self, key: &ResolvedKey) -> Result<MemoryNode> {
        let norm = normalize(key);
        let mut store = self.shared.store.lock();

        if let Some(code) = store.take_fault(FaultPoint::Open) {
            return Err(WatchError::operation("open key", code));
        }

        let data = store
            .keys
            .get(&norm)
            .ok_or_else(|| WatchError::InvalidArgument(format!("key not found: {}", key)))?;
        if data.access_denied {
            return Err(WatchError::PermissionDenied(format!(
                "notify access denied on {}",
                key
            )));
        }

        let id = store.next_node;
        store.next_node += 1;
        store.nodes.insert(
            id,
            NodeWatch {
                key: norm.clone(),
                filter: None,
                armed: None,
                pending: false,
            },
        );

        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        self.shared.live_nodes.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryNode {
            id,
            key: norm,
            shared: Arc::clone(&self.shared),
        })
    }

    fn create_signal(&self, mode: ResetMode) -> Result<MemorySignal> {
        if let Some(code) = self.shared.store.lock().take_fault(FaultPoint::CreateSignal) {
            return Err(WatchError::ResourceExhausted(format!(
                "cannot create signal (status {})",
                code
            )));
        }

        self.shared.live_signals.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySignal {
            event: Event::new(mode),
            shared: Arc::clone(&self.shared),
        })
    }

    fn raise(&self, signal: &MemorySignal) -> Result<()> {
        if let Some(code) = self.shared.store.lock().take_fault(FaultPoint::Raise) {
            return Err(WatchError::operation("raise signal", code));
        }
        signal.event.set();
        Ok(())
    }

    fn arm(&self, node: &MemoryNode, wakeup: &MemorySignal, filter: WatchFilter) -> Result<()> {
        let mut store = self.shared.store.lock();

        if let Some(code) = store.take_fault(FaultPoint::Arm) {
            return Err(WatchError::operation("arm notification", code));
        }
        if !store.keys.contains_key(&node.key) {
            return Err(WatchError::operation("arm notification", STATUS_KEY_DELETED));
        }

        let watch = store
            .nodes
            .get_mut(&node.id)
            .ok_or_else(|| WatchError::Other(format!("node {} is not open", node.key)))?;
        watch.filter = Some(filter);
        if watch.pending {
            watch.pending = false;
            watch.armed = None;
            wakeup.event.set();
        } else {
            watch.armed = Some(wakeup.event.clone());
        }
        Ok(())
    }

    fn wait(
        &self,
        cancel: &MemorySignal,
        wakeup: &MemorySignal,
        budget: Option<Duration>,
    ) -> Result<WaitOutcome> {
        let max_wait = {
            let mut store = self.shared.store.lock();
            if let Some(code) = store.take_fault(FaultPoint::Wait) {
                return Err(WatchError::operation("wait for signals", code));
            }
            store.max_wait
        };
        let budget = match (budget, max_wait) {
            (Some(budget), Some(max)) => Some(budget.min(max)),
            (budget, _) => budget,
        };

        Ok(match Event::wait_any(&[&cancel.event, &wakeup.event], budget) {
            WaitResult::Signaled(0) => WaitOutcome::Cancelled,
            WaitResult::Signaled(_) => WaitOutcome::Changed,
            WaitResult::TimedOut => WaitOutcome::TimedOut,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include_subtree: bool, triggers: ChangeTrigger) -> WatchFilter {
        WatchFilter {
            include_subtree,
            triggers,
        }
    }

    fn key(path: &str) -> ResolvedKey {
        StandardResolver.resolve(path).unwrap()
    }

    #[test]
    fn test_open_missing_key() {
        let ns = MemoryNamespace::new();
        let err = ns.open(&key("HKLM\\Software\\Missing")).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(ns.open_count(), 0);
    }

    #[test]
    fn test_open_denied_key() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKLM\\Secure").unwrap();
        ns.set_access_denied("HKLM\\Secure", true).unwrap();

        let err = ns.open(&key("HKLM\\Secure")).unwrap_err();
        assert!(matches!(err, WatchError::PermissionDenied(_)));
    }

    #[test]
    fn test_open_is_case_insensitive() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\Software\\Acme").unwrap();
        let node = ns.open(&key("hkcu\\SOFTWARE\\acme")).unwrap();
        assert_eq!(node.key(), "hkcu\\software\\acme");
    }

    #[test]
    fn test_armed_value_change_raises_wakeup() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\App").unwrap();
        let node = ns.open(&key("HKCU\\App")).unwrap();
        let wakeup = ns.create_signal(ResetMode::Auto).unwrap();

        ns.arm(&node, &wakeup, filter(false, ChangeTrigger::VALUE)).unwrap();
        assert_eq!(ns.armed_count(), 1);

        ns.set_value("HKCU\\App", "Mode", "on").unwrap();
        assert!(wakeup.event().is_set());
        assert_eq!(ns.armed_count(), 0);
    }

    #[test]
    fn test_trigger_mask_filters_changes() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\App").unwrap();
        let node = ns.open(&key("HKCU\\App")).unwrap();
        let wakeup = ns.create_signal(ResetMode::Auto).unwrap();

        ns.arm(&node, &wakeup, filter(true, ChangeTrigger::SECURITY)).unwrap();
        ns.set_value("HKCU\\App", "Mode", "on").unwrap();
        ns.touch_attributes("HKCU\\App").unwrap();
        assert!(!wakeup.event().is_set());

        ns.set_access_denied("HKCU\\App", false).unwrap();
        assert!(wakeup.event().is_set());
    }

    #[test]
    fn test_subtree_flag() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKLM\\Software\\Vendor\\Product").unwrap();
        ns.create_key("HKLM\\Software\\VendorX").unwrap();

        let shallow = ns.open(&key("HKLM\\Software\\Vendor")).unwrap();
        let deep = ns.open(&key("HKLM\\Software\\Vendor")).unwrap();
        let shallow_wakeup = ns.create_signal(ResetMode::Auto).unwrap();
        let deep_wakeup = ns.create_signal(ResetMode::Auto).unwrap();

        ns.arm(&shallow, &shallow_wakeup, filter(false, ChangeTrigger::ANY)).unwrap();
        ns.arm(&deep, &deep_wakeup, filter(true, ChangeTrigger::ANY)).unwrap();

        // A sibling sharing the name prefix is not a descendant.
        ns.set_value("HKLM\\Software\\VendorX", "v", "1").unwrap();
        assert!(!deep_wakeup.event().is_set());

        ns.set_value("HKLM\\Software\\Vendor\\Product", "v", "1").unwrap();
        assert!(deep_wakeup.event().is_set());
        assert!(!shallow_wakeup.event().is_set());
    }

    #[test]
    fn test_create_and_delete_raise_subtree_on_parent() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKLM\\Software").unwrap();
        let node = ns.open(&key("HKLM\\Software")).unwrap();
        let wakeup = ns.create_signal(ResetMode::Auto).unwrap();

        ns.arm(&node, &wakeup, filter(false, ChangeTrigger::SUBTREE)).unwrap();
        ns.create_key("HKLM\\Software\\New").unwrap();
        assert!(wakeup.event().wait(Some(Duration::ZERO)));

        ns.arm(&node, &wakeup, filter(false, ChangeTrigger::SUBTREE)).unwrap();
        ns.delete_key("HKLM\\Software\\New").unwrap();
        assert!(wakeup.event().wait(Some(Duration::ZERO)));
        assert!(!ns.key_exists("HKLM\\Software\\New"));
    }

    #[test]
    fn test_changes_while_disarmed_coalesce() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\App").unwrap();
        let node = ns.open(&key("HKCU\\App")).unwrap();
        let wakeup = ns.create_signal(ResetMode::Auto).unwrap();
        let f = filter(true, ChangeTrigger::ANY);

        ns.arm(&node, &wakeup, f).unwrap();
        ns.set_value("HKCU\\App", "a", "1").unwrap();
        assert!(wakeup.event().wait(Some(Duration::ZERO)));

        // Three changes while nothing is armed.
        for i in 0..3 {
            ns.set_value("HKCU\\App", "a", i.to_string()).unwrap();
        }
        assert!(!wakeup.event().is_set());

        ns.arm(&node, &wakeup, f).unwrap();
        assert!(wakeup.event().wait(Some(Duration::ZERO)));

        ns.arm(&node, &wakeup, f).unwrap();
        assert!(!wakeup.event().wait(Some(Duration::ZERO)));
    }

    #[test]
    fn test_changes_before_first_arm_are_ignored() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\App").unwrap();
        let node = ns.open(&key("HKCU\\App")).unwrap();
        let wakeup = ns.create_signal(ResetMode::Auto).unwrap();

        ns.set_value("HKCU\\App", "a", "1").unwrap();
        ns.arm(&node, &wakeup, filter(true, ChangeTrigger::ANY)).unwrap();
        assert!(!wakeup.event().is_set());
    }

    #[test]
    fn test_arm_after_key_deleted() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\Gone").unwrap();
        let node = ns.open(&key("HKCU\\Gone")).unwrap();
        let wakeup = ns.create_signal(ResetMode::Auto).unwrap();
        ns.delete_key("HKCU\\Gone").unwrap();

        let err = ns
            .arm(&node, &wakeup, filter(true, ChangeTrigger::ANY))
            .unwrap_err();
        assert_eq!(err.code(), Some(STATUS_KEY_DELETED));
    }

    #[test]
    fn test_deleting_watched_key_wakes_node() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\App\\Inner").unwrap();
        let outer = ns.open(&key("HKCU\\App")).unwrap();
        let inner = ns.open(&key("HKCU\\App\\Inner")).unwrap();
        let outer_wakeup = ns.create_signal(ResetMode::Auto).unwrap();
        let inner_wakeup = ns.create_signal(ResetMode::Auto).unwrap();

        // Masks that no deletion trigger would match.
        ns.arm(&outer, &outer_wakeup, filter(false, ChangeTrigger::VALUE)).unwrap();
        ns.arm(&inner, &inner_wakeup, filter(false, ChangeTrigger::SECURITY)).unwrap();
        ns.delete_key("HKCU\\App").unwrap();

        assert!(outer_wakeup.event().is_set());
        assert!(inner_wakeup.event().is_set());
        let err = ns
            .arm(&outer, &outer_wakeup, filter(false, ChangeTrigger::VALUE))
            .unwrap_err();
        assert_eq!(err.code(), Some(STATUS_KEY_DELETED));
    }

    #[test]
    fn test_deleting_sibling_leaves_node_alone() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\App").unwrap();
        ns.create_key("HKCU\\AppX").unwrap();
        let node = ns.open(&key("HKCU\\AppX")).unwrap();
        let wakeup = ns.create_signal(ResetMode::Auto).unwrap();

        ns.arm(&node, &wakeup, filter(false, ChangeTrigger::VALUE)).unwrap();
        ns.delete_key("HKCU\\App").unwrap();
        assert!(!wakeup.event().is_set());
    }

    #[test]
    fn test_max_wait_caps_bounded_waits() {
        let ns = MemoryNamespace::new();
        ns.set_max_wait(Some(Duration::from_millis(10)));
        let cancel = ns.create_signal(ResetMode::Manual).unwrap();
        let wakeup = ns.create_signal(ResetMode::Auto).unwrap();

        let start = std::time::Instant::now();
        let outcome = ns.wait(&cancel, &wakeup, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_handles_counted_and_released() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\App").unwrap();
        {
            let _node = ns.open(&key("HKCU\\App")).unwrap();
            let _signal = ns.create_signal(ResetMode::Auto).unwrap();
            assert_eq!(ns.live_nodes(), 1);
            assert_eq!(ns.live_signals(), 1);
        }
        assert_eq!(ns.live_nodes(), 0);
        assert_eq!(ns.live_signals(), 0);
        assert_eq!(ns.open_count(), 1);
    }

    #[test]
    fn test_injected_faults_fire_once() {
        let ns = MemoryNamespace::new();
        ns.inject_fault(FaultPoint::CreateSignal, 8);
        assert!(matches!(
            ns.create_signal(ResetMode::Auto),
            Err(WatchError::ResourceExhausted(_))
        ));
        assert!(ns.create_signal(ResetMode::Auto).is_ok());

        ns.inject_fault(FaultPoint::Open, 5);
        assert_eq!(ns.open(&key("HKLM")).unwrap_err().code(), Some(5));
        assert!(ns.open(&key("HKLM")).is_ok());
    }

    #[test]
    fn test_wait_prefers_cancel() {
        let ns = MemoryNamespace::new();
        let cancel = ns.create_signal(ResetMode::Manual).unwrap();
        let wakeup = ns.create_signal(ResetMode::Auto).unwrap();
        ns.raise(&wakeup).unwrap();
        ns.raise(&cancel).unwrap();

        let outcome = ns.wait(&cancel, &wakeup, Some(Duration::ZERO)).unwrap();
        assert_eq!(outcome, WaitOutcome::Cancelled);
    }

    #[test]
    fn test_delete_root_rejected() {
        let ns = MemoryNamespace::new();
        assert!(ns.delete_key("HKLM").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_values() {
        let ns = MemoryNamespace::new();
        ns.create_key("HKCU\\App").unwrap();
        ns.set_value("HKCU\\App", "Name", "x").unwrap();
        assert_eq!(ns.value("HKCU\\App", "name").as_deref(), Some("x"));
        assert!(ns.delete_value("HKCU\\App", "NAME").unwrap());
        assert!(!ns.delete_value("HKCU\\App", "NAME").unwrap());
        assert!(ns.set_value("HKCU\\Missing", "a", "b").is_err());
    }
}
