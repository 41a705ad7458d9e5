//! Namespace backends.
//!
//! A [`Namespace`] is the seam between the watcher loop and the facility
//! that actually reports changes. The loop only ever opens a node, creates
//! signals, arms a one-shot notification and waits; everything OS-specific
//! lives behind this trait.
//!
//! - [`MemoryNamespace`]: in-process hierarchical store, available everywhere
//! - `RegistryNamespace`: the Windows registry (Windows only)

mod memory;
mod signal;

#[cfg(windows)]
mod windows;

pub use memory::{FaultPoint, MemoryNamespace, MemoryNode, MemorySignal};
pub use signal::{Event, ResetMode, WaitResult};

#[cfg(windows)]
pub use self::windows::{RegistryNamespace, RegistryNode, RegistrySignal};

use crate::core::{ChangeTrigger, ResolvedKey};
use crate::error::Result;
use std::time::Duration;

/// What to arm a notification for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchFilter {
    /// Report changes to descendant keys as well
    pub include_subtree: bool,
    /// Kinds of change that qualify
    pub triggers: ChangeTrigger,
}

/// Which signal ended a composite wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The cancellation signal is raised.
    Cancelled,
    /// The wakeup signal was raised by a qualifying change.
    Changed,
    /// The wait budget elapsed.
    TimedOut,
}

/// A hierarchical key/value store that can report changes to its nodes.
///
/// Nodes and signals are released when dropped, so every exit path of a
/// subscription releases them without extra bookkeeping.
pub trait Namespace: Send + Sync {
    /// An open handle to one node, opened with notification rights.
    type Node: Send;

    /// A waitable signal.
    type Signal: Send + Sync;

    /// Get a human-readable name for this backend (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Open the node at `key`.
    ///
    /// # Errors
    ///
    /// - [`WatchError::InvalidArgument`](crate::error::WatchError::InvalidArgument) if the node does not exist
    /// - [`WatchError::PermissionDenied`](crate::error::WatchError::PermissionDenied) if it may not be watched
    /// - [`WatchError::OperationFailed`](crate::error::WatchError::OperationFailed) otherwise
    fn open(&self, key: &ResolvedKey) -> Result<Self::Node>;

    /// Create an unraised signal.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ResourceExhausted`](crate::error::WatchError::ResourceExhausted) if no signal can be created.
    fn create_signal(&self, mode: ResetMode) -> Result<Self::Signal>;

    /// Raise `signal`. Raising a raised signal succeeds.
    fn raise(&self, signal: &Self::Signal) -> Result<()>;

    /// Request a single notification on `wakeup` for the next qualifying change to `node`.
    fn arm(&self, node: &Self::Node, wakeup: &Self::Signal, filter: WatchFilter) -> Result<()>;

    /// Block until `cancel` or `wakeup` is raised or `budget` elapses.
    ///
    /// `None` waits without a bound. Cancellation takes priority when both
    /// signals are raised. A zero budget still observes raised signals.
    fn wait(
        &self,
        cancel: &Self::Signal,
        wakeup: &Self::Signal,
        budget: Option<Duration>,
    ) -> Result<WaitOutcome>;
}
