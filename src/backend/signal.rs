//! Portable manual/auto-reset events with a composite wait.
//!
//! [`Event::wait_any`] blocks on several events at once and returns the
//! lowest-indexed one that is set, consuming it when it is auto-reset.
//! Waiters park on a private [`Parker`] that every watched event knows
//! about, so a `set` that races with the scan is never lost.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How an event behaves after a waiter observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Stays set until explicitly reset.
    Manual,
    /// Cleared by the single waiter that observes it.
    Auto,
}

/// Outcome of [`Event::wait_any`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// The event at this index was set.
    Signaled(usize),
    /// The timeout elapsed with no event set.
    TimedOut,
}

struct Parker {
    woken: Mutex<bool>,
    cv: Condvar,
}

impl Parker {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            woken: Mutex::new(false),
            cv: Condvar::new(),
        })
    }

    fn unpark(&self) {
        *self.woken.lock() = true;
        self.cv.notify_one();
    }

    /// Park until woken or `deadline` passes. Returns false on timeout.
    fn park(&self, deadline: Option<Instant>) -> bool {
        let mut woken = self.woken.lock();
        while !*woken {
            match deadline {
                Some(deadline) => {
                    if self.cv.wait_until(&mut woken, deadline).timed_out() {
                        let was_woken = *woken;
                        *woken = false;
                        return was_woken;
                    }
                }
                None => self.cv.wait(&mut woken),
            }
        }
        *woken = false;
        true
    }
}

struct EventState {
    set: bool,
    waiters: Vec<Arc<Parker>>,
}

struct EventInner {
    mode: ResetMode,
    state: Mutex<EventState>,
}

/// A cloneable, thread-safe event.
///
/// # Examples
///
/// ```rust
/// use regwatch::backend::{Event, ResetMode, WaitResult};
/// use std::time::Duration;
///
/// let cancel = Event::new(ResetMode::Manual);
/// let wakeup = Event::new(ResetMode::Auto);
///
/// wakeup.set();
/// let result = Event::wait_any(&[&cancel, &wakeup], Some(Duration::ZERO));
/// assert_eq!(result, WaitResult::Signaled(1));
/// assert!(!wakeup.is_set());
/// ```
#[derive(Clone)]
pub struct Event {
    inner: Arc<EventInner>,
}

impl Event {
    /// Create an unset event.
    pub fn new(mode: ResetMode) -> Self {
        Self {
            inner: Arc::new(EventInner {
                mode,
                state: Mutex::new(EventState {
                    set: false,
                    waiters: Vec::new(),
                }),
            }),
        }
    }

    /// The reset mode this event was created with.
    pub fn mode(&self) -> ResetMode {
        self.inner.mode
    }

    /// Set the event and wake everyone parked on it. Setting a set event is a no-op.
    pub fn set(&self) {
        let mut state = self.inner.state.lock();
        state.set = true;
        for waiter in &state.waiters {
            waiter.unpark();
        }
    }

    /// Clear the event.
    pub fn reset(&self) {
        self.inner.state.lock().set = false;
    }

    /// Whether the event is currently set.
    pub fn is_set(&self) -> bool {
        self.inner.state.lock().set
    }

    /// Whether two handles refer to the same event.
    pub fn same_event(&self, other: &Event) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Take the event if set, consuming it when auto-reset.
    fn try_take(state: &mut EventState, mode: ResetMode) -> bool {
        if state.set {
            if mode == ResetMode::Auto {
                state.set = false;
            }
            true
        } else {
            false
        }
    }

    /// Block until any of `events` is set or `timeout` elapses.
    ///
    /// `None` waits forever. A zero timeout still checks every event once.
    /// When several events are set the lowest index wins.
    pub fn wait_any(events: &[&Event], timeout: Option<Duration>) -> WaitResult {
        let deadline = timeout.map(|t| Instant::now() + t);
        let parker = Parker::new();
        let mut registered = false;

        let result = loop {
            let mut hit = None;
            for (index, event) in events.iter().enumerate() {
                let mut state = event.inner.state.lock();
                if Self::try_take(&mut state, event.inner.mode) {
                    hit = Some(index);
                    break;
                }
                if !registered {
                    state.waiters.push(Arc::clone(&parker));
                }
            }
            registered = true;

            if let Some(index) = hit {
                break WaitResult::Signaled(index);
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    break WaitResult::TimedOut;
                }
            }

            parker.park(deadline);
        };

        for event in events {
            event
                .inner
                .state
                .lock()
                .waiters
                .retain(|w| !Arc::ptr_eq(w, &parker));
        }

        result
    }

    /// Block until this event is set or `timeout` elapses.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        matches!(Self::wait_any(&[self], timeout), WaitResult::Signaled(_))
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("mode", &self.inner.mode)
            .field("set", &self.is_set())
            .finish()
    }
}
