//! Blocking, cancellable change watcher.

use crate::backend::{Namespace, ResetMode, WaitOutcome, WatchFilter};
use crate::core::{NamespaceResolver, ResolvedKey, StandardResolver, SubscribeOptions};
use crate::error::{CallbackError, Result, WatchError};
use crate::notify::{SubscriptionInfo, SubscriptionRegistry};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

#[cfg(feature = "metrics")]
use crate::metrics::WatcherMetrics;

#[cfg(windows)]
use crate::backend::RegistryNamespace;

/// Why a subscription returned without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// [`ChangeWatcher::stop_all`] was called.
    Cancelled,
    /// The subscription's duration elapsed.
    TimedOut,
}

/// Watches namespace nodes and invokes callbacks when they change.
///
/// Each [`subscribe`](Self::subscribe) call blocks the calling thread and
/// runs the arm/wait/deliver loop there; run several subscriptions at once
/// by calling it from several threads. One [`stop_all`](Self::stop_all)
/// ends every subscription on this watcher, current and future. Use a
/// separate watcher per subscription when they must be stopped
/// independently.
///
/// # Examples
///
/// ```rust
/// use regwatch::backend::MemoryNamespace;
/// use regwatch::prelude::*;
/// use std::time::Duration;
///
/// # fn example() -> Result<()> {
/// let ns = MemoryNamespace::new();
/// ns.create_key("HKCU\\Software\\Acme")?;
/// let watcher = ChangeWatcher::with_namespace(ns)?;
///
/// std::thread::scope(|s| {
///     s.spawn(|| {
///         watcher.subscribe(
///             "HKCU\\Software\\Acme",
///             || println!("Change was detected!"),
///             SubscribeOptions::default(),
///         )
///     });
///
///     std::thread::sleep(Duration::from_millis(50));
///     watcher.stop_all()
/// })?;
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct ChangeWatcher<N: Namespace> {
    namespace: N,
    resolver: Arc<dyn NamespaceResolver>,
    /// Manual-reset; raised once by `stop_all` and never cleared.
    cancel: N::Signal,
    stopped: AtomicBool,
    subscriptions: SubscriptionRegistry,
    #[cfg(feature = "metrics")]
    metrics: Option<WatcherMetrics>,
}

#[cfg(windows)]
impl ChangeWatcher<RegistryNamespace> {
    /// Create a watcher over the local Windows registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the cancellation event cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_namespace(RegistryNamespace::new())
    }
}

impl<N: Namespace> ChangeWatcher<N> {
    /// Create a watcher over `namespace` using the standard root names.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ResourceExhausted`] if the cancellation signal
    /// cannot be created.
    pub fn with_namespace(namespace: N) -> Result<Self> {
        let cancel = namespace.create_signal(ResetMode::Manual)?;
        Ok(Self {
            namespace,
            resolver: Arc::new(StandardResolver),
            cancel,
            stopped: AtomicBool::new(false),
            subscriptions: SubscriptionRegistry::new(),
            #[cfg(feature = "metrics")]
            metrics: None,
        })
    }

    /// Replace the path resolver.
    pub fn with_resolver<R: NamespaceResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Record subscription activity in `metrics`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: WatcherMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The backend this watcher runs on.
    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    /// Whether [`stop_all`](Self::stop_all) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Snapshot of the subscriptions currently blocked on this watcher.
    pub fn active_subscriptions(&self) -> Vec<SubscriptionInfo> {
        self.subscriptions.snapshot()
    }

    /// Watch `path` and call `callback` on every qualifying change.
    ///
    /// Blocks until the watcher is stopped, `options.duration` elapses
    /// (`Duration::ZERO` waits forever), or an error occurs. The callback
    /// runs on the calling thread; no notification is armed while it runs,
    /// so changes made during a callback produce one further call rather
    /// than one per change.
    ///
    /// # Errors
    ///
    /// - [`WatchError::InvalidArgument`] for an unknown root or missing key
    /// - [`WatchError::PermissionDenied`] if the key may not be watched
    /// - [`WatchError::ResourceExhausted`] if the wakeup signal cannot be created
    /// - [`WatchError::OperationFailed`] for any other OS failure
    pub fn subscribe<F>(&self, path: &str, mut callback: F, options: SubscribeOptions) -> Result<WatchExit>
    where
        F: FnMut(),
    {
        self.try_subscribe(
            path,
            move || {
                callback();
                Ok::<(), Infallible>(())
            },
            options,
        )
    }

    /// Like [`subscribe`](Self::subscribe), with a fallible callback.
    ///
    /// A callback error ends the subscription with
    /// [`WatchError::CallbackFailed`] after the node and wakeup signal are
    /// released.
    pub fn try_subscribe<F, E>(&self, path: &str, callback: F, options: SubscribeOptions) -> Result<WatchExit>
    where
        F: FnMut() -> std::result::Result<(), E>,
        E: Into<CallbackError>,
    {
        let started = Instant::now();
        let key = self.resolver.resolve(path)?;

        if self.is_stopped() {
            debug!(path = %key, "watcher already stopped, not subscribing");
            return Ok(WatchExit::Cancelled);
        }

        #[cfg(feature = "metrics")]
        let mut recorder = self
            .metrics
            .as_ref()
            .map(|metrics| ExitRecorder::start(metrics, &self.subscriptions));

        debug!(
            path = %key,
            backend = self.namespace.name(),
            duration = ?options.duration,
            include_subtree = options.include_subtree,
            triggers = ?options.triggers,
            "subscription started"
        );

        let result = self.run(&key, started, callback, options);

        match &result {
            Ok(exit) => debug!(path = %key, ?exit, "subscription ended"),
            Err(err) => warn!(path = %key, kind = err.kind(), error = %err, "subscription failed"),
        }

        #[cfg(feature = "metrics")]
        if let Some(recorder) = recorder.as_mut() {
            recorder.finish(&result);
        }

        result
    }

    fn run<F, E>(
        &self,
        key: &ResolvedKey,
        started: Instant,
        mut callback: F,
        options: SubscribeOptions,
    ) -> Result<WatchExit>
    where
        F: FnMut() -> std::result::Result<(), E>,
        E: Into<CallbackError>,
    {
        // Both are released on every return path, including a panicking callback.
        let node = self.namespace.open(key)?;
        let wakeup = self.namespace.create_signal(ResetMode::Auto)?;
        let _registration = self.subscriptions.register(key.to_string(), options);

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.update_active_count(self.subscriptions.len() as i64);
        }

        let filter = WatchFilter {
            include_subtree: options.include_subtree,
            triggers: options.triggers,
        };

        let mut armed = false;
        loop {
            if !armed {
                self.namespace.arm(&node, &wakeup, filter)?;
                armed = true;
            }

            // Recomputed every cycle so time spent in callbacks counts.
            let budget = if options.is_unbounded() {
                None
            } else {
                Some(options.duration.saturating_sub(started.elapsed()))
            };
            trace!(path = %key, ?budget, "armed, waiting");

            match self.namespace.wait(&self.cancel, &wakeup, budget)? {
                WaitOutcome::Changed => {
                    armed = false;
                    trace!(path = %key, "change detected");
                    #[cfg(feature = "metrics")]
                    if let Some(metrics) = &self.metrics {
                        metrics.record_notification();
                    }
                    callback().map_err(|e| WatchError::CallbackFailed(e.into()))?;
                }
                WaitOutcome::Cancelled => return Ok(WatchExit::Cancelled),
                // Native waits cap their timeout, so a wait can end before the deadline.
                WaitOutcome::TimedOut
                    if options.is_unbounded() || started.elapsed() < options.duration =>
                {
                    trace!(path = %key, "wait ended before the deadline, waiting again");
                }
                WaitOutcome::TimedOut => return Ok(WatchExit::TimedOut),
            }
        }
    }

    /// Stop every subscription on this watcher.
    ///
    /// Blocked subscriptions wake and return [`WatchExit::Cancelled`];
    /// later subscriptions return it immediately. Stopping is permanent and
    /// idempotent. Does not wait for subscribers to return.
    ///
    /// # Errors
    ///
    /// Returns an error if the cancellation signal cannot be raised.
    pub fn stop_all(&self) -> Result<()> {
        self.namespace.raise(&self.cancel)?;
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!(
                active = self.subscriptions.len(),
                backend = self.namespace.name(),
                "stopping all subscriptions"
            );
        }
        Ok(())
    }
}

/// Records a subscription's end in metrics, including when a callback panics.
#[cfg(feature = "metrics")]
struct ExitRecorder<'a> {
    metrics: &'a WatcherMetrics,
    subscriptions: &'a SubscriptionRegistry,
    start: Instant,
    finished: bool,
}

#[cfg(feature = "metrics")]
impl<'a> ExitRecorder<'a> {
    fn start(metrics: &'a WatcherMetrics, subscriptions: &'a SubscriptionRegistry) -> Self {
        Self {
            metrics,
            subscriptions,
            start: metrics.start_subscription(),
            finished: false,
        }
    }

    fn finish(&mut self, result: &Result<WatchExit>) {
        self.metrics.record_exit(self.start, result);
        self.finished = true;
    }
}

#[cfg(feature = "metrics")]
impl Drop for ExitRecorder<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.metrics.record_panic(self.start);
        }
        self.metrics
            .update_active_count(self.subscriptions.len() as i64);
    }
}

#[cfg(feature = "tokio-runtime")]
impl<N> ChangeWatcher<N>
where
    N: Namespace + 'static,
    N::Signal: 'static,
{
    /// Run [`subscribe`](Self::subscribe) on tokio's blocking thread pool.
    ///
    /// The loop and its coalescing behaviour are unchanged; only the
    /// caller is freed to await instead of block.
    pub async fn subscribe_async<F>(
        self: Arc<Self>,
        path: impl Into<String>,
        callback: F,
        options: SubscribeOptions,
    ) -> Result<WatchExit>
    where
        F: FnMut() + Send + 'static,
    {
        let path = path.into();
        tokio::task::spawn_blocking(move || self.subscribe(&path, callback, options))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic())
                } else {
                    WatchError::Other(format!("subscription task failed: {}", e))
                }
            })?
    }
}
