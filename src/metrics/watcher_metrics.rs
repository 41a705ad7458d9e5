//! Watcher metrics tracking using OpenTelemetry.

use crate::error::Result;
use crate::notify::WatchExit;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for subscription activity.
///
/// # Examples
///
/// ```rust,no_run
/// use regwatch::metrics::WatcherMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("regwatch");
/// let metrics = WatcherMetrics::new(meter);
///
/// let timer = metrics.start_subscription();
/// metrics.record_notification();
/// metrics.record_exit(timer, &Ok(regwatch::notify::WatchExit::Cancelled));
/// ```
#[derive(Clone)]
pub struct WatcherMetrics {
    subscriptions_started: Counter<u64>,
    notifications: Counter<u64>,
    exits: Counter<u64>,
    failures: Counter<u64>,
    subscription_duration: Histogram<f64>,
    active_subscriptions: Gauge<i64>,
}

impl WatcherMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let subscriptions_started = meter
            .u64_counter("regwatch.subscriptions.started")
            .with_description("Total number of subscriptions started")
            .build();

        let notifications = meter
            .u64_counter("regwatch.notifications")
            .with_description("Number of change notifications delivered to callbacks")
            .build();

        let exits = meter
            .u64_counter("regwatch.subscriptions.exits")
            .with_description("Subscriptions that ended normally, by reason")
            .build();

        let failures = meter
            .u64_counter("regwatch.subscriptions.failures")
            .with_description("Subscriptions that ended with an error")
            .build();

        let subscription_duration = meter
            .f64_histogram("regwatch.subscriptions.duration")
            .with_description("Time a subscription stayed blocked in seconds")
            .with_unit("s")
            .build();

        let active_subscriptions = meter
            .i64_gauge("regwatch.subscriptions.active")
            .with_description("Number of subscriptions currently blocked")
            .build();

        Self {
            subscriptions_started,
            notifications,
            exits,
            failures,
            subscription_duration,
            active_subscriptions,
        }
    }

    /// Count a new subscription and return its start time.
    pub fn start_subscription(&self) -> Instant {
        self.subscriptions_started.add(1, &[]);
        Instant::now()
    }

    /// Count one notification delivered to a callback.
    pub fn record_notification(&self) {
        self.notifications.add(1, &[]);
    }

    /// Record how a subscription ended.
    ///
    /// # Arguments
    ///
    /// * `start` - The `Instant` returned from `start_subscription()`
    /// * `outcome` - The subscription's result
    pub fn record_exit(&self, start: Instant, outcome: &Result<WatchExit>) {
        self.subscription_duration
            .record(start.elapsed().as_secs_f64(), &[]);

        match outcome {
            Ok(exit) => {
                let reason = match exit {
                    WatchExit::Cancelled => "cancelled",
                    WatchExit::TimedOut => "timed_out",
                };
                self.exits.add(1, &[KeyValue::new("reason", reason)]);
            }
            Err(err) => {
                self.failures.add(1, &[KeyValue::new("kind", err.kind())]);
            }
        }
    }

    /// Record a subscription that ended because its callback panicked.
    pub fn record_panic(&self, start: Instant) {
        self.subscription_duration
            .record(start.elapsed().as_secs_f64(), &[]);
        self.failures.add(1, &[KeyValue::new("kind", "callback_panicked")]);
    }

    /// Update the number of active subscriptions.
    pub fn update_active_count(&self, count: i64) {
        self.active_subscriptions.record(count, &[]);
    }
}
