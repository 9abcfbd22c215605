//! Refresh scheduler
//!
//! Drives the [`Aggregator`] on a fixed interval in live mode.
//!
//! ## Lifecycle
//!
//! 1. Create with [`RefreshScheduler::new()`]
//! 2. Run the first cycle yourself (`Aggregator::refresh_and_resolve`) so the
//!    live endpoint never starts on an empty snapshot
//! 3. Start with [`RefreshScheduler::run()`]; the first tick fires one interval later
//! 4. Cancel the token to stop
//!
//! ## Cancellation
//!
//! Cancellation is only observed between cycles. A cycle that has started
//! always runs to completion before `run()` returns.

use super::{Aggregator, CycleReport};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default capacity of the scheduler event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Whether a refresh cycle is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Events emitted by the RefreshScheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Scheduler loop started
    Started {
        providers: usize,
        interval: Duration,
    },

    /// A refresh cycle began
    CycleStarted { cycle: u64 },

    /// A refresh cycle finished
    CycleCompleted {
        cycle: u64,
        report: CycleReport,
        finished_at: chrono::DateTime<chrono::Utc>,
    },

    /// Scheduler loop stopped
    Stopped { reason: String, cycles: u64 },
}

/// Fixed-interval driver for refresh cycles
pub struct RefreshScheduler {
    aggregator: Arc<Aggregator>,
    interval: Duration,
    running: AtomicBool,
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl RefreshScheduler {
    /// Create a new scheduler
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields scheduler events
    pub fn new(
        aggregator: Arc<Aggregator>,
        interval: Duration,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        Self::with_capacity(aggregator, interval, DEFAULT_EVENT_CAPACITY)
    }

    /// Create a scheduler with a custom event channel capacity
    pub fn with_capacity(
        aggregator: Arc<Aggregator>,
        interval: Duration,
        event_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        if interval.is_zero() {
            return Err(Error::config("Refresh interval must be > 0"));
        }
        if event_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }

        let (tx, rx) = mpsc::channel(event_capacity);

        let scheduler = Self {
            aggregator,
            interval,
            running: AtomicBool::new(false),
            event_tx: tx,
        };

        Ok((scheduler, rx))
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the scheduler loop until `cancel` fires
    ///
    /// # Returns
    ///
    /// Number of cycles completed
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        info!("Refresh scheduler started (interval={:?})", self.interval);
        self.emit_event(SchedulerEvent::Started {
            providers: self.aggregator.providers().len(),
            interval: self.interval,
        });

        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Cancellation received, stopping refresh scheduler");
                    break;
                }

                Some(_) = ticks.next() => {}
            }

            // Not raced against cancellation: a started cycle always drains.
            cycles += 1;
            self.run_cycle(cycles).await;
        }

        self.emit_event(SchedulerEvent::Stopped {
            reason: "Cancelled".to_string(),
            cycles,
        });

        cycles
    }

    async fn run_cycle(&self, cycle: u64) {
        debug!("Starting refresh cycle {}", cycle);
        self.running.store(true, Ordering::SeqCst);
        self.emit_event(SchedulerEvent::CycleStarted { cycle });

        let report = self.aggregator.refresh_and_resolve().await;

        self.running.store(false, Ordering::SeqCst);
        self.emit_event(SchedulerEvent::CycleCompleted {
            cycle,
            report,
            finished_at: chrono::Utc::now(),
        });
    }

    fn emit_event(&self, event: SchedulerEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Scheduler event channel full or closed, dropping event");
        }
    }
}
