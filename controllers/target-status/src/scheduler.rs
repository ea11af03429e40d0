//! Poll scheduler.
//!
//! Decides when a poll cycle runs. Cycles never overlap, start at most once
//! per minimum interval (measured from the end of the previous cycle), and
//! any number of triggers received while a cycle cannot start collapse into
//! a single follow-up cycle.

use crate::clock::Clock;
use crate::error::ControllerError;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Summary of one completed poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Collector pods polled
    pub pods: usize,
    /// Collectors that answered
    pub results: usize,
    /// Resources whose status was written
    pub written: usize,
}

/// One fetch, aggregate and write pass
#[async_trait::async_trait]
pub trait PollCycle: Send + Sync {
    async fn run_cycle(&self, cancel: CancellationToken) -> Result<CycleReport, ControllerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
}

/// What a trigger did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A cycle was started
    Started,
    /// The minimum interval has not passed; a cycle will start once it has
    Deferred,
    /// A cycle is running; another will follow it
    Coalesced,
}

#[derive(Debug)]
struct SchedulerState {
    phase: Phase,
    pending: bool,
    last_cycle: Option<DateTime<Utc>>,
    cycles: u64,
}

/// Single-flight, rate-limited poll cycle scheduler
#[derive(Clone)]
pub struct PollScheduler {
    cycle: Arc<dyn PollCycle>,
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    state: Arc<Mutex<SchedulerState>>,
    wake: Arc<Notify>,
    cancel: CancellationToken,
}

impl PollScheduler {
    pub fn new(
        cycle: Arc<dyn PollCycle>,
        clock: Arc<dyn Clock>,
        min_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cycle,
            clock,
            min_interval,
            state: Arc::new(Mutex::new(SchedulerState {
                phase: Phase::Idle,
                pending: false,
                last_cycle: None,
                cycles: 0,
            })),
            wake: Arc::new(Notify::new()),
            cancel,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Whether a trigger is waiting for the next cycle
    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// End time of the last completed cycle
    #[cfg(test)]
    pub fn last_cycle(&self) -> Option<DateTime<Utc>> {
        self.lock().last_cycle
    }

    #[cfg(test)]
    pub fn cycles_completed(&self) -> u64 {
        self.lock().cycles
    }

    /// Time left until a cycle may start
    fn remaining(&self, state: &SchedulerState) -> Duration {
        match state.last_cycle {
            None => Duration::ZERO,
            Some(last) => {
                let elapsed = (self.clock.now() - last).to_std().unwrap_or(Duration::ZERO);
                self.min_interval.saturating_sub(elapsed)
            }
        }
    }

    /// Request a poll cycle
    pub fn trigger(&self) -> TriggerOutcome {
        let mut state = self.lock();
        match state.phase {
            Phase::Polling => {
                state.pending = true;
                debug!("Poll cycle running, coalescing trigger");
                TriggerOutcome::Coalesced
            }
            Phase::Idle if !self.remaining(&state).is_zero() => {
                state.pending = true;
                debug!("Minimum poll interval not elapsed, deferring trigger");
                TriggerOutcome::Deferred
            }
            Phase::Idle => {
                state.phase = Phase::Polling;
                state.pending = false;
                drop(state);
                self.spawn_cycle();
                TriggerOutcome::Started
            }
        }
    }

    fn spawn_cycle(&self) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let started = scheduler.clock.now();
            match scheduler.cycle.run_cycle(scheduler.cancel.child_token()).await {
                Ok(report) => info!(
                    pods = report.pods,
                    results = report.results,
                    written = report.written,
                    duration_ms = (scheduler.clock.now() - started).num_milliseconds(),
                    "Poll cycle complete"
                ),
                Err(ControllerError::Cancelled) => info!("Poll cycle cancelled"),
                Err(e) => error!(error = %e, "Poll cycle failed"),
            }
            scheduler.finish_cycle();
        });
    }

    fn finish_cycle(&self) {
        let pending = {
            let mut state = self.lock();
            state.phase = Phase::Idle;
            state.last_cycle = Some(self.clock.now());
            state.cycles += 1;
            std::mem::take(&mut state.pending)
        };
        if pending {
            self.trigger();
        }
        self.wake.notify_one();
    }

    /// Trigger a cycle per message on `triggers` until cancelled or the
    /// channel closes. Deferred triggers fire once the interval elapses.
    pub async fn run(self, mut triggers: mpsc::Receiver<()>) -> Result<(), ControllerError> {
        info!(min_interval_secs = self.min_interval.as_secs_f64(), "Starting poll scheduler");
        loop {
            let deferred = {
                let state = self.lock();
                (state.pending && state.phase == Phase::Idle).then(|| self.remaining(&state))
            };
            let sleep: Pin<Box<dyn Future<Output = ()> + Send>> = match deferred {
                Some(remaining) => self.clock.sleep(remaining),
                None => Box::pin(futures::future::pending()),
            };

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Poll scheduler stopping");
                    return Ok(());
                }
                trigger = triggers.recv() => match trigger {
                    Some(()) => {
                        self.trigger();
                    }
                    None => {
                        info!("Trigger channel closed, stopping poll scheduler");
                        return Ok(());
                    }
                },
                _ = self.wake.notified() => {}
                _ = sleep => {
                    self.trigger();
                }
            }
        }
    }
}
