//! Poll Scheduler
//!
//! Fixed-period driver for the drain-and-dispatch cycle.
//!
//! The scheduler owns the cycle while armed. A single tokio task waits for
//! ticks and hands the cycle to the blocking pool for each run, then waits
//! for it to come back, so two cycles never overlap and bus transfers never
//! stall the async workers. Ticks that fall due while a cycle is still
//! running are skipped rather than queued. An external trigger (an
//! interrupt line, a test) can request an extra cycle; repeated requests
//! before the task gets to run collapse into one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::input::error::{KbdError, Result};

/// Default poll period, 1/128 s
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_nanos(7_812_500);

/// One unit of scheduled work
pub trait PollCycle: Send + 'static {
    /// Run one cycle to completion
    fn run_cycle(&mut self);
}

impl<F> PollCycle for F
where
    F: FnMut() + Send + 'static,
{
    fn run_cycle(&mut self) {
        self()
    }
}

/// Requests an immediate cycle from an armed scheduler
#[derive(Debug, Clone)]
pub struct PollTrigger {
    notify: Arc<Notify>,
}

impl PollTrigger {
    /// Request a cycle
    pub fn fire(&self) {
        self.notify.notify_one();
    }
}

/// Armed periodic task owning a [`PollCycle`]
#[derive(Debug)]
pub struct PollScheduler<C: PollCycle> {
    period: Duration,
    cancel: CancellationToken,
    notify: Arc<Notify>,
    handle: Option<JoinHandle<Option<C>>>,
}

impl<C: PollCycle> PollScheduler<C> {
    /// Spawn the periodic task; the first cycle runs immediately
    ///
    /// Must be called from within a tokio runtime. A zero period is rejected.
    pub fn arm(cycle: C, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(KbdError::Config("poll period must be non-zero".to_string()));
        }

        let cancel = CancellationToken::new();
        let notify = Arc::new(Notify::new());

        let handle = tokio::spawn(run(cycle, period, cancel.clone(), Arc::clone(&notify)));
        info!("Poll scheduler armed, period {:?}", period);

        Ok(Self {
            period,
            cancel,
            notify,
            handle: Some(handle),
        })
    }

    /// Poll period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Handle for requesting immediate cycles
    pub fn trigger(&self) -> PollTrigger {
        PollTrigger {
            notify: Arc::clone(&self.notify),
        }
    }

    /// Whether the task is still running
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the task and take the cycle back
    ///
    /// Waits for an in-flight cycle to finish. Returns `None` if the task
    /// or a cycle panicked.
    pub async fn disarm(mut self) -> Option<C> {
        self.cancel.cancel();
        let handle = self.handle.take()?;
        match handle.await {
            Ok(Some(cycle)) => {
                info!("Poll scheduler disarmed");
                Some(cycle)
            }
            Ok(None) => None,
            Err(e) => {
                error!("Poll task ended abnormally: {}", e);
                None
            }
        }
    }
}

impl<C: PollCycle> Drop for PollScheduler<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<C: PollCycle>(
    mut cycle: C,
    period: Duration,
    cancel: CancellationToken,
    notify: Arc<Notify>,
) -> Option<C> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
            _ = notify.notified() => debug!("Triggered poll"),
        }

        let ran = tokio::task::spawn_blocking(move || {
            cycle.run_cycle();
            cycle
        })
        .await;

        cycle = match ran {
            Ok(cycle) => cycle,
            Err(e) => {
                error!("Poll cycle panicked: {}", e);
                return None;
            }
        };
    }

    Some(cycle)
}
