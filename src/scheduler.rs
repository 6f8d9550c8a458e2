use crate::{
    FalconReporter,
    Transport,
};
use std::{
    io,
    sync::Arc,
    time::Duration,
};
use tokio::time::{
    interval_at,
    Instant,
    MissedTickBehavior,
};
use tokio_util::sync::{
    CancellationToken,
    DropGuard,
};

/// Default reporting period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Work done once per period by a [`ScheduledReporter`].
pub trait Tick: Send + Sync + 'static {
    fn tick(&self);

    /// Called once when the schedule is cancelled.
    fn stop(&self) {}
}

impl<T: Transport> Tick for FalconReporter<T> {
    fn tick(&self) {
        self.report();
    }

    fn stop(&self) {
        FalconReporter::stop(self);
    }
}

/// Runs a [`Tick`] at a fixed rate on the tokio runtime.
pub struct ScheduledReporter<T> {
    task: Arc<T>,
    period: Duration,
}

impl<T: Tick> ScheduledReporter<T> {
    pub fn new(task: Arc<T>) -> Self {
        ScheduledReporter {
            task,
            period: DEFAULT_PERIOD,
        }
    }

    /// Set how often the task runs. The first run is one period after start.
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Start ticking on the current tokio runtime. Returns a guard that stops
    /// the schedule when dropped.
    pub fn start(self) -> io::Result<DropGuard> {
        let Self { task, period } = self;
        if period.is_zero() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "reporting period must not be zero"));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(io::Error::other)?;

        let token = CancellationToken::new();
        runtime.spawn({
            let token = token.clone();
            async move {
                run_schedule(task, token, period).await;
            }
        });

        Ok(token.drop_guard())
    }
}

impl<T: Transport> FalconReporter<T> {
    /// Report every `period` until the returned guard is dropped, then stop
    /// the reporter.
    pub fn start(self, period: Duration) -> io::Result<DropGuard> {
        ScheduledReporter::new(Arc::new(self)).period(period).start()
    }
}

async fn run_schedule<T: Tick>(task: Arc<T>, token: CancellationToken, period: Duration) {
    debug!(?period, "starting scheduled reporter");
    defer! {
        debug!("scheduled reporter stopped");
    }

    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                break;
            }

            _ = interval.tick() => {
                task.tick();
            }
        }
    }

    task.stop();
}
