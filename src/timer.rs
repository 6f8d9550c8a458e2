use crate::{
    Histogram,
    Meter,
    MeterRates,
    Snapshot,
};
use std::time::{
    Duration,
    Instant,
};

/// A meter of how often something happens and a histogram of how long it
/// takes. Durations are recorded in nanoseconds.
#[derive(Debug, Default)]
pub struct Timer {
    meter: Meter,
    histogram: Histogram,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.histogram.update(nanos);
        self.meter.mark(1);
    }

    /// Run `f` and record how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let _context = self.start();
        f()
    }

    /// Start timing. The elapsed time is recorded when the returned context
    /// is dropped.
    pub fn start(&self) -> TimerContext<'_> {
        TimerContext {
            timer: self,
            start: Some(Instant::now()),
        }
    }

    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    pub fn rates(&self) -> MeterRates {
        self.meter.rates()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.histogram.snapshot()
    }
}

#[must_use = "the duration is recorded when the context is dropped"]
pub struct TimerContext<'a> {
    timer: &'a Timer,
    start: Option<Instant>,
}

impl TimerContext<'_> {
    /// Record the elapsed time now and return it.
    pub fn stop(mut self) -> Duration {
        self.record().unwrap_or_default()
    }

    fn record(&mut self) -> Option<Duration> {
        let elapsed = self.start.take()?.elapsed();
        self.timer.update(elapsed);
        Some(elapsed)
    }
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        self.record();
    }
}
