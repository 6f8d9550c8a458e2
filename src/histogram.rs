use crate::AtomicU64;
use hdrhistogram::CreationError;
use std::{
    sync::{
        atomic::Ordering,
        Mutex,
        PoisonError,
    },
    time::{
        Duration,
        Instant,
    },
};

/// A statistical summary of a histogram at one instant.
///
/// All values are in the unit the histogram was updated with, timers use
/// nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub median: f64,
    pub p75: f64,
    pub p95: f64,
    pub p98: f64,
    pub p99: f64,
    pub p999: f64,
}

impl Snapshot {
    /// Apply `f` to every distribution value, leaving the count as is.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Snapshot {
        Snapshot {
            count: self.count,
            min: f(self.min),
            max: f(self.max),
            mean: f(self.mean),
            stddev: f(self.stddev),
            median: f(self.median),
            p75: f(self.p75),
            p95: f(self.p95),
            p98: f(self.p98),
            p99: f(self.p99),
            p999: f(self.p999),
        }
    }
}

/// How long observations stay in a histogram by default.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(300);

/// A histogram of non-negative integer observations.
///
/// Backed by auto-resizing HDR histograms with three significant figures,
/// so quantiles are accurate to 0.1% of the recorded value.
///
/// Distribution values only cover recent observations: the histogram keeps
/// the current and the previous window and rotates them once a window has
/// passed, so a snapshot sees between one and two windows of data. The count
/// covers the whole lifetime.
pub struct Histogram {
    count: AtomicU64,
    window: Duration,
    state: Mutex<Windows>,
}

struct Windows {
    current: hdrhistogram::Histogram<u64>,
    previous: hdrhistogram::Histogram<u64>,
    rotated_at: Instant,
}

impl Windows {
    fn rotate(&mut self, now: Instant, window: Duration) {
        let age = now.saturating_duration_since(self.rotated_at);
        if age < window {
            return;
        }
        if age >= window * 2 {
            self.previous.reset();
            self.current.reset();
            self.rotated_at = now;
        } else {
            std::mem::swap(&mut self.current, &mut self.previous);
            self.current.reset();
            self.rotated_at += window;
        }
    }
}

impl Histogram {
    const SIGFIG: u8 = 3;

    pub fn new() -> Self {
        // hdrhistogram accepts 0..=5 significant figures
        Self::with_window(DEFAULT_WINDOW, Self::SIGFIG)
            .expect("three significant figures are within hdrhistogram bounds")
    }

    /// Keep observations for `window` to `2 * window`, with `sigfig`
    /// significant figures of precision.
    pub fn with_window(window: Duration, sigfig: u8) -> Result<Self, CreationError> {
        let mut current = hdrhistogram::Histogram::new(sigfig)?;
        current.auto(true);
        let previous = current.clone();
        Ok(Histogram {
            count: AtomicU64::new(0),
            window,
            state: Mutex::new(Windows {
                current,
                previous,
                rotated_at: Instant::now(),
            }),
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn update(&self, value: u64) {
        self.update_at(value, Instant::now());
    }

    pub fn update_at(&self, value: u64, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.rotate(now, self.window);
        if state.current.record(value).is_err() {
            state.current.saturating_record(value);
        }
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of observations since creation.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> Snapshot {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.rotate(now, self.window);

        let merged;
        let recent = if state.previous.is_empty() {
            &state.current
        } else if state.current.is_empty() {
            &state.previous
        } else {
            let mut both = state.previous.clone();
            if let Err(err) = both.add(&state.current) {
                warn!(?err, "failed to merge histogram windows, using the current one");
                both = state.current.clone();
            }
            merged = both;
            &merged
        };

        let count = self.count();
        if recent.is_empty() {
            return Snapshot {
                count,
                ..Default::default()
            };
        }
        let quantile = |q: f64| recent.value_at_quantile(q) as f64;
        Snapshot {
            count,
            min: recent.min() as f64,
            max: recent.max() as f64,
            mean: recent.mean(),
            stddev: recent.stdev(),
            median: quantile(0.5),
            p75: quantile(0.75),
            p95: quantile(0.95),
            p98: quantile(0.98),
            p99: quantile(0.99),
            p999: quantile(0.999),
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram")
            .field("count", &self.count())
            .field("window", &self.window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_is_zero() {
        assert_eq!(Histogram::new().snapshot(), Snapshot::default());
    }

    #[test]
    fn snapshot_of_uniform_values() {
        let histogram = Histogram::new();
        for v in 1..=1000 {
            histogram.update(v);
        }
        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count, 1000);
        assert_eq!(snapshot.min, 1.0);
        assert_eq!(snapshot.max, 1000.0);
        assert!((snapshot.mean - 500.5).abs() < 1.0, "{snapshot:?}");
        assert!((snapshot.median - 500.0).abs() <= 1.0, "{snapshot:?}");
        assert!((snapshot.p99 - 990.0).abs() <= 1.0, "{snapshot:?}");
        assert!(snapshot.stddev > 280.0 && snapshot.stddev < 300.0, "{snapshot:?}");
    }

    #[test]
    fn large_values_resize() {
        let histogram = Histogram::new();
        histogram.update(2_000_000_000);
        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count, 1);
        let error = (snapshot.max - 2e9).abs() / 2e9;
        assert!(error < 0.001, "{snapshot:?}");
    }

    #[test]
    fn mixed_magnitudes_keep_their_quantiles() {
        let histogram = Histogram::new();
        for _ in 0..100_000 {
            histogram.update(1_000_000_000);
        }
        for _ in 0..1_000 {
            histogram.update(1_000_000);
        }
        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count, 101_000);
        assert!((snapshot.median - 1e9).abs() / 1e9 < 0.001, "{snapshot:?}");
        assert!((snapshot.p99 - 1e9).abs() / 1e9 < 0.001, "{snapshot:?}");
        assert!((snapshot.min - 1e6).abs() / 1e6 < 0.001, "{snapshot:?}");
    }

    #[test]
    fn old_values_fall_out_of_the_window() {
        let window = Duration::from_secs(60);
        let histogram = Histogram::with_window(window, 3).unwrap();
        let start = Instant::now();

        histogram.update_at(1_000, start);
        histogram.update_at(10, start + Duration::from_secs(70));

        // both windows are still visible
        let snapshot = histogram.snapshot_at(start + Duration::from_secs(80));
        assert_eq!(snapshot.max, 1_000.0, "{snapshot:?}");
        assert_eq!(snapshot.min, 10.0, "{snapshot:?}");

        // the first window has been rotated out
        let snapshot = histogram.snapshot_at(start + Duration::from_secs(130));
        assert_eq!(snapshot.max, 10.0, "{snapshot:?}");
        assert_eq!(snapshot.count, 2);

        // nothing recent
        let snapshot = histogram.snapshot_at(start + Duration::from_secs(300));
        assert_eq!(
            snapshot,
            Snapshot {
                count: 2,
                ..Default::default()
            }
        );
    }

    #[test]
    fn map_keeps_count() {
        let snapshot = Snapshot {
            count: 3,
            max: 2e9,
            ..Default::default()
        };
        let mapped = snapshot.map(|v| v / 1e9);
        assert_eq!(mapped.count, 3);
        assert_eq!(mapped.max, 2.0);
    }
}
