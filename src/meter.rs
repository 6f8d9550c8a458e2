use crate::AtomicU64;
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

/// How often the moving averages are folded.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// The rates of a meter at one instant, in events per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterRates {
    pub count: u64,
    pub mean_rate: f64,
    pub m1_rate: f64,
    pub m5_rate: f64,
    pub m15_rate: f64,
}

/// An exponentially weighted moving average of a per-second rate.
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    fn over(window: Duration) -> Ewma {
        Ewma {
            alpha: 1.0 - (-TICK_INTERVAL.as_secs_f64() / window.as_secs_f64()).exp(),
            rate: 0.0,
            initialized: false,
        }
    }

    fn tick(&mut self, events: u64) {
        let instant_rate = events as f64 / TICK_INTERVAL.as_secs_f64();
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct State {
    last_tick: Instant,
    uncounted: u64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl State {
    fn tick_until(&mut self, now: Instant) {
        let age = now.saturating_duration_since(self.last_tick);
        if age < TICK_INTERVAL {
            return;
        }
        let ticks = (age.as_nanos() / TICK_INTERVAL.as_nanos()) as u32;
        self.last_tick += TICK_INTERVAL * ticks;
        for _ in 0..ticks {
            let events = std::mem::take(&mut self.uncounted);
            self.m1.tick(events);
            self.m5.tick(events);
            self.m15.tick(events);
        }
    }
}

/// Measures the rate at which events occur.
#[derive(Debug)]
pub struct Meter {
    count: AtomicU64,
    start: Instant,
    state: Mutex<State>,
}

impl Meter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(start: Instant) -> Self {
        Meter {
            count: AtomicU64::new(0),
            start,
            state: Mutex::new(State {
                last_tick: start,
                uncounted: 0,
                m1: Ewma::over(Duration::from_secs(60)),
                m5: Ewma::over(Duration::from_secs(5 * 60)),
                m15: Ewma::over(Duration::from_secs(15 * 60)),
            }),
        }
    }

    /// Record `n` events.
    pub fn mark(&self, n: u64) {
        self.mark_at(n, Instant::now());
    }

    fn mark_at(&self, n: u64, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.tick_until(now);
        state.uncounted += n;
        self.count.fetch_add(n, Ordering::AcqRel);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub fn rates(&self) -> MeterRates {
        self.rates_at(Instant::now())
    }

    fn rates_at(&self, now: Instant) -> MeterRates {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.tick_until(now);
        let count = self.count();
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let mean_rate = if count == 0 || elapsed == 0.0 {
            0.0
        } else {
            count as f64 / elapsed
        };
        MeterRates {
            count,
            mean_rate,
            m1_rate: state.m1.rate,
            m5_rate: state.m5.rate,
            m15_rate: state.m15.rate,
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_meter_has_no_rates() {
        let meter = Meter::new();
        assert_eq!(meter.rates(), MeterRates::default());
    }

    #[test]
    fn first_tick_sets_the_instant_rate() {
        let start = Instant::now();
        let meter = Meter::starting_at(start);
        meter.mark_at(10, start);

        let rates = meter.rates_at(start + TICK_INTERVAL);
        assert_eq!(rates.count, 10);
        assert_eq!(rates.mean_rate, 2.0);
        assert_eq!(rates.m1_rate, 2.0);
        assert_eq!(rates.m5_rate, 2.0);
        assert_eq!(rates.m15_rate, 2.0);
    }

    #[test]
    fn rates_decay_without_events() {
        let start = Instant::now();
        let meter = Meter::starting_at(start);
        meter.mark_at(10, start);

        let rates = meter.rates_at(start + Duration::from_secs(60));
        // one minute of silence after the first tick: 11 decaying ticks
        let expected_m1 = 2.0 * (-11.0 * 5.0 / 60.0_f64).exp();
        assert!((rates.m1_rate - expected_m1).abs() < 1e-9, "{rates:?}");
        assert!(rates.m15_rate > rates.m5_rate);
        assert!(rates.m5_rate > rates.m1_rate);
    }

    #[test]
    fn steady_rate_converges() {
        let start = Instant::now();
        let meter = Meter::starting_at(start);
        for second in 0..600 {
            meter.mark_at(3, start + Duration::from_secs(second));
        }
        let rates = meter.rates_at(start + Duration::from_secs(600));
        assert!((rates.m1_rate - 3.0).abs() < 0.01, "{rates:?}");
        assert!((rates.mean_rate - 3.0).abs() < 0.01, "{rates:?}");
    }
}
