/// The unit rates and durations are converted to before being reported.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in nanoseconds.
    pub fn as_nanos(&self) -> u64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60 * 1_000_000_000,
            TimeUnit::Hours => 60 * 60 * 1_000_000_000,
            TimeUnit::Days => 24 * 60 * 60 * 1_000_000_000,
        }
    }

    /// Length of one unit in seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.as_nanos() as f64 / 1e9
    }

    /// Convert an events-per-second rate to events per this unit.
    pub fn convert_rate(&self, per_second: f64) -> f64 {
        per_second * self.as_secs_f64()
    }

    /// Convert a duration given in nanoseconds to this unit.
    pub fn convert_duration(&self, nanos: f64) -> f64 {
        nanos / self.as_nanos() as f64
    }
}
