use std::fmt;

/// The kind of instrument a registry entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricType {
    /// A counter is a cumulative metric that represents a single monotonically
    /// increasing counter whose value can only increase or be reset to zero on
    /// restart. For example, you can use a counter to represent the number of
    /// requests served, tasks completed, or errors.
    Counter,
    /// A gauge is a metric that represents a single value that can arbitrarily
    /// go up and down, like the current memory usage or the number of
    /// concurrent requests.
    Gauge,
    /// A histogram samples observations (usually things like response sizes)
    /// and provides a statistical snapshot of their distribution.
    Histogram,
    /// A meter measures the rate at which events occur: the mean rate and the
    /// 1, 5 and 15 minute exponentially weighted moving averages.
    Meter,
    /// A timer is a meter of how often an operation runs combined with a
    /// histogram of how long it takes.
    Timer,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Meter => "meter",
            MetricType::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
