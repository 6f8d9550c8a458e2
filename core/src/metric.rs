use crate::MetricValue;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// How the monitoring backend interprets a reported value.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CounterType {
    /// The value is stored as reported.
    #[default]
    Gauge,
    /// The value is a running count. The backend stores the rate between two
    /// successive reports, `(current - last) / step`.
    Counter,
}

impl CounterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterType::Gauge => "GAUGE",
            CounterType::Counter => "COUNTER",
        }
    }
}

impl fmt::Display for CounterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One data point in the format of the Open-Falcon push API.
///
/// Records are created with [`FalconMetric::named`] and are immutable once
/// built. Two records are equal only if every field is equal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FalconMetric {
    /// The host or service the data point belongs to.
    endpoint: String,
    /// The dotted metric name.
    metric: String,
    /// Unix timestamp in seconds.
    timestamp: i64,
    /// The reporting interval in seconds.
    step: u32,
    value: MetricValue,
    counter_type: CounterType,
    /// Comma separated `key=value` pairs, may be empty.
    tags: String,
}

impl FalconMetric {
    /// Start building a record with the given metric name.
    pub fn named(name: impl Into<String>) -> FalconMetricBuilder {
        FalconMetricBuilder {
            metric: FalconMetric {
                endpoint: String::new(),
                metric: name.into(),
                timestamp: 0,
                step: 0,
                value: MetricValue::default(),
                counter_type: CounterType::default(),
                tags: String::new(),
            },
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    pub fn counter_type(&self) -> CounterType {
        self.counter_type
    }

    pub fn tags(&self) -> &str {
        &self.tags
    }
}

/// A builder for a [`FalconMetric`].
#[derive(Debug, Clone)]
#[must_use]
pub struct FalconMetricBuilder {
    metric: FalconMetric,
}

impl FalconMetricBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.metric.endpoint = endpoint.into();
        self
    }

    pub fn value(mut self, value: impl Into<MetricValue>) -> Self {
        self.metric.value = value.into();
        self
    }

    pub fn step(mut self, step: u32) -> Self {
        self.metric.step = step;
        self
    }

    pub fn counter_type(mut self, counter_type: CounterType) -> Self {
        self.metric.counter_type = counter_type;
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.metric.timestamp = timestamp;
        self
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.metric.tags = tags.into();
        self
    }

    pub fn build(self) -> FalconMetric {
        self.metric
    }
}
