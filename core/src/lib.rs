//! Open-Falcon push records and their JSON wire encoding.
//!
//! A [`FalconMetric`] is one data point as the Open-Falcon agent's
//! `/v1/push` API expects it. [`FalconMetrics`] is the deduplicated batch
//! that is sent in a single request.

mod metric;
mod metric_type;
mod metrics;
pub mod util_time;
mod value;

pub use metric::{
    CounterType,
    FalconMetric,
    FalconMetricBuilder,
};
pub use metric_type::MetricType;
pub use metrics::FalconMetrics;
pub use value::MetricValue;

pub type Error = std::io::Error;
pub type Result<T> = std::result::Result<T, Error>;
