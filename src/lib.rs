/*!

# metrics-exporter-falcon

Periodically reports in-process metrics to an [Open-Falcon](https://book.open-falcon.org/) agent.

A [`Registry`] holds counters, gauges, histograms, meters and timers. It can also be installed as a
[metrics](https://github.com/metrics-rs/metrics) [Recorder](https://docs.rs/metrics/latest/metrics/trait.Recorder.html)
so that the `metrics` macros write into it. On every tick a [`FalconReporter`] reads the registry, turns every entry
into one or more data points and pushes all of them as a JSON array with a single `PATCH <base_url>/v1/push` request.

Delivery is fire-and-forget: failures are logged and the data of that tick is lost. Nothing is retried.

Example:

```rust,no_run
use metrics_exporter_falcon::{FalconReporter, FalconSender, Registry, ReporterConfig, SenderConfig};
use std::{sync::Arc, time::Duration};

# #[tokio::main(flavor = "current_thread")]
# async fn main() -> std::io::Result<()> {
let registry = Arc::new(Registry::new());
registry.recorder().install().expect("failed to install recorder");

let sender = FalconSender::new(SenderConfig::new("http://127.0.0.1:1988"))?;
let config = ReporterConfig {
    prefix: Some("my-service".to_string()),
    tags: "idc=lg".to_string(),
    step: 30,
    ..Default::default()
};

// Report every 30 seconds until the guard is dropped.
let _guard = FalconReporter::new(registry.clone(), sender, config).start(Duration::from_secs(30))?;

metrics::counter!("requests").increment(1);
registry.timer("db.query").time(|| {
    // ...
});
# Ok(())
# }
```

*/

mod histogram;
mod http_transport;
mod meter;
mod naming;
mod recorder;
mod registry;
mod reporter;
mod scheduler;
mod sender;
mod timer;
mod units;

#[cfg(target_pointer_width = "32")]
pub(crate) use portable_atomic::AtomicU64;
#[cfg(not(target_pointer_width = "32"))]
pub(crate) use std::sync::atomic::AtomicU64;

pub use histogram::{
    Histogram,
    Snapshot,
    DEFAULT_WINDOW,
};
pub use http_transport::{
    HttpPushTransport,
    SenderConfig,
    Transport,
    CONN_TIMEOUT_DEFAULT,
    DEFAULT_BATCH_SIZE_LIMIT,
    READ_TIMEOUT_DEFAULT,
};
pub use meter::{
    Meter,
    MeterRates,
};
pub use metrics_exporter_falcon_core::{
    util_time,
    CounterType,
    Error,
    FalconMetric,
    FalconMetricBuilder,
    FalconMetrics,
    MetricType,
    MetricValue,
    Result,
};
pub use naming::{
    endpoint_of,
    join_name,
    Naming,
};
pub use recorder::FalconRecorder;
pub use registry::{
    AllMetrics,
    Counter,
    Gauge,
    MetricFilter,
    MetricSource,
    Readings,
    Registry,
    TimerReading,
};
pub use reporter::{
    Clock,
    FalconReporter,
    ReporterConfig,
    SystemClock,
};
pub use scheduler::{
    ScheduledReporter,
    Tick,
    DEFAULT_PERIOD,
};
pub use sender::FalconSender;
pub use timer::{
    Timer,
    TimerContext,
};
pub use units::TimeUnit;

#[macro_use]
extern crate tracing;

#[macro_use]
extern crate scopeguard;
