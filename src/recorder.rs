use crate::{
    Counter,
    Gauge,
    Histogram,
    Registry,
};
use metrics::{
    CounterFn,
    GaugeFn,
    HistogramFn,
    Key,
    KeyName,
    Metadata,
    Recorder,
    SetRecorderError,
    SharedString,
    Unit,
};
use std::sync::Arc;

/// A [`metrics`] recorder that stores everything in a [`Registry`].
///
/// Counters, gauges and histograms recorded through the `metrics` macros end
/// up in the registry and are exported with its other instruments. Labels are
/// appended to the metric name as additional path segments, in order:
/// `counter!("requests", "method" => "get")` is stored as `requests.get`.
#[derive(Debug, Clone)]
pub struct FalconRecorder {
    registry: Arc<Registry>,
}

impl FalconRecorder {
    pub fn new(registry: Arc<Registry>) -> Self {
        FalconRecorder { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Install this recorder as the global recorder.
    pub fn install(self) -> Result<(), SetRecorderError<Self>> {
        metrics::set_global_recorder(self)
    }
}

impl Registry {
    /// A [`metrics`] recorder writing into this registry.
    pub fn recorder(self: &Arc<Self>) -> FalconRecorder {
        FalconRecorder::new(self.clone())
    }
}

fn registry_name(key: &Key) -> String {
    let mut name = key.name().to_owned();
    for label in key.labels() {
        name.push('.');
        name.push_str(label.value());
    }
    name
}

impl Recorder for FalconRecorder {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        trace!(?key, ?unit, ?description, "describing counter");
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        trace!(?key, ?unit, ?description, "describing gauge");
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        trace!(?key, ?unit, ?description, "describing histogram");
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> metrics::Counter {
        metrics::Counter::from_arc(Arc::new(CounterHandle(self.registry.counter(&registry_name(key)))))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> metrics::Gauge {
        metrics::Gauge::from_arc(Arc::new(GaugeHandle(self.registry.gauge(&registry_name(key)))))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> metrics::Histogram {
        metrics::Histogram::from_arc(Arc::new(HistogramHandle(
            self.registry.histogram(&registry_name(key)),
        )))
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

struct CounterHandle(Arc<Counter>);

impl CounterFn for CounterHandle {
    fn increment(&self, value: u64) {
        Counter::increment(&self.0, value)
    }

    fn absolute(&self, value: u64) {
        Counter::absolute(&self.0, value)
    }
}

struct GaugeHandle(Arc<Gauge>);

impl GaugeFn for GaugeHandle {
    fn increment(&self, value: f64) {
        Gauge::increment(&self.0, value)
    }

    fn decrement(&self, value: f64) {
        Gauge::decrement(&self.0, value)
    }

    fn set(&self, value: f64) {
        Gauge::set(&self.0, value)
    }
}

struct HistogramHandle(Arc<Histogram>);

impl HistogramFn for HistogramHandle {
    // hdr histograms hold non-negative integers
    fn record(&self, value: f64) {
        if value.is_nan() {
            return;
        }
        Histogram::update(&self.0, value.max(0.0).round() as u64)
    }
}
