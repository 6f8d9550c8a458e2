use crate::{
    AtomicU64,
    Histogram,
    Meter,
    MeterRates,
    Snapshot,
    Timer,
};
use metrics_exporter_falcon_core::{
    MetricType,
    MetricValue,
};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::Ordering,
        Arc,
        PoisonError,
        RwLock,
    },
};

/// Selects which metrics are reported.
pub trait MetricFilter: Send + Sync {
    fn matches(&self, name: &str, metric_type: MetricType) -> bool;
}

impl<F> MetricFilter for F
where
    F: Fn(&str, MetricType) -> bool + Send + Sync,
{
    fn matches(&self, name: &str, metric_type: MetricType) -> bool {
        self(name, metric_type)
    }
}

/// A filter that accepts every metric.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllMetrics;

impl MetricFilter for AllMetrics {
    fn matches(&self, _name: &str, _metric_type: MetricType) -> bool {
        true
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// A monotonically increasing count.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn increment(&self, n: u64) {
        self.value.fetch_add(n, Ordering::AcqRel);
    }

    /// Decrease the count, stopping at zero.
    pub fn decrement(&self, n: u64) {
        let _ = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| Some(v.saturating_sub(n)));
    }

    pub fn absolute(&self, value: u64) {
        self.value.fetch_max(value, Ordering::AcqRel);
    }

    pub fn count(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}

/// A settable floating point value.
#[derive(Debug)]
pub struct Gauge {
    bits: AtomicU64,
}

impl Default for Gauge {
    fn default() -> Self {
        Gauge {
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }
}

impl Gauge {
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    pub fn increment(&self, delta: f64) {
        self.update(|v| v + delta);
    }

    pub fn decrement(&self, delta: f64) {
        self.update(|v| v - delta);
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn update(&self, f: impl Fn(f64) -> f64) {
        let _ = self.bits.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            Some(f(f64::from_bits(bits)).to_bits())
        });
    }
}

type GaugeFn = dyn Fn() -> MetricValue + Send + Sync;

#[derive(Clone)]
enum GaugeEntry {
    Value(Arc<Gauge>),
    Callback(Arc<GaugeFn>),
}

impl GaugeEntry {
    fn read(&self) -> MetricValue {
        match self {
            GaugeEntry::Value(gauge) => MetricValue::Float(gauge.value()),
            GaugeEntry::Callback(f) => f(),
        }
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// The values of a timer at one instant. The snapshot is in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerReading {
    pub rates: MeterRates,
    pub snapshot: Snapshot,
}

/// Everything a registry holds, read at one instant and sorted by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    pub gauges: BTreeMap<String, MetricValue>,
    pub counters: BTreeMap<String, u64>,
    pub histograms: BTreeMap<String, Snapshot>,
    pub meters: BTreeMap<String, MeterRates>,
    pub timers: BTreeMap<String, TimerReading>,
}

impl Readings {
    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
            && self.counters.is_empty()
            && self.histograms.is_empty()
            && self.meters.is_empty()
            && self.timers.is_empty()
    }
}

/// Something the reporter can read metrics from.
pub trait MetricSource: Send + Sync {
    fn readings(&self, filter: &dyn MetricFilter) -> Readings;
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Named counters, gauges, histograms, meters and timers.
///
/// Instruments are created on first access and shared afterwards. Names are
/// unique per instrument type.
#[derive(Default)]
pub struct Registry {
    counters: RwLock<BTreeMap<String, Arc<Counter>>>,
    gauges: RwLock<BTreeMap<String, GaugeEntry>>,
    histograms: RwLock<BTreeMap<String, Arc<Histogram>>>,
    meters: RwLock<BTreeMap<String, Arc<Meter>>>,
    timers: RwLock<BTreeMap<String, Arc<Timer>>>,
}

fn get_or_insert<T: Default>(map: &RwLock<BTreeMap<String, Arc<T>>>, name: &str) -> Arc<T> {
    if let Some(metric) = map.read().unwrap_or_else(PoisonError::into_inner).get(name) {
        return metric.clone();
    }
    map.write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(name.to_owned())
        .or_default()
        .clone()
}

fn read_all<T, R>(
    map: &RwLock<BTreeMap<String, T>>,
    metric_type: MetricType,
    filter: &dyn MetricFilter,
    read: impl Fn(&T) -> R,
) -> BTreeMap<String, R> {
    map.read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .filter(|(name, _)| filter.matches(name, metric_type))
        .map(|(name, metric)| (name.clone(), read(metric)))
        .collect()
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> Arc<Counter> {
        get_or_insert(&self.counters, name)
    }

    /// A settable gauge. If a callback gauge is registered under the same
    /// name it is replaced.
    pub fn gauge(&self, name: &str) -> Arc<Gauge> {
        if let Some(GaugeEntry::Value(gauge)) = self.gauges.read().unwrap_or_else(PoisonError::into_inner).get(name) {
            return gauge.clone();
        }
        let mut gauges = self.gauges.write().unwrap_or_else(PoisonError::into_inner);
        match gauges.get(name) {
            Some(GaugeEntry::Value(gauge)) => gauge.clone(),
            _ => {
                let gauge = Arc::new(Gauge::default());
                gauges.insert(name.to_owned(), GaugeEntry::Value(gauge.clone()));
                gauge
            }
        }
    }

    /// A gauge whose value is computed by `f` whenever the registry is read.
    pub fn register_gauge_fn<F>(&self, name: &str, f: F)
    where
        F: Fn() -> MetricValue + Send + Sync + 'static,
    {
        self.gauges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), GaugeEntry::Callback(Arc::new(f)));
    }

    pub fn histogram(&self, name: &str) -> Arc<Histogram> {
        get_or_insert(&self.histograms, name)
    }

    pub fn meter(&self, name: &str) -> Arc<Meter> {
        get_or_insert(&self.meters, name)
    }

    pub fn timer(&self, name: &str) -> Arc<Timer> {
        get_or_insert(&self.timers, name)
    }

    /// Remove every instrument with the given name. Returns whether any was
    /// registered.
    pub fn remove(&self, name: &str) -> bool {
        fn remove_from<T>(map: &RwLock<BTreeMap<String, T>>, name: &str) -> bool {
            map.write().unwrap_or_else(PoisonError::into_inner).remove(name).is_some()
        }
        let counter = remove_from(&self.counters, name);
        let gauge = remove_from(&self.gauges, name);
        let histogram = remove_from(&self.histograms, name);
        let meter = remove_from(&self.meters, name);
        let timer = remove_from(&self.timers, name);
        counter || gauge || histogram || meter || timer
    }
}

impl MetricSource for Registry {
    fn readings(&self, filter: &dyn MetricFilter) -> Readings {
        // callbacks run outside the lock so they may use the registry
        let gauges = read_all(&self.gauges, MetricType::Gauge, filter, GaugeEntry::clone)
            .into_iter()
            .map(|(name, gauge)| (name, gauge.read()))
            .collect();

        Readings {
            gauges,
            counters: read_all(&self.counters, MetricType::Counter, filter, |c| c.count()),
            histograms: read_all(&self.histograms, MetricType::Histogram, filter, |h| h.snapshot()),
            meters: read_all(&self.meters, MetricType::Meter, filter, |m| m.rates()),
            timers: read_all(&self.timers, MetricType::Timer, filter, |t| TimerReading {
                rates: t.rates(),
                snapshot: t.snapshot(),
            }),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn names<T>(map: &RwLock<BTreeMap<String, T>>) -> Vec<String> {
            map.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
        }
        f.debug_struct("Registry")
            .field("counters", &names(&self.counters))
            .field("gauges", &names(&self.gauges))
            .field("histograms", &names(&self.histograms))
            .field("meters", &names(&self.meters))
            .field("timers", &names(&self.timers))
            .finish()
    }
}
