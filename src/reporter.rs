use crate::{
    endpoint_of,
    AllMetrics,
    FalconSender,
    HttpPushTransport,
    MeterRates,
    MetricFilter,
    MetricSource,
    Naming,
    Readings,
    Snapshot,
    TimeUnit,
    Transport,
};
use chrono::{
    DateTime,
    Utc,
};
use metrics_exporter_falcon_core::{
    util_time,
    CounterType,
    FalconMetric,
    FalconMetrics,
    MetricValue,
};
use std::sync::Arc;

/// Source of the timestamp shared by all records of one report.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        util_time::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

/// How registry contents are turned into records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Prepended to every metric name.
    pub prefix: Option<String>,
    /// Removed from registry names before the prefix is added.
    pub prefix_to_remove: Option<String>,
    /// Meter and timer rates are reported as events per this unit.
    pub rate_unit: TimeUnit,
    /// Timer durations are reported in this unit.
    pub duration_unit: TimeUnit,
    /// Comma separated `key=value` pairs attached to every record.
    pub tags: String,
    /// Reporting interval in seconds, sent along with every record.
    pub step: u32,
    /// Counter type of the records reported for counters. Raw counts are
    /// sent either way.
    pub counter_type: CounterType,
    /// Advisory batch size handed to the sender.
    pub batch_size: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig {
            prefix: None,
            prefix_to_remove: None,
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Seconds,
            tags: String::new(),
            step: 0,
            counter_type: CounterType::Gauge,
            batch_size: crate::DEFAULT_BATCH_SIZE_LIMIT,
        }
    }
}

/// Reads a metric source and pushes its contents to Open-Falcon.
///
/// Every report produces:
///
/// - counters: `<name>.count`
/// - gauges: `<name>.value`, unless the value is an empty list
/// - meters: `<name>.{count,mean_rate,m1,m5,m15}`
/// - histograms: `<name>.{count,max,min,mean,stddev,median,p75,p95,p98,p99,p999}`
/// - timers: the meter and histogram names, with durations converted
///
/// The endpoint of each record is the first path segment of its reported
/// name.
pub struct FalconReporter<T = HttpPushTransport> {
    source: Arc<dyn MetricSource>,
    sender: FalconSender<T>,
    config: ReporterConfig,
    naming: Naming,
    filter: Box<dyn MetricFilter>,
    clock: Box<dyn Clock>,
}

impl<T: Transport> FalconReporter<T> {
    pub fn new(source: Arc<dyn MetricSource>, sender: FalconSender<T>, config: ReporterConfig) -> Self {
        sender.set_batch_size_limit(config.batch_size);
        FalconReporter {
            source,
            sender,
            naming: Naming::new(config.prefix.clone(), config.prefix_to_remove.clone()),
            config,
            filter: Box::new(AllMetrics),
            clock: Box::new(SystemClock),
        }
    }

    /// Only report metrics accepted by `filter`.
    pub fn filter(mut self, filter: impl MetricFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Take timestamps from `clock`.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn sender(&self) -> &FalconSender<T> {
        &self.sender
    }

    /// Read the source and send everything in one request.
    pub fn report(&self) {
        let readings = self.source.readings(self.filter.as_ref());
        self.report_readings(&readings);
    }

    /// Send `readings` in one request.
    pub fn report_readings(&self, readings: &Readings) {
        let timestamp = util_time::unix_seconds(&self.clock.now());
        let metrics = self.collect(readings, timestamp);
        trace!(n = metrics.len(), %timestamp, "reporting metrics");
        self.sender.send(&metrics);
    }

    /// Map `readings` to records stamped with `timestamp`.
    pub fn collect(&self, readings: &Readings, timestamp: i64) -> FalconMetrics {
        let mut metrics = FalconMetrics::new();

        for (name, value) in &readings.gauges {
            if value.is_empty_list() {
                continue;
            }
            metrics.insert(self.build_gauge(name, value.clone(), timestamp));
        }

        for (name, count) in &readings.counters {
            metrics.insert(self.build_counter(name, *count, timestamp));
        }

        for (name, snapshot) in &readings.histograms {
            self.collector(name, timestamp, &mut metrics)
                .add("count", snapshot.count)
                .add_snapshot(snapshot);
        }

        for (name, rates) in &readings.meters {
            self.collector(name, timestamp, &mut metrics)
                .add_rates(&self.convert_rates(rates));
        }

        for (name, timer) in &readings.timers {
            let duration_unit = self.config.duration_unit;
            let snapshot = timer.snapshot.map(|nanos| duration_unit.convert_duration(nanos));
            self.collector(name, timestamp, &mut metrics)
                .add_rates(&self.convert_rates(&timer.rates))
                .add_snapshot(&snapshot);
        }

        metrics
    }

    /// Close the sender. Reports after this are dropped.
    pub fn stop(&self) {
        debug!("stopping open-falcon reporter");
        self.sender.close();
    }

    fn convert_rates(&self, rates: &MeterRates) -> MeterRates {
        let unit = self.config.rate_unit;
        MeterRates {
            count: rates.count,
            mean_rate: unit.convert_rate(rates.mean_rate),
            m1_rate: unit.convert_rate(rates.m1_rate),
            m5_rate: unit.convert_rate(rates.m5_rate),
            m15_rate: unit.convert_rate(rates.m15_rate),
        }
    }

    fn build_counter(&self, name: &str, count: u64, timestamp: i64) -> FalconMetric {
        FalconMetric::named(self.naming.prefix(&[name, "count"]))
            .endpoint(endpoint_of(&self.naming.prefix(&[name, "value"])))
            .timestamp(timestamp)
            .value(count)
            .counter_type(self.config.counter_type)
            .step(self.config.step)
            .tags(self.config.tags.as_str())
            .build()
    }

    fn build_gauge(&self, name: &str, value: MetricValue, timestamp: i64) -> FalconMetric {
        let metric = self.naming.prefix(&[name, "value"]);
        FalconMetric::named(metric.as_str())
            .endpoint(endpoint_of(&metric))
            .value(value)
            .timestamp(timestamp)
            .counter_type(CounterType::Gauge)
            .step(self.config.step)
            .tags(self.config.tags.as_str())
            .build()
    }

    fn collector<'a>(&'a self, name: &str, timestamp: i64, metrics: &'a mut FalconMetrics) -> Collector<'a> {
        Collector {
            prefix: self.naming.prefix(&[name]),
            endpoint: endpoint_of(&self.naming.prefix(&[name, "value"])).to_owned(),
            timestamp,
            step: self.config.step,
            metrics,
        }
    }
}

impl<T> std::fmt::Debug for FalconReporter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FalconReporter").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Adds the sub-metrics of one registry entry, `<prefix>.<sub>`. Sub-metrics
/// carry no tags.
struct Collector<'a> {
    prefix: String,
    endpoint: String,
    timestamp: i64,
    step: u32,
    metrics: &'a mut FalconMetrics,
}

impl Collector<'_> {
    fn add(&mut self, name: &str, value: impl Into<MetricValue>) -> &mut Self {
        self.metrics.insert(
            FalconMetric::named(crate::join_name([self.prefix.as_str(), name]))
                .endpoint(self.endpoint.as_str())
                .timestamp(self.timestamp)
                .value(value)
                .step(self.step)
                .build(),
        );
        self
    }

    fn add_rates(&mut self, rates: &MeterRates) -> &mut Self {
        self.add("count", rates.count)
            .add("mean_rate", rates.mean_rate)
            .add("m1", rates.m1_rate)
            .add("m5", rates.m5_rate)
            .add("m15", rates.m15_rate)
    }

    fn add_snapshot(&mut self, snapshot: &Snapshot) -> &mut Self {
        self.add("max", snapshot.max)
            .add("min", snapshot.min)
            .add("mean", snapshot.mean)
            .add("stddev", snapshot.stddev)
            .add("median", snapshot.median)
            .add("p75", snapshot.p75)
            .add("p95", snapshot.p95)
            .add("p98", snapshot.p98)
            .add("p99", snapshot.p99)
            .add("p999", snapshot.p999)
    }
}
