use crate::{
    Error,
    FalconMetric,
    Result,
};
use std::collections::HashSet;

/// The records sent in one push request.
///
/// Keeps insertion order and drops records that are equal to one already
/// contained, so that repeated data points are only sent once.
#[derive(Debug, Clone, Default)]
pub struct FalconMetrics {
    metrics: Vec<FalconMetric>,
    seen: HashSet<FalconMetric>,
}

impl FalconMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Returns `false` if an equal record was already present.
    pub fn insert(&mut self, metric: FalconMetric) -> bool {
        if self.seen.contains(&metric) {
            return false;
        }
        self.seen.insert(metric.clone());
        self.metrics.push(metric);
        true
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FalconMetric> {
        self.metrics.iter()
    }

    /// Serialize the records as the JSON array the push API expects.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.metrics).map_err(|e| Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Parse a push request body.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let metrics: Vec<FalconMetric> =
            serde_json::from_slice(data).map_err(|e| Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(metrics.into_iter().collect())
    }
}

impl PartialEq for FalconMetrics {
    fn eq(&self, other: &Self) -> bool {
        self.metrics == other.metrics
    }
}

impl Eq for FalconMetrics {}

impl Extend<FalconMetric> for FalconMetrics {
    fn extend<I: IntoIterator<Item = FalconMetric>>(&mut self, iter: I) {
        for metric in iter {
            self.insert(metric);
        }
    }
}

impl FromIterator<FalconMetric> for FalconMetrics {
    fn from_iter<I: IntoIterator<Item = FalconMetric>>(iter: I) -> Self {
        let mut metrics = FalconMetrics::new();
        metrics.extend(iter);
        metrics
    }
}

impl From<Vec<FalconMetric>> for FalconMetrics {
    fn from(value: Vec<FalconMetric>) -> Self {
        value.into_iter().collect()
    }
}

impl From<FalconMetrics> for Vec<FalconMetric> {
    fn from(value: FalconMetrics) -> Self {
        value.metrics
    }
}

impl IntoIterator for FalconMetrics {
    type Item = FalconMetric;
    type IntoIter = std::vec::IntoIter<FalconMetric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.into_iter()
    }
}

impl<'a> IntoIterator for &'a FalconMetrics {
    type Item = &'a FalconMetric;
    type IntoIter = std::slice::Iter<'a, FalconMetric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CounterType;

    fn metric(name: &str, value: u64) -> FalconMetric {
        FalconMetric::named(name)
            .endpoint("app")
            .timestamp(1_700_000_000)
            .step(60)
            .value(value)
            .build()
    }

    #[test]
    fn array_length_matches_distinct_records() {
        let metrics: FalconMetrics = vec![
            metric("app.a.count", 1),
            metric("app.b.count", 2),
            metric("app.a.count", 1),
            metric("app.a.count", 3),
        ]
        .into();
        assert_eq!(metrics.len(), 3);

        let body = metrics.encode().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 3);
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut metrics = FalconMetrics::new();
        assert!(metrics.insert(metric("b", 1)));
        assert!(metrics.insert(metric("a", 1)));
        assert!(!metrics.insert(metric("b", 1)));
        let names = metrics.iter().map(|m| m.metric()).collect::<Vec<_>>();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn decode_push_body() {
        let body = br#"[
            {"endpoint":"test-endpoint","metric":"test-metric","timestamp":1488800000,"step":60,"value":1,"counterType":"GAUGE","tags":"idc=lg,loc=beijing"},
            {"endpoint":"test-endpoint","metric":"test-metric2","timestamp":1488800000,"step":60,"value":2.5,"counterType":"COUNTER","tags":""}
        ]"#;
        let metrics = FalconMetrics::decode(body).unwrap();
        assert_eq!(metrics.len(), 2);

        let second = metrics.iter().nth(1).unwrap();
        assert_eq!(second.metric(), "test-metric2");
        assert_eq!(second.counter_type(), CounterType::Counter);
        assert_eq!(second.value().as_f64(), Some(2.5));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = FalconMetrics::decode(b"{not json").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
