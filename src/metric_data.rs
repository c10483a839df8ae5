//! Readings handed over by the instrumentation layer once per report.
//!
//! These are plain values: the counters, reservoirs and health checks that
//! produce them live outside this crate.

/// Ordered key/value tags attached to a metric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricTags(Vec<(String, String)>);

impl MetricTags {
    pub fn new() -> Self {
        MetricTags(Vec::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetricTags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        MetricTags(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Free-form unit label, e.g. "bytes" or "requests".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unit(pub String);

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Unit(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Unit {
    fn from(name: &str) -> Self {
        Unit(name.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
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
    fn nanoseconds(&self) -> f64 {
        match self {
            TimeUnit::Nanoseconds => 1.0,
            TimeUnit::Microseconds => 1e3,
            TimeUnit::Milliseconds => 1e6,
            TimeUnit::Seconds => 1e9,
            TimeUnit::Minutes => 60e9,
            TimeUnit::Hours => 3_600e9,
            TimeUnit::Days => 86_400e9,
        }
    }

    /// Converts a per-second rate into a rate per this unit.
    pub fn scale_rate(&self, per_second: f64) -> f64 {
        per_second * self.nanoseconds() / 1e9
    }

    /// Converts a duration in nanoseconds into this unit.
    pub fn scale_duration(&self, nanoseconds: f64) -> f64 {
        nanoseconds / self.nanoseconds()
    }
}

/// One labelled sub-item of a counter or meter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetItem {
    pub item: String,
    pub count: i64,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterValue {
    pub count: i64,
    pub items: Vec<SetItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterItem {
    pub item: String,
    pub percent: f64,
    pub value: MeterRates,
}

/// Rates are per second; the converter scales them to the reported rate unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterRates {
    pub count: i64,
    pub mean_rate: f64,
    pub one_minute_rate: f64,
    pub five_minute_rate: f64,
    pub fifteen_minute_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterValue {
    pub rates: MeterRates,
    pub items: Vec<MeterItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramValue {
    pub count: i64,
    pub last_value: f64,
    pub last_user_value: Option<String>,
    pub min: f64,
    pub min_user_value: Option<String>,
    pub max: f64,
    pub max_user_value: Option<String>,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
    pub percentile_98: f64,
    pub percentile_99: f64,
    pub percentile_999: f64,
    pub sample_size: i64,
}

/// Histogram statistics and `total_time` are in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerValue {
    pub rate: MeterValue,
    pub histogram: HistogramValue,
    pub active_sessions: i64,
    pub total_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthCheckResult {
    pub name: String,
    pub is_healthy: bool,
    pub message: String,
    pub tags: MetricTags,
}

impl HealthCheckResult {
    pub fn healthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        HealthCheckResult {
            name: name.into(),
            is_healthy: true,
            message: message.into(),
            tags: MetricTags::new(),
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        HealthCheckResult {
            name: name.into(),
            is_healthy: false,
            message: message.into(),
            tags: MetricTags::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthStatus {
    pub results: Vec<HealthCheckResult>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.results.iter().all(|r| r.is_healthy)
    }
}
