use crate::metric_data::{
    CounterValue, HealthStatus, HistogramValue, MeterRates, MeterValue, MetricTags, TimeUnit,
    TimerValue, Unit,
};
use crate::record::{FieldValue, Precision, Record};
use chrono::{DateTime, Utc};
use log::trace;
use std::time::Instant;

mod default_converter;

pub use default_converter::DefaultConverter;

pub const GAUGE_VALUE_KEY: &str = "value";
pub const ITEM_TAG_KEY: &str = "item";
pub const HEALTH_CHECKS_NAME: &str = "health_checks";
pub const HEALTH_CHECK_NAME: &str = "health_check";
pub const HEALTH_CHECK_TAG_KEY: &str = "check";

/// Turns one reported metric into the records written for it.
///
/// A call may return any number of records, including none when every field
/// was rejected (for example a NaN gauge).
pub trait RecordConverter: Send + Sync {
    /// Sets the timestamp stamped on every record produced until the next call.
    fn set_timestamp(&mut self, timestamp: Option<DateTime<Utc>>);

    fn precision(&self) -> Precision;

    fn gauge_records(&self, name: &str, tags: &MetricTags, unit: &Unit, value: f64) -> Vec<Record>;

    fn counter_records(
        &self,
        name: &str,
        tags: &MetricTags,
        unit: &Unit,
        value: &CounterValue,
    ) -> Vec<Record>;

    fn meter_records(
        &self,
        name: &str,
        tags: &MetricTags,
        unit: &Unit,
        value: &MeterValue,
        rate_unit: TimeUnit,
    ) -> Vec<Record>;

    fn histogram_records(
        &self,
        name: &str,
        tags: &MetricTags,
        unit: &Unit,
        value: &HistogramValue,
    ) -> Vec<Record>;

    fn timer_records(
        &self,
        name: &str,
        tags: &MetricTags,
        unit: &Unit,
        value: &TimerValue,
        rate_unit: TimeUnit,
        duration_unit: TimeUnit,
    ) -> Vec<Record>;

    fn health_records(&self, status: &HealthStatus) -> Vec<Record>;
}

pub fn get_converter(global_tags: MetricTags, precision: Precision) -> impl RecordConverter {
    let function_start = Instant::now();
    let converter = DefaultConverter::new(global_tags, precision);
    trace!("get_converter duration: {:?}", function_start.elapsed());
    converter
}

pub fn meter_fields(rates: &MeterRates, rate_unit: TimeUnit) -> Vec<(&'static str, FieldValue)> {
    vec![
        ("count", FieldValue::Integer(rates.count)),
        ("mean_rate", FieldValue::Float(rate_unit.scale_rate(rates.mean_rate))),
        ("1_min_rate", FieldValue::Float(rate_unit.scale_rate(rates.one_minute_rate))),
        ("5_min_rate", FieldValue::Float(rate_unit.scale_rate(rates.five_minute_rate))),
        (
            "15_min_rate",
            FieldValue::Float(rate_unit.scale_rate(rates.fifteen_minute_rate)),
        ),
    ]
}

pub fn histogram_fields(
    value: &HistogramValue,
    scale: impl Fn(f64) -> f64,
    include_count: bool,
) -> Vec<(&'static str, FieldValue)> {
    let mut fields = Vec::with_capacity(16);
    if include_count {
        fields.push(("count", FieldValue::Integer(value.count)));
    }
    fields.extend([
        ("last", FieldValue::Float(scale(value.last_value))),
        ("min", FieldValue::Float(scale(value.min))),
        ("mean", FieldValue::Float(scale(value.mean))),
        ("max", FieldValue::Float(scale(value.max))),
        ("stddev", FieldValue::Float(scale(value.std_dev))),
        ("median", FieldValue::Float(scale(value.median))),
        ("sample_size", FieldValue::Integer(value.sample_size)),
        ("percentile_75", FieldValue::Float(scale(value.percentile_75))),
        ("percentile_95", FieldValue::Float(scale(value.percentile_95))),
        ("percentile_98", FieldValue::Float(scale(value.percentile_98))),
        ("percentile_99", FieldValue::Float(scale(value.percentile_99))),
        ("percentile_999", FieldValue::Float(scale(value.percentile_999))),
    ]);

    // User values are optional labels for the sample that set last/min/max.
    let user_values = [
        ("last_user_value", &value.last_user_value),
        ("min_user_value", &value.min_user_value),
        ("max_user_value", &value.max_user_value),
    ];
    for (key, user_value) in user_values {
        if let Some(user_value) = user_value.as_ref().filter(|v| !v.trim().is_empty()) {
            fields.push((key, FieldValue::String(user_value.clone())));
        }
    }
    fields
}
