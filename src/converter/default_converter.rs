use super::{
    histogram_fields, meter_fields, RecordConverter, GAUGE_VALUE_KEY, HEALTH_CHECKS_NAME,
    HEALTH_CHECK_NAME, HEALTH_CHECK_TAG_KEY, ITEM_TAG_KEY,
};
use crate::metric_data::{
    CounterValue, HealthStatus, HistogramValue, MeterValue, MetricTags, TimeUnit, TimerValue,
    Unit,
};
use crate::record::{Field, FieldValue, Precision, Record, Tag};
use chrono::{DateTime, Utc};
use log::{debug, warn};

pub struct DefaultConverter {
    pub global_tags: MetricTags,
    pub precision: Precision,
    timestamp: Option<DateTime<Utc>>,
}

impl DefaultConverter {
    pub fn new(global_tags: MetricTags, precision: Precision) -> Self {
        DefaultConverter {
            global_tags,
            precision,
            timestamp: None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn build_record(
        &self,
        name: &str,
        tags: &MetricTags,
        extra_tag: Option<(&str, &str)>,
        fields: Vec<(&str, FieldValue)>,
    ) -> Option<Record> {
        // Metric tags first, then the item/check tag, then global tags whose
        // key is not already present.

        let mut record_tags: Vec<Tag> = Vec::with_capacity(tags.len() + self.global_tags.len() + 1);
        let candidates = tags
            .iter()
            .chain(extra_tag)
            .chain(self.global_tags.iter());
        for (key, value) in candidates {
            if record_tags.iter().any(|t| t.key() == key) {
                continue;
            }
            match Tag::new(key, value) {
                Ok(tag) => record_tags.push(tag),
                Err(error) => warn!("Skipping tag on {}: {}", name, error),
            }
        }

        let mut record_fields: Vec<Field> = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            match Field::new(key, value) {
                Ok(field) => record_fields.push(field),
                Err(error) => debug!("Dropping field on {}: {}", name, error),
            }
        }

        if record_fields.is_empty() {
            debug!("Dropping record {} with no valid fields", name);
            return None;
        }

        Some(Record::new(
            name,
            record_tags,
            record_fields,
            self.timestamp,
            self.precision,
        ))
    }

    fn meter_item_records(
        &self,
        name: &str,
        tags: &MetricTags,
        value: &MeterValue,
        rate_unit: TimeUnit,
    ) -> Vec<Record> {
        value
            .items
            .iter()
            .filter_map(|item| {
                let mut fields = meter_fields(&item.value, rate_unit);
                fields.insert(1, ("percent", FieldValue::Float(item.percent)));
                self.build_record(name, tags, Some((ITEM_TAG_KEY, item.item.as_str())), fields)
            })
            .collect()
    }
}

impl Default for DefaultConverter {
    fn default() -> Self {
        DefaultConverter::new(MetricTags::new(), Precision::default())
    }
}

impl RecordConverter for DefaultConverter {
    fn set_timestamp(&mut self, timestamp: Option<DateTime<Utc>>) {
        self.timestamp = timestamp;
    }

    fn precision(&self) -> Precision {
        self.precision
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    fn gauge_records(&self, name: &str, tags: &MetricTags, _unit: &Unit, value: f64) -> Vec<Record> {
        self.build_record(name, tags, None, vec![(GAUGE_VALUE_KEY, FieldValue::Float(value))])
            .into_iter()
            .collect()
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    fn counter_records(
        &self,
        name: &str,
        tags: &MetricTags,
        _unit: &Unit,
        value: &CounterValue,
    ) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .build_record(name, tags, None, vec![("count", FieldValue::Integer(value.count))])
            .into_iter()
            .collect();

        for item in value.items.iter() {
            let fields = vec![
                ("count", FieldValue::Integer(item.count)),
                ("percent", FieldValue::Float(item.percent)),
            ];
            records.extend(self.build_record(name, tags, Some((ITEM_TAG_KEY, item.item.as_str())), fields));
        }
        records
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    fn meter_records(
        &self,
        name: &str,
        tags: &MetricTags,
        _unit: &Unit,
        value: &MeterValue,
        rate_unit: TimeUnit,
    ) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .build_record(name, tags, None, meter_fields(&value.rates, rate_unit))
            .into_iter()
            .collect();
        records.extend(self.meter_item_records(name, tags, value, rate_unit));
        records
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    fn histogram_records(
        &self,
        name: &str,
        tags: &MetricTags,
        _unit: &Unit,
        value: &HistogramValue,
    ) -> Vec<Record> {
        self.build_record(name, tags, None, histogram_fields(value, |v| v, true))
            .into_iter()
            .collect()
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    fn timer_records(
        &self,
        name: &str,
        tags: &MetricTags,
        _unit: &Unit,
        value: &TimerValue,
        rate_unit: TimeUnit,
        duration_unit: TimeUnit,
    ) -> Vec<Record> {
        let mut fields = vec![
            ("active_sessions", FieldValue::Integer(value.active_sessions)),
            (
                "total_time",
                FieldValue::Float(duration_unit.scale_duration(value.total_time as f64)),
            ),
        ];
        fields.extend(meter_fields(&value.rate.rates, rate_unit));
        fields.extend(histogram_fields(
            &value.histogram,
            |v| duration_unit.scale_duration(v),
            false,
        ));

        let mut records: Vec<Record> = self.build_record(name, tags, None, fields).into_iter().collect();
        records.extend(self.meter_item_records(name, tags, &value.rate, rate_unit));
        records
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    fn health_records(&self, status: &HealthStatus) -> Vec<Record> {
        let healthy_count = status.results.iter().filter(|r| r.is_healthy).count() as i64;
        let unhealthy_count = status.results.len() as i64 - healthy_count;

        let mut records: Vec<Record> = self
            .build_record(
                HEALTH_CHECKS_NAME,
                &MetricTags::new(),
                None,
                vec![
                    ("healthy", FieldValue::Boolean(status.is_healthy())),
                    ("healthy_count", FieldValue::Integer(healthy_count)),
                    ("unhealthy_count", FieldValue::Integer(unhealthy_count)),
                ],
            )
            .into_iter()
            .collect();

        for result in status.results.iter() {
            let mut fields = vec![("healthy", FieldValue::Boolean(result.is_healthy))];
            if !result.message.trim().is_empty() {
                fields.push(("message", FieldValue::String(result.message.clone())));
            }
            let check_tags: MetricTags = std::iter::once((HEALTH_CHECK_TAG_KEY, result.name.as_str()))
                .chain(result.tags.iter())
                .collect();
            records.extend(self.build_record(HEALTH_CHECK_NAME, &check_tags, None, fields));
        }
        records
    }
}
