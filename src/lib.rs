use anyhow::{Error, Result};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use std::time::Instant;

pub mod config;
pub mod converter;
pub mod error;
pub mod error_handler;
pub mod formatter;
pub mod line_protocol;
pub mod metric_data;
pub mod record;
pub mod transport;
pub mod writer;

pub use config::ConnectionConfig;
pub use converter::{DefaultConverter, RecordConverter};
pub use error::{ConfigError, RecordError};
pub use error_handler::ErrorHandler;
pub use formatter::Formatter;
pub use metric_data::{
    CounterValue, HealthCheckResult, HealthStatus, HistogramValue, MeterRates, MeterValue,
    MetricTags, TimeUnit, TimerValue, Unit,
};
pub use record::{Batch, Field, FieldValue, Precision, Record, Tag};
pub use transport::{CaptureTransport, Transport};
pub use writer::BatchWriter;

/// One reporting pass: metrics go through the converter, then the formatter,
/// then into the writer. Failures along the way are handed to the error
/// handler and never returned to the caller.
pub struct InfluxdbReport {
    converter: Box<dyn RecordConverter>,
    formatter: Formatter,
    writer: BatchWriter,
    error_handler: ErrorHandler,
    context_stack: Vec<String>,
}

pub struct InfluxdbReportBuilder {
    config: ConnectionConfig,
    converter: Option<Box<dyn RecordConverter>>,
    formatter: Option<Formatter>,
    writer: Option<BatchWriter>,
    error_handler: Option<ErrorHandler>,
}

impl InfluxdbReportBuilder {
    pub fn converter(mut self, converter: impl RecordConverter + 'static) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    pub fn formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Replaces the writer built from the config. The given writer keeps its
    /// own error handler for failed flushes.
    pub fn writer(mut self, writer: BatchWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn error_handler(mut self, error_handler: ErrorHandler) -> Self {
        self.error_handler = Some(error_handler);
        self
    }

    pub fn build(self) -> Result<InfluxdbReport, Error> {
        // Fills every part not given explicitly from the config.

        let function_start = Instant::now();
        let error_handler = self.error_handler.unwrap_or_default();
        let converter: Box<dyn RecordConverter> = match self.converter {
            Some(converter) => converter,
            None => Box::new(converter::get_converter(
                self.config.global_tags.clone(),
                self.config.precision,
            )),
        };

        // The server reads timestamps in the unit named by the write URL, so
        // that unit follows the converter.
        let mut config = self.config;
        if converter.precision() != config.precision {
            debug!(
                "Using converter precision {} instead of configured precision {}",
                converter.precision(),
                config.precision
            );
            config.precision = converter.precision();
        }
        let writer = match self.writer {
            Some(writer) => writer,
            None => BatchWriter::new(
                Transport::from_config(&config)?,
                config.batch_size,
                error_handler.clone(),
            )?,
        };

        let report = InfluxdbReport {
            converter,
            formatter: self.formatter.unwrap_or_default(),
            writer,
            error_handler,
            context_stack: Vec::new(),
        };
        trace!("InfluxdbReportBuilder::build duration: {:?}", function_start.elapsed());
        Ok(report)
    }
}

impl InfluxdbReport {
    pub fn builder(config: ConnectionConfig) -> InfluxdbReportBuilder {
        InfluxdbReportBuilder {
            config,
            converter: None,
            formatter: None,
            writer: None,
            error_handler: None,
        }
    }

    pub fn writer(&self) -> &BatchWriter {
        &self.writer
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Begins a pass; every record until the next call carries `timestamp`.
    pub fn start_report(&mut self, timestamp: DateTime<Utc>) {
        self.context_stack.clear();
        self.converter.set_timestamp(Some(timestamp));
    }

    /// Nests a named context under the current one. Metric names reported
    /// inside it are built from the whole stack.
    pub fn start_context(&mut self, name: &str, timestamp: DateTime<Utc>) {
        self.context_stack.push(name.to_string());
        self.converter.set_timestamp(Some(timestamp));
    }

    pub fn end_context(&mut self) {
        self.context_stack.pop();
    }

    pub async fn report_gauge(&self, name: &str, tags: &MetricTags, unit: &Unit, value: f64) {
        let name = self.metric_name(name, unit, tags);
        let records = self.converter.gauge_records(&name, tags, unit, value);
        self.write_records(records).await;
    }

    pub async fn report_counter(&self, name: &str, tags: &MetricTags, unit: &Unit, value: &CounterValue) {
        let name = self.metric_name(name, unit, tags);
        let records = self.converter.counter_records(&name, tags, unit, value);
        self.write_records(records).await;
    }

    pub async fn report_meter(
        &self,
        name: &str,
        tags: &MetricTags,
        unit: &Unit,
        value: &MeterValue,
        rate_unit: TimeUnit,
    ) {
        let name = self.metric_name(name, unit, tags);
        let records = self.converter.meter_records(&name, tags, unit, value, rate_unit);
        self.write_records(records).await;
    }

    pub async fn report_histogram(&self, name: &str, tags: &MetricTags, unit: &Unit, value: &HistogramValue) {
        let name = self.metric_name(name, unit, tags);
        let records = self.converter.histogram_records(&name, tags, unit, value);
        self.write_records(records).await;
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn report_timer(
        &self,
        name: &str,
        tags: &MetricTags,
        unit: &Unit,
        value: &TimerValue,
        rate_unit: TimeUnit,
        duration_unit: TimeUnit,
    ) {
        let name = self.metric_name(name, unit, tags);
        let records = self
            .converter
            .timer_records(&name, tags, unit, value, rate_unit, duration_unit);
        self.write_records(records).await;
    }

    pub async fn report_health(&self, status: &HealthStatus) {
        let records = self.converter.health_records(status);
        self.write_records(records).await;
    }

    /// Flushes whatever the pass left buffered.
    pub async fn end_report(&mut self) {
        self.writer.flush().await;
        self.context_stack.clear();
    }

    fn metric_name(&self, name: &str, unit: &Unit, tags: &MetricTags) -> String {
        let context = match self.context_stack.split_last() {
            Some((current, parents)) => self.formatter.format_context_name(parents, current),
            None => String::new(),
        };
        self.formatter.format_metric_name(&context, name, unit, tags)
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    async fn write_records(&self, records: Vec<Record>) {
        let function_start = Instant::now();
        let mut formatted: Vec<Record> = Vec::with_capacity(records.len());
        for record in records {
            let name = record.name.clone();
            match self.formatter.format_record(record) {
                Ok(record) => formatted.push(record),
                Err(error) => self
                    .error_handler
                    .handle(&Error::from(error), &format!("Skipping record {}", name)),
            }
        }
        self.writer.write(formatted).await;
        trace!("write_records duration: {:?}", function_start.elapsed());
    }
}
