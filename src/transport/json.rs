//! Writes to the `/db/<database>/series` JSON API that InfluxDB dropped in
//! 0.9.1. Only here so old servers keep receiving metrics; new features go
//! to the line protocol transports.

use crate::config::ConnectionConfig;
use crate::record::{FieldValue, Precision, Record};
use anyhow::{anyhow, Error, Result};
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// The old API only understands second, millisecond and microsecond timestamps.
pub fn json_precision(precision: Precision) -> Precision {
    match precision {
        Precision::Nanoseconds | Precision::Microseconds => Precision::Microseconds,
        Precision::Milliseconds => Precision::Milliseconds,
        _ => Precision::Seconds,
    }
}

#[derive(Debug, Serialize)]
struct JsonSeries<'a> {
    name: &'a str,
    columns: Vec<&'a str>,
    points: Vec<Vec<Value>>,
}

fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Boolean(v) => Value::from(*v),
        FieldValue::Integer(v) => Value::from(*v),
        FieldValue::Float(v) => Value::from(*v),
        FieldValue::String(v) => Value::from(v.as_str()),
    }
}

/// Renders records as `[{"name":..,"columns":[..],"points":[[..]]}]`, one
/// series per record, tags first and then fields, preceded by `time` when
/// the record has a timestamp. A timestamp outside the `i64` range of
/// `precision` fails the whole batch.
pub fn encode_series(records: &[Record], precision: Precision) -> Result<Vec<u8>, Error> {
    let series: Vec<JsonSeries> = records
        .iter()
        .map(|record| -> Result<JsonSeries, Error> {
            let mut columns: Vec<&str> = Vec::with_capacity(record.tags.len() + record.fields.len() + 1);
            let mut point: Vec<Value> = Vec::with_capacity(columns.capacity());

            if let Some(timestamp) = record.timestamp.as_ref() {
                let time = i64::try_from(precision.timestamp_value(timestamp)).map_err(|_| {
                    anyhow!(
                        "timestamp {} of {} does not fit the JSON time column at precision {}",
                        timestamp,
                        record.name,
                        precision
                    )
                })?;
                columns.push("time");
                point.push(Value::from(time));
            }
            for tag in record.tags.iter() {
                columns.push(tag.key());
                point.push(Value::from(tag.value()));
            }
            for field in record.fields.iter() {
                columns.push(field.key());
                point.push(field_to_json(field.value()));
            }

            Ok(JsonSeries {
                name: &record.name,
                columns,
                points: vec![point],
            })
        })
        .collect::<Result<Vec<JsonSeries>, Error>>()?;
    Ok(serde_json::to_vec(&series)?)
}

#[derive(Debug, Clone)]
pub struct JsonTransport {
    client: reqwest::Client,
    url: Url,
    precision: Precision,
    destination: String,
}

impl JsonTransport {
    pub fn new(config: &ConnectionConfig) -> Result<Self, Error> {
        warn!("The InfluxDB JSON protocol is deprecated since 0.9.1, use the line protocol over HTTP or UDP");
        let precision = json_precision(config.precision);
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(JsonTransport {
            client,
            url: config.series_url(precision)?,
            precision,
            destination: config.destination(),
        })
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn encode(&self, records: &[Record]) -> Result<Vec<u8>, Error> {
        encode_series(records, self.precision)
    }

    pub async fn write(&self, bytes: &[u8]) -> Result<Vec<u8>, Error> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(bytes.to_vec())
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(anyhow!(
                "InfluxDB responded with {}: {}",
                status,
                String::from_utf8_lossy(&body).trim()
            ));
        }
        debug!("Wrote {} JSON bytes to {}", bytes.len(), self.destination);
        Ok(body.to_vec())
    }
}
