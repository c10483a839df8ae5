use anyhow::Error;
use chrono::Utc;
use influxdb_metrics_reporter::{
    config::validate_env_variables, ConnectionConfig, CounterValue, HealthCheckResult,
    HealthStatus, InfluxdbReport, MetricTags, Unit,
};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

static REPORT_INTERVAL_ENV: &str = "report_interval_seconds";
static DEFAULT_REPORT_INTERVAL_SECONDS: u64 = 10;

fn report_interval() -> Result<Duration, Error> {
    let seconds = match std::env::var(REPORT_INTERVAL_ENV) {
        Ok(value) => value.trim().parse::<u64>()?,
        Err(_) => DEFAULT_REPORT_INTERVAL_SECONDS,
    };
    Ok(Duration::from_secs(seconds.max(1)))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    validate_env_variables()?;
    let config = ConnectionConfig::from_env()?;
    let interval = report_interval()?;
    tracing::info!("Reporting to {} every {:?}", config.destination(), interval);

    let mut report = InfluxdbReport::builder(config.clone()).build()?;
    let tags = MetricTags::new().with("reporter", "influxdb-metrics-reporter");
    let started = Instant::now();
    let mut flushes: i64 = 0;
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                report.start_report(Utc::now());
                report.start_context("application", Utc::now());
                report
                    .report_gauge("uptime", &tags, &Unit::new("seconds"), started.elapsed().as_secs_f64())
                    .await;
                report
                    .report_counter(
                        "flushes",
                        &tags,
                        &Unit::new("flushes"),
                        &CounterValue { count: flushes, items: Vec::new() },
                    )
                    .await;
                report.end_context();

                let check = match config.validate() {
                    Ok(()) => HealthCheckResult::healthy("config", config.destination()),
                    Err(error) => HealthCheckResult::unhealthy("config", error.to_string()),
                };
                report.report_health(&HealthStatus { results: vec![check] }).await;
                report.end_report().await;
                flushes += 1;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down after {} reports", flushes);
                report.end_report().await;
                return Ok(());
            }
        }
    }
}
