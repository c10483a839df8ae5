use super::{parse_global_tags, ConnectionConfig, TransportKind, DEFAULT_HTTP_PORT};
use crate::error::ConfigError;
use crate::metric_data::MetricTags;
use crate::record::Precision;
use anyhow::Error;
use std::env;
use std::time::Duration;

#[test]
fn test_parse_http_uri() -> Result<(), Error> {
    let config = ConnectionConfig::from_uri(
        "http://influx.local:8087/write?db=metrics&u=admin&p=secret&rp=week&precision=ms",
    )?;

    assert_eq!(config.transport, TransportKind::Http);
    assert!(!config.use_https);
    assert_eq!(config.hostname, "influx.local");
    assert_eq!(config.port, Some(8087));
    assert_eq!(config.database.as_deref(), Some("metrics"));
    assert_eq!(config.username.as_deref(), Some("admin"));
    assert_eq!(config.password.as_deref(), Some("secret"));
    assert_eq!(config.retention_policy.as_deref(), Some("week"));
    assert_eq!(config.precision, Precision::Milliseconds);
    Ok(())
}

#[test]
fn test_parse_database_from_path() -> Result<(), Error> {
    let config = ConnectionConfig::from_uri("https://influx.local/metrics")?;

    assert!(config.use_https);
    assert_eq!(config.port, None);
    assert_eq!(config.port_or_default(), DEFAULT_HTTP_PORT);
    assert_eq!(config.database.as_deref(), Some("metrics"));
    assert_eq!(config.precision, Precision::Seconds);
    Ok(())
}

#[test]
fn test_parse_udp_uri() -> Result<(), Error> {
    let config = ConnectionConfig::from_uri("net.udp://127.0.0.1:8089/")?;

    assert_eq!(config.transport, TransportKind::Udp);
    assert_eq!(config.hostname, "127.0.0.1");
    assert_eq!(config.port, Some(8089));
    assert_eq!(config.database, None);
    assert_eq!(config.destination(), "net.udp://127.0.0.1:8089/");
    Ok(())
}

#[test]
fn test_parse_legacy_json_uri() -> Result<(), Error> {
    let config =
        ConnectionConfig::from_uri("http://influx.local:8086/db/metrics/series?u=root&p=root&time_precision=s")?;

    assert_eq!(config.transport, TransportKind::Json);
    assert_eq!(config.database.as_deref(), Some("metrics"));
    assert_eq!(config.username.as_deref(), Some("root"));
    Ok(())
}

#[test]
fn test_udp_requires_port() {
    assert_eq!(
        ConnectionConfig::from_uri("net.udp://127.0.0.1/"),
        Err(ConfigError::MissingPort)
    );
    assert_eq!(
        ConnectionConfig::udp("127.0.0.1", 0).validate(),
        Err(ConfigError::MissingPort)
    );
}

#[test]
fn test_udp_rejects_database() {
    let config = ConnectionConfig {
        database: Some("metrics".to_string()),
        ..ConnectionConfig::udp("127.0.0.1", 8089)
    };

    assert_eq!(config.validate(), Err(ConfigError::UnexpectedDatabase));
    assert_eq!(
        ConnectionConfig::from_uri("net.udp://127.0.0.1:8089/?db=metrics"),
        Err(ConfigError::UnexpectedDatabase)
    );
}

#[test]
fn test_missing_host_and_database() {
    assert_eq!(
        ConnectionConfig::http(" ", "metrics").validate(),
        Err(ConfigError::MissingHost)
    );
    assert_eq!(
        ConnectionConfig::from_uri("http://:8086/write?db=metrics"),
        Err(ConfigError::MissingHost)
    );
    assert_eq!(
        ConnectionConfig::from_uri("http://influx.local:8086/write"),
        Err(ConfigError::MissingDatabase("HTTP"))
    );
}

#[test]
fn test_rejects_bad_scheme_precision_and_batch_size() {
    assert_eq!(
        ConnectionConfig::from_uri("ftp://influx.local/metrics"),
        Err(ConfigError::UnsupportedScheme("ftp".to_string()))
    );
    assert_eq!(
        ConnectionConfig::from_uri("http://influx.local/write?db=m&precision=d"),
        Err(ConfigError::InvalidPrecision("d".to_string()))
    );
    assert!(matches!(
        ConnectionConfig::from_uri("not a uri"),
        Err(ConfigError::InvalidUri { .. })
    ));
    let config = ConnectionConfig {
        batch_size: -1,
        ..ConnectionConfig::http("influx.local", "metrics")
    };
    assert_eq!(config.validate(), Err(ConfigError::NegativeBatchSize(-1)));
}

#[test]
fn test_write_url() -> Result<(), Error> {
    let config = ConnectionConfig {
        username: Some("admin".to_string()),
        password: Some("p@ss word".to_string()),
        retention_policy: Some("week".to_string()),
        precision: Precision::Nanoseconds,
        ..ConnectionConfig::http("influx.local", "metrics")
    };

    assert_eq!(
        config.write_url()?.as_str(),
        "http://influx.local:8086/write?db=metrics&u=admin&p=p%40ss+word&rp=week&precision=n"
    );
    assert_eq!(config.destination(), "http://influx.local:8086/metrics");
    Ok(())
}

#[test]
fn test_series_url() -> Result<(), Error> {
    let config = ConnectionConfig {
        username: Some("root".to_string()),
        port: Some(8090),
        ..ConnectionConfig::json("influx.local", "metrics")
    };

    assert_eq!(
        config.series_url(Precision::Milliseconds)?.as_str(),
        "http://influx.local:8090/db/metrics/series?u=root&time_precision=ms"
    );
    Ok(())
}

#[test]
fn test_parse_global_tags() -> Result<(), Error> {
    assert_eq!(
        parse_global_tags("host=node1, env=prod")?,
        MetricTags::new().with("host", "node1").with("env", "prod")
    );
    assert!(parse_global_tags("host").is_err());
    Ok(())
}

#[test]
fn test_from_env() -> Result<(), Error> {
    // All environment handling lives in one test so parallel tests never race on it.
    env::remove_var("influxdb_uri");
    assert_eq!(
        ConnectionConfig::from_env(),
        Err(ConfigError::MissingEnvVariable("influxdb_uri"))
    );

    env::set_var("influxdb_uri", "http://localhost:8086/write?db=metrics");
    env::set_var("batch_size", "-5");
    assert_eq!(
        ConnectionConfig::from_env(),
        Err(ConfigError::NegativeBatchSize(-5))
    );

    env::set_var("batch_size", "50");
    env::set_var("timeout_seconds", "3");
    env::set_var("global_tags", "host=node1");
    let config = ConnectionConfig::from_env()?;
    assert_eq!(config.batch_size, 50);
    assert_eq!(config.timeout, Duration::from_secs(3));
    assert_eq!(config.global_tags, MetricTags::new().with("host", "node1"));

    for name in ["influxdb_uri", "batch_size", "timeout_seconds", "global_tags"] {
        env::remove_var(name);
    }
    Ok(())
}
