use crate::error::ConfigError;
use crate::metric_data::MetricTags;
use crate::record::Precision;
use log::trace;
use std::time::{Duration, Instant};
use url::Url;

pub const DEFAULT_HTTP_PORT: u16 = 8086;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

const INFLUXDB_URI_ENV: &str = "influxdb_uri";
const BATCH_SIZE_ENV: &str = "batch_size";
const TIMEOUT_SECONDS_ENV: &str = "timeout_seconds";
const GLOBAL_TAGS_ENV: &str = "global_tags";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Udp,
    /// Pre-0.9.1 JSON write API. Deprecated, kept for old servers only.
    Json,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TransportKind::Http => f.write_str("HTTP"),
            TransportKind::Udp => f.write_str("UDP"),
            TransportKind::Json => f.write_str("JSON"),
        }
    }
}

/// Resolved connection settings. Build it once, validate it, then hand it to
/// the report; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub transport: TransportKind,
    pub use_https: bool,
    pub hostname: String,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub retention_policy: Option<String>,
    pub precision: Precision,
    /// Records per implicit flush; 0 only flushes at the end of a report.
    pub batch_size: i64,
    pub timeout: Duration,
    pub global_tags: MetricTags,
}

impl ConnectionConfig {
    fn base(transport: TransportKind, hostname: &str) -> Self {
        ConnectionConfig {
            transport,
            use_https: false,
            hostname: hostname.to_string(),
            port: None,
            database: None,
            username: None,
            password: None,
            retention_policy: None,
            precision: Precision::default(),
            batch_size: 0,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            global_tags: MetricTags::new(),
        }
    }

    pub fn http(hostname: &str, database: &str) -> Self {
        ConnectionConfig {
            database: Some(database.to_string()),
            ..ConnectionConfig::base(TransportKind::Http, hostname)
        }
    }

    pub fn udp(hostname: &str, port: u16) -> Self {
        ConnectionConfig {
            port: Some(port),
            ..ConnectionConfig::base(TransportKind::Udp, hostname)
        }
    }

    pub fn json(hostname: &str, database: &str) -> Self {
        ConnectionConfig {
            database: Some(database.to_string()),
            ..ConnectionConfig::base(TransportKind::Json, hostname)
        }
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        // Parses http(s)://host[:port][/database|/write]?db=&u=&p=&rp=&precision=,
        // http(s)://host[:port]/db/<database>/series?u=&p=&time_precision= (legacy JSON)
        // or net.udp://host:port/

        let function_start = Instant::now();
        let url = Url::parse(uri.trim()).map_err(|error| match error {
            url::ParseError::EmptyHost => ConfigError::MissingHost,
            _ => ConfigError::InvalidUri {
                uri: uri.to_string(),
                reason: error.to_string(),
            },
        })?;

        let hostname = url.host_str().unwrap_or_default();
        let mut config = match url.scheme() {
            "http" | "https" => ConnectionConfig::base(TransportKind::Http, hostname),
            "net.udp" | "udp" => ConnectionConfig::base(TransportKind::Udp, hostname),
            scheme => return Err(ConfigError::UnsupportedScheme(scheme.to_string())),
        };
        config.use_https = url.scheme() == "https";
        config.port = url.port();

        if !url.username().is_empty() {
            config.username = Some(url.username().to_string());
        }
        config.password = url.password().map(str::to_string);

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();
        if config.transport == TransportKind::Http {
            match segments.as_slice() {
                ["db", database, "series"] => {
                    config.transport = TransportKind::Json;
                    config.database = Some(database.to_string());
                }
                [first, ..] if *first != "write" => config.database = Some(first.to_string()),
                _ => (),
            }
        }

        for (key, value) in url.query_pairs() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "db" => config.database = Some(value.to_string()),
                "u" => config.username = Some(value.to_string()),
                "p" => config.password = Some(value.to_string()),
                "rp" => config.retention_policy = Some(value.to_string()),
                "precision" | "time_precision" => config.precision = value.parse()?,
                _ => trace!("Ignoring unknown InfluxDB URI parameter {}", key),
            }
        }

        config.validate()?;
        trace!("from_uri duration: {:?}", function_start.elapsed());
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        // Reads the connection from environment variables.

        validate_env_variables()?;
        let uri = std::env::var(INFLUXDB_URI_ENV)
            .map_err(|_| ConfigError::MissingEnvVariable(INFLUXDB_URI_ENV))?;
        let mut config = ConnectionConfig::from_uri(&uri)?;

        if let Ok(batch_size) = std::env::var(BATCH_SIZE_ENV) {
            config.batch_size = parse_env(BATCH_SIZE_ENV, &batch_size)?;
        }
        if let Ok(timeout) = std::env::var(TIMEOUT_SECONDS_ENV) {
            config.timeout = Duration::from_secs(parse_env(TIMEOUT_SECONDS_ENV, &timeout)?);
        }
        if let Ok(global_tags) = std::env::var(GLOBAL_TAGS_ENV) {
            config.global_tags = parse_global_tags(&global_tags)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.batch_size < 0 {
            return Err(ConfigError::NegativeBatchSize(self.batch_size));
        }
        let has_database = self
            .database
            .as_deref()
            .is_some_and(|database| !database.trim().is_empty());
        match self.transport {
            TransportKind::Udp => {
                if self.port.unwrap_or(0) == 0 {
                    return Err(ConfigError::MissingPort);
                }
                if has_database {
                    return Err(ConfigError::UnexpectedDatabase);
                }
            }
            TransportKind::Http | TransportKind::Json => {
                if !has_database {
                    return Err(ConfigError::MissingDatabase(match self.transport {
                        TransportKind::Json => "JSON",
                        _ => "HTTP",
                    }));
                }
            }
        }
        Ok(())
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_HTTP_PORT)
    }

    fn base_url(&self, path: &str) -> Result<Url, ConfigError> {
        let scheme = if self.use_https { "https" } else { "http" };
        let uri = format!(
            "{}://{}:{}/{}",
            scheme,
            self.hostname,
            self.port_or_default(),
            path
        );
        Url::parse(&uri).map_err(|error| ConfigError::InvalidUri {
            uri,
            reason: error.to_string(),
        })
    }

    /// The line protocol write endpoint with its query string.
    pub fn write_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.base_url("write")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(database) = self.database.as_deref() {
                query.append_pair("db", database);
            }
            if let Some(username) = self.username.as_deref() {
                query.append_pair("u", username);
            }
            if let Some(password) = self.password.as_deref() {
                query.append_pair("p", password);
            }
            if let Some(retention_policy) = self.retention_policy.as_deref() {
                query.append_pair("rp", retention_policy);
            }
            query.append_pair("precision", self.precision.as_query_value());
        }
        Ok(url)
    }

    /// The legacy JSON series endpoint.
    pub fn series_url(&self, time_precision: Precision) -> Result<Url, ConfigError> {
        let database = self.database.as_deref().unwrap_or_default();
        let mut url = self.base_url("")?;
        url.path_segments_mut()
            .map_err(|_| ConfigError::InvalidUri {
                uri: self.destination(),
                reason: "cannot append path".to_string(),
            })?
            .clear()
            .extend(["db", database, "series"]);
        {
            let mut query = url.query_pairs_mut();
            if let Some(username) = self.username.as_deref() {
                query.append_pair("u", username);
            }
            if let Some(password) = self.password.as_deref() {
                query.append_pair("p", password);
            }
            query.append_pair("time_precision", time_precision.as_query_value());
        }
        Ok(url)
    }

    /// Where batches go, for log and error messages. Never includes the password.
    pub fn destination(&self) -> String {
        match self.transport {
            TransportKind::Udp => format!(
                "net.udp://{}:{}/",
                self.hostname,
                self.port.unwrap_or(0)
            ),
            _ => format!(
                "{}://{}:{}/{}",
                if self.use_https { "https" } else { "http" },
                self.hostname,
                self.port_or_default(),
                self.database.as_deref().unwrap_or_default()
            ),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVariable {
            name,
            value: value.to_string(),
        })
}

/// Parses `key=value,key=value` into tags.
pub fn parse_global_tags(value: &str) -> Result<MetricTags, ConfigError> {
    let mut tags = MetricTags::new();
    for pair in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((key, tag_value)) if !key.trim().is_empty() && !tag_value.trim().is_empty() => {
                tags = tags.with(key.trim(), tag_value.trim());
            }
            _ => {
                return Err(ConfigError::InvalidEnvVariable {
                    name: GLOBAL_TAGS_ENV,
                    value: value.to_string(),
                })
            }
        }
    }
    Ok(tags)
}

pub fn validate_env_variables() -> Result<(), ConfigError> {
    // Validate environment variables before anything is built from them

    let function_start = Instant::now();

    if std::env::var(INFLUXDB_URI_ENV).is_err() {
        return Err(ConfigError::MissingEnvVariable(INFLUXDB_URI_ENV));
    }
    if let Ok(batch_size) = std::env::var(BATCH_SIZE_ENV) {
        let batch_size: i64 = parse_env(BATCH_SIZE_ENV, &batch_size)?;
        if batch_size < 0 {
            return Err(ConfigError::NegativeBatchSize(batch_size));
        }
    }
    if let Ok(timeout) = std::env::var(TIMEOUT_SECONDS_ENV) {
        parse_env::<u64>(TIMEOUT_SECONDS_ENV, &timeout)?;
    }

    trace!(
        "validate_env_variables duration: {:?}",
        function_start.elapsed()
    );
    Ok(())
}

#[cfg(test)]
pub mod tests;
