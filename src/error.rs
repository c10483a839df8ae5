use thiserror::Error;

/// Rejected input while building a [`Tag`](crate::record::Tag),
/// [`Field`](crate::record::Field) or record.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("tag key cannot be empty")]
    EmptyTagKey,
    #[error("value of tag {0} cannot be empty")]
    EmptyTagValue(String),
    #[error("field key cannot be empty")]
    EmptyFieldKey,
    #[error("string value of field {0} cannot be empty")]
    EmptyFieldValue(String),
    #[error("value of field {key} is not finite: {value}")]
    NonFiniteValue { key: String, value: f64 },
}

/// Invalid connection or writer settings, raised while the report is set up.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid InfluxDB URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("unsupported InfluxDB URI scheme {0}")]
    UnsupportedScheme(String),
    #[error("hostname is required")]
    MissingHost,
    #[error("port is required for UDP connections")]
    MissingPort,
    #[error("database must not be set for UDP connections, it is configured on the UDP endpoint")]
    UnexpectedDatabase,
    #[error("database is required for {0} connections")]
    MissingDatabase(&'static str),
    #[error("unknown precision {0}, expected one of n, u, ms, s, m, h")]
    InvalidPrecision(String),
    #[error("batch size cannot be negative: {0}")]
    NegativeBatchSize(i64),
    #[error("{0} environment variable is not defined")]
    MissingEnvVariable(&'static str),
    #[error("{name} environment variable is invalid: {value}")]
    InvalidEnvVariable { name: &'static str, value: String },
}
