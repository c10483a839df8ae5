use crate::config::{ConnectionConfig, TransportKind};
use crate::line_protocol::encode_batch;
use crate::record::Record;
use anyhow::{Error, Result};
use log::trace;
use std::time::Instant;

mod capture;
mod http;
mod json;
mod udp;

pub use capture::CaptureTransport;
pub use http::HttpTransport;
pub use json::{encode_series, json_precision, JsonTransport};
pub use udp::UdpTransport;

/// The network leg of a flush. Every variant takes the encoded batch and
/// either returns the server's response bytes or an error; none of them retry.
#[derive(Debug, Clone)]
pub enum Transport {
    Http(HttpTransport),
    Udp(UdpTransport),
    /// Deprecated JSON write API of InfluxDB before 0.9.1.
    Json(JsonTransport),
    Capture(CaptureTransport),
}

impl Transport {
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, Error> {
        // Picks the transport named by the connection's scheme.

        let function_start = Instant::now();
        config.validate()?;
        let transport = match config.transport {
            TransportKind::Http => Transport::Http(HttpTransport::new(config)?),
            TransportKind::Udp => Transport::Udp(UdpTransport::new(config)?),
            TransportKind::Json => Transport::Json(JsonTransport::new(config)?),
        };
        trace!("Transport::from_config duration: {:?}", function_start.elapsed());
        Ok(transport)
    }

    /// UDP endpoints only accept nanosecond timestamps.
    pub fn requires_nanoseconds(&self) -> bool {
        matches!(self, Transport::Udp(_))
    }

    pub fn encode(&self, records: &[Record]) -> Result<Vec<u8>, Error> {
        match self {
            Transport::Json(transport) => transport.encode(records),
            _ => Ok(encode_batch(records).into_bytes()),
        }
    }

    pub async fn write_to_transport(&self, records: &[Record], bytes: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            Transport::Http(transport) => transport.write(bytes).await,
            Transport::Udp(transport) => transport.write(bytes).await,
            Transport::Json(transport) => transport.write(bytes).await,
            Transport::Capture(transport) => transport.write(records, bytes),
        }
    }

    pub fn destination(&self) -> String {
        match self {
            Transport::Http(transport) => transport.destination().to_string(),
            Transport::Udp(transport) => transport.destination().to_string(),
            Transport::Json(transport) => transport.destination().to_string(),
            Transport::Capture(_) => "capture".to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Transport::Http(_) => "HTTP",
            Transport::Udp(_) => "UDP",
            Transport::Json(_) => "JSON",
            Transport::Capture(_) => "capture",
        }
    }
}

impl From<CaptureTransport> for Transport {
    fn from(transport: CaptureTransport) -> Self {
        Transport::Capture(transport)
    }
}
