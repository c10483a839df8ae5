use crate::config::ConnectionConfig;
use crate::error::ConfigError;
use anyhow::{anyhow, Error, Result};
use log::debug;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct UdpTransport {
    hostname: String,
    port: u16,
    timeout: Duration,
    destination: String,
}

impl UdpTransport {
    pub fn new(config: &ConnectionConfig) -> Result<Self, ConfigError> {
        let port = match config.port {
            Some(port) if port != 0 => port,
            _ => return Err(ConfigError::MissingPort),
        };
        if config.hostname.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        Ok(UdpTransport {
            hostname: config.hostname.clone(),
            port,
            timeout: config.timeout,
            destination: config.destination(),
        })
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    pub async fn write(&self, bytes: &[u8]) -> Result<Vec<u8>, Error> {
        // Sends the whole batch as one datagram. No reply is expected, the
        // returned bytes are the sent length as a little-endian u32.

        let target = lookup_host((self.hostname.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| anyhow!("could not resolve {}", self.hostname))?;
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        let sent = timeout(self.timeout, socket.send_to(bytes, target)).await??;
        debug!("Sent {} byte datagram to {}", sent, self.destination);
        Ok((sent as u32).to_le_bytes().to_vec())
    }
}
