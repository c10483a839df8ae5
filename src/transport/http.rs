use crate::config::ConnectionConfig;
use anyhow::{anyhow, Error, Result};
use log::debug;
use reqwest::header::CONTENT_TYPE;
use std::time::Instant;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    destination: String,
}

impl HttpTransport {
    pub fn new(config: &ConnectionConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(HttpTransport {
            client,
            url: config.write_url()?,
            destination: config.destination(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    pub async fn write(&self, bytes: &[u8]) -> Result<Vec<u8>, Error> {
        // POST the line protocol body; anything but a 2xx is a failure.

        let start = Instant::now();
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
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

        debug!(
            "Wrote {} bytes to {} in {:?}",
            bytes.len(),
            self.destination,
            start.elapsed()
        );
        Ok(body.to_vec())
    }
}
