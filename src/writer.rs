use crate::error::ConfigError;
use crate::error_handler::ErrorHandler;
use crate::record::{Precision, Record};
use crate::transport::Transport;
use log::{debug, trace};
use std::time::Instant;
use tokio::sync::Mutex;

/// Buffers records and ships them through its transport.
///
/// One mutex covers both the buffer and the transport call, so flushes
/// (explicit or triggered by `batch_size`) run one at a time and in the order
/// they were requested. A batch that fails to send is reported to the error
/// handler and dropped, never re-queued.
#[derive(Debug)]
pub struct BatchWriter {
    batch_size: usize,
    buffer: Mutex<Vec<Record>>,
    transport: Transport,
    error_handler: ErrorHandler,
}

impl BatchWriter {
    pub fn new(transport: Transport, batch_size: i64, error_handler: ErrorHandler) -> Result<Self, ConfigError> {
        if batch_size < 0 {
            return Err(ConfigError::NegativeBatchSize(batch_size));
        }
        Ok(BatchWriter {
            batch_size: batch_size as usize,
            buffer: Mutex::new(Vec::new()),
            transport,
            error_handler,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub async fn buffered(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Appends records; flushes the oldest `batch_size` records each time
    /// the buffer reaches `batch_size`.
    pub async fn write(&self, records: impl IntoIterator<Item = Record>) {
        let mut buffer = self.buffer.lock().await;
        buffer.extend(records);

        if self.batch_size == 0 {
            return;
        }
        while buffer.len() >= self.batch_size {
            let batch: Vec<Record> = buffer.drain(..self.batch_size).collect();
            self.send(batch).await;
        }
    }

    /// Sends everything buffered.
    pub async fn flush(&self) {
        let mut buffer = self.buffer.lock().await;
        let batch = std::mem::take(&mut *buffer);
        self.send(batch).await;
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    async fn send(&self, mut batch: Vec<Record>) {
        // Called with the buffer lock held.

        if batch.is_empty() {
            return;
        }
        let function_start = Instant::now();
        if self.transport.requires_nanoseconds() {
            for record in batch.iter_mut() {
                record.precision = Precision::Nanoseconds;
            }
        }

        let bytes = match self.transport.encode(&batch) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.report_failure(&error, &batch, 0);
                return;
            }
        };

        match self.transport.write_to_transport(&batch, &bytes).await {
            Ok(_) => debug!(
                "Flushed {} records ({} bytes) to InfluxDB over {} [{}]",
                batch.len(),
                bytes.len(),
                self.transport.kind(),
                self.transport.destination()
            ),
            Err(error) => self.report_failure(&error, &batch, bytes.len()),
        }
        trace!("send duration: {:?}", function_start.elapsed());
    }

    fn report_failure(&self, error: &anyhow::Error, batch: &[Record], byte_count: usize) {
        let message = format!(
            "Error while uploading {} measurements ({} bytes) to InfluxDB over {} [{}]",
            batch.len(),
            byte_count,
            self.transport.kind(),
            self.transport.destination()
        );
        self.error_handler.handle(error, &message);
    }
}
