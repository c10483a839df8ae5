use crate::record::{Batch, Record};
use anyhow::{anyhow, Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct CaptureState {
    flush_history: Vec<Batch>,
    payloads: Vec<Vec<u8>>,
    failure: Option<String>,
}

/// Keeps every flushed batch in memory instead of sending it anywhere.
/// Clones share the same history, so a test can keep one handle and give
/// the other to a writer.
#[derive(Debug, Clone, Default)]
pub struct CaptureTransport {
    state: Arc<Mutex<CaptureState>>,
}

impl CaptureTransport {
    pub fn new() -> Self {
        CaptureTransport::default()
    }

    /// A transport whose every write fails with `message`.
    pub fn failing(message: &str) -> Self {
        let transport = CaptureTransport::new();
        transport.set_failure(Some(message));
        transport
    }

    pub fn set_failure(&self, message: Option<&str>) {
        self.lock().failure = message.map(str::to_string);
    }

    pub fn flush_history(&self) -> Vec<Batch> {
        self.lock().flush_history.clone()
    }

    pub fn last_batch(&self) -> Batch {
        self.lock().flush_history.last().cloned().unwrap_or_default()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.lock().payloads.clone()
    }

    pub fn write(&self, records: &[Record], bytes: &[u8]) -> Result<Vec<u8>, Error> {
        let mut state = self.lock();
        state.flush_history.push(Batch::from(records));
        state.payloads.push(bytes.to_vec());
        match state.failure.as_ref() {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
