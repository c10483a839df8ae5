use anyhow::Error;
use log::error;
use std::sync::Arc;

/// Sink for failures the pipeline absorbs instead of returning, such as a
/// batch that could not be delivered. Cloning shares the same callback, so a
/// single handler can serve several reports and threads at once.
#[derive(Clone)]
pub struct ErrorHandler {
    callback: Arc<dyn Fn(&Error, &str) + Send + Sync>,
}

impl ErrorHandler {
    pub fn new(callback: impl Fn(&Error, &str) + Send + Sync + 'static) -> Self {
        ErrorHandler {
            callback: Arc::new(callback),
        }
    }

    /// Drops every failure silently.
    pub fn ignore() -> Self {
        ErrorHandler::new(|_, _| ())
    }

    pub fn handle(&self, error: &Error, message: &str) {
        (self.callback)(error, message)
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        ErrorHandler::new(|error, message| error!("{}: {:#}", message, error))
    }
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("ErrorHandler")
    }
}
