//! Flush sinks: the event notification and the file export.

use std::sync::Arc;

use tracerlog_protocol::SaveEventDetail;
use tracerlog_protocol::constants::{LOG_FILE_MIME, SAVE_EVENT, log_file_name};

use crate::host::{Downloader, EventTarget};

/// Errors produced while delivering a batch to a sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("listener failed: {0}")]
    Listener(String),

    #[error("no downloader configured")]
    NoDownloader,

    #[error("sink panicked: {0}")]
    Panicked(String),
}

/// Why a batch was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The buffer reached the configured limit.
    Threshold,
    /// The host asked for an immediate save.
    ForceSave,
    /// The page is unloading.
    Unload,
}

/// A serialized batch handed to every sink.
#[derive(Debug, Clone)]
pub struct Batch {
    pub reason: FlushReason,
    /// Number of entries in `logs`.
    pub entries: usize,
    /// JSON array of trace entries.
    pub logs: Arc<str>,
    /// Flush time in milliseconds since the Unix epoch.
    pub unix: i64,
    /// File export setting at flush time.
    pub save_file: bool,
}

/// A downloadable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime: &'static str,
    pub contents: Arc<str>,
}

/// Destination for flushed batches.
pub trait Sink: Send + Sync {
    /// Short name used in logs and flush reports.
    fn name(&self) -> &str;

    /// Whether the sink takes `batch`.
    fn is_active(&self, _batch: &Batch) -> bool {
        true
    }

    fn deliver(&self, batch: &Batch) -> Result<(), SinkError>;
}

/// Dispatches `console:save` carrying the batch.
pub struct EventSink {
    target: Arc<dyn EventTarget>,
}

impl EventSink {
    pub fn new(target: Arc<dyn EventTarget>) -> Self {
        Self { target }
    }
}

impl Sink for EventSink {
    fn name(&self) -> &str {
        "event"
    }

    fn deliver(&self, batch: &Batch) -> Result<(), SinkError> {
        let detail = SaveEventDetail {
            logs: batch.logs.to_string(),
        };
        self.target.dispatch_event(SAVE_EVENT, &detail)
    }
}

/// Exports the batch as `log_<unix>.json` when file saving was enabled at
/// flush time.
pub(crate) struct FileSink {
    downloader: Option<Arc<dyn Downloader>>,
}

impl FileSink {
    pub(crate) fn new(downloader: Option<Arc<dyn Downloader>>) -> Self {
        Self { downloader }
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn is_active(&self, batch: &Batch) -> bool {
        batch.save_file
    }

    fn deliver(&self, batch: &Batch) -> Result<(), SinkError> {
        let downloader = self.downloader.as_ref().ok_or(SinkError::NoDownloader)?;
        let artifact = Artifact {
            file_name: log_file_name(batch.unix),
            mime: LOG_FILE_MIME,
            contents: Arc::clone(&batch.logs),
        };
        downloader.download(&artifact)?;
        tracing::debug!(file = %artifact.file_name, "log file exported");
        Ok(())
    }
}
