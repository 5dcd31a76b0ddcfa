//! The tracer engine: owns the buffer, installs the console proxy and drives
//! flushes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::FutureExt;
use serde::Serialize;
use tracerlog_protocol::constants::{MARKER_BEFORE_UNLOAD, MARKER_SAVE_NOW};
use tracerlog_protocol::{LogLevel, TraceEntry, encode_batch};

use crate::buffer::LogBuffer;
use crate::config::{Config, Settings};
use crate::dispatch::{Dispatcher, FlushTicket, Submitted};
use crate::host::{Downloader, EventTarget, Page, UnloadHandler};
use crate::proxy::ConsoleProxy;
use crate::recorder;
use crate::sink::{Batch, EventSink, FileSink, FlushReason, Sink};

/// Console log tracer.
///
/// Created with [`Tracer::builder`]; inactive until [`Tracer::initialize`]
/// replaces the page's console with a recording proxy. Cloning yields another
/// handle to the same engine.
///
/// Build it inside a tokio runtime to get background sink delivery; outside
/// one, batches are delivered on the flushing thread.
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    page: Arc<dyn Page>,
    pub(crate) settings: Arc<Settings>,
    buffer: Mutex<LogBuffer>,
    dispatcher: Dispatcher,
    initialized: AtomicBool,
}

/// Builder for [`Tracer`].
pub struct TracerBuilder {
    page: Arc<dyn Page>,
    events: Arc<dyn EventTarget>,
    downloader: Option<Arc<dyn Downloader>>,
    sinks: Vec<Box<dyn Sink>>,
    config: Config,
}

impl TracerBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Download mechanism used by the file export.
    pub fn downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Adds a sink after the built-in event and file sinks.
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn build(self) -> Tracer {
        let settings = Arc::new(Settings::new(&self.config));

        let mut sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(EventSink::new(self.events)),
            Box::new(FileSink::new(self.downloader)),
        ];
        sinks.extend(self.sinks);

        Tracer {
            inner: Arc::new(Inner {
                page: self.page,
                settings,
                buffer: Mutex::new(LogBuffer::new()),
                dispatcher: Dispatcher::new(sinks),
                initialized: AtomicBool::new(false),
            }),
        }
    }
}

impl Tracer {
    /// Starts building a tracer for `page`, notifying `events` on every flush.
    pub fn builder(page: Arc<dyn Page>, events: Arc<dyn EventTarget>) -> TracerBuilder {
        TracerBuilder {
            page,
            events,
            downloader: None,
            sinks: Vec::new(),
            config: Config::default(),
        }
    }

    /// Installs the console proxy and the unload observer.
    ///
    /// Idempotent: does nothing if already initialized.
    pub fn initialize(&self) {
        if self.inner.initialized.swap(true, Ordering::AcqRel) {
            tracing::debug!("tracer already initialized");
            return;
        }

        let page = &self.inner.page;
        page.add_unload_listener(unload_handler(Arc::downgrade(&self.inner)));

        let original = page.console();
        page.set_console(Arc::new(ConsoleProxy::new(
            Arc::downgrade(&self.inner),
            original,
        )));

        let config = self.config();
        tracing::info!(
            limit = config.limit,
            pass_through = config.pass_through,
            save_file = config.save_file,
            "console interception installed"
        );
    }

    /// Returns `true` once [`Tracer::initialize`] ran.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    pub fn log<T: Serialize + ?Sized>(&self, message: &T) -> Option<FlushTicket> {
        self.inner.record(LogLevel::Log, message)
    }

    pub fn warn<T: Serialize + ?Sized>(&self, message: &T) -> Option<FlushTicket> {
        self.inner.record(LogLevel::Warn, message)
    }

    pub fn error<T: Serialize + ?Sized>(&self, message: &T) -> Option<FlushTicket> {
        self.inner.record(LogLevel::Error, message)
    }

    pub fn debug<T: Serialize + ?Sized>(&self, message: &T) -> Option<FlushTicket> {
        self.inner.record(LogLevel::Debug, message)
    }

    pub fn info<T: Serialize + ?Sized>(&self, message: &T) -> Option<FlushTicket> {
        self.inner.record(LogLevel::Info, message)
    }

    /// Drops buffered entries without flushing them.
    pub fn clear(&self) {
        self.inner.lock_buffer().clear();
    }

    /// Records a `saveNow` marker and flushes everything buffered.
    pub fn force_save(&self) -> FlushTicket {
        self.inner
            .flush_with_marker(MARKER_SAVE_NOW, FlushReason::ForceSave)
    }

    /// Copy of the buffered entries, oldest first.
    pub fn data(&self) -> Vec<TraceEntry> {
        self.inner.lock_buffer().entries().to_vec()
    }

    /// Current configuration values.
    pub fn config(&self) -> Config {
        self.inner.settings.snapshot()
    }

    pub fn limit(&self) -> usize {
        self.inner.settings.limit()
    }

    /// Sets the flush threshold. Takes effect on the next append.
    pub fn set_limit(&self, limit: usize) {
        self.inner.settings.set_limit(limit);
    }

    pub fn pass_through(&self) -> bool {
        self.inner.settings.pass_through()
    }

    pub fn set_pass_through(&self, enabled: bool) {
        self.inner.settings.set_pass_through(enabled);
    }

    pub fn save_file(&self) -> bool {
        self.inner.settings.save_file()
    }

    pub fn set_save_file(&self, enabled: bool) {
        self.inner.settings.set_save_file(enabled);
    }

    pub fn capture_call_site(&self) -> bool {
        self.inner.settings.capture_call_site()
    }

    pub fn set_capture_call_site(&self, enabled: bool) {
        self.inner.settings.set_capture_call_site(enabled);
    }
}

impl Inner {
    /// Records one call; flushes if the buffer reached the limit.
    pub(crate) fn record<T: Serialize + ?Sized>(
        &self,
        level: LogLevel,
        payload: &T,
    ) -> Option<FlushTicket> {
        let entry = self.build_entry(level, payload);
        let mut buffer = self.lock_buffer();
        let entries = buffer.push(entry, self.settings.limit())?;
        Some(self.flush_locked(buffer, FlushReason::Threshold, entries))
    }

    /// Appends an `info` marker and flushes the whole buffer in one step.
    fn flush_with_marker(&self, marker: &str, reason: FlushReason) -> FlushTicket {
        let entry = self.build_entry(LogLevel::Info, marker);
        let mut buffer = self.lock_buffer();
        buffer.push_unchecked(entry);
        let entries = buffer.take();
        self.flush_locked(buffer, reason, entries)
    }

    fn build_entry<T: Serialize + ?Sized>(&self, level: LogLevel, payload: &T) -> TraceEntry {
        recorder::record(
            level,
            payload,
            &self.page.location(),
            self.settings.capture_call_site(),
        )
    }

    /// Submits drained entries while still holding the buffer lock, so
    /// batches reach the dispatcher in drain order. Inline delivery runs only
    /// after the lock is released.
    fn flush_locked(
        &self,
        buffer: MutexGuard<'_, LogBuffer>,
        reason: FlushReason,
        entries: Vec<TraceEntry>,
    ) -> FlushTicket {
        let batch = make_batch(reason, &entries, self.settings.save_file());
        let submitted = self.dispatcher.submit(batch);
        drop(buffer);

        match submitted {
            Submitted::Queued(ticket) => ticket,
            Submitted::Inline(job, ticket) => {
                self.dispatcher.run_inline(job);
                ticket
            }
        }
    }

    fn lock_buffer(&self) -> MutexGuard<'_, LogBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn make_batch(reason: FlushReason, entries: &[TraceEntry], save_file: bool) -> Batch {
    let logs = encode_batch(entries).unwrap_or_else(|e| {
        tracing::error!(error = %e, entries = entries.len(), "failed to encode batch");
        "[]".to_owned()
    });

    Batch {
        reason,
        entries: entries.len(),
        logs: Arc::from(logs),
        unix: chrono::Utc::now().timestamp_millis(),
        save_file,
    }
}

/// Records the `beforeunload` marker and flushes; the returned future
/// resolves once every sink has the batch.
fn unload_handler(tracer: Weak<Inner>) -> UnloadHandler {
    Box::new(move || {
        let ticket = tracer
            .upgrade()
            .map(|inner| inner.flush_with_marker(MARKER_BEFORE_UNLOAD, FlushReason::Unload));

        async move {
            if let Some(ticket) = ticket
                && ticket.await.is_none()
            {
                tracing::warn!("unload flush was not confirmed");
            }
        }
        .boxed()
    })
}
