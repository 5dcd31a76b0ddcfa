//! Sink dispatch.
//!
//! Flushed batches are queued on an unbounded channel and delivered in order
//! by a background task, so the caller of a console method never waits on a
//! sink. Each submission yields a [`FlushTicket`] that resolves once every
//! sink has seen the batch; dropping the ticket is fine.
//!
//! Without a tokio runtime (or once the task is gone) batches are delivered
//! inline on the caller's thread instead of being lost.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::sink::{Batch, FlushReason, Sink, SinkError};

/// A sink that failed to take a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkFailure {
    pub sink: String,
    pub error: String,
}

/// Outcome of delivering one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub reason: FlushReason,
    /// Number of entries in the batch.
    pub entries: usize,
    /// Sinks that accepted the batch.
    pub delivered: usize,
    /// Sinks that did not take this batch.
    pub skipped: usize,
    pub failures: Vec<SinkFailure>,
}

/// Completion handle of a flush.
///
/// Resolves to `None` only if the dispatcher went away before the batch was
/// delivered.
#[derive(Debug)]
#[must_use = "await the ticket, or call `detach` to ignore the flush outcome"]
pub struct FlushTicket {
    rx: oneshot::Receiver<FlushReport>,
}

impl FlushTicket {
    /// Lets the flush complete in the background.
    pub fn detach(self) {}
}

impl Future for FlushTicket {
    type Output = Option<FlushReport>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

pub(crate) struct Job {
    batch: Batch,
    reply: oneshot::Sender<FlushReport>,
}

/// Result of [`Dispatcher::submit`].
pub(crate) enum Submitted {
    Queued(FlushTicket),
    /// Must be handed to [`Dispatcher::run_inline`] by the caller.
    Inline(Job, FlushTicket),
}

pub(crate) struct Dispatcher {
    sinks: Arc<[Box<dyn Sink>]>,
    tx: Option<mpsc::UnboundedSender<Job>>,
}

impl Dispatcher {
    /// Creates a dispatcher, spawning its delivery task on the current tokio
    /// runtime if there is one.
    pub(crate) fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        let sinks: Arc<[Box<dyn Sink>]> = sinks.into();

        let tx = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let (tx, rx) = mpsc::unbounded_channel();
                handle.spawn(dispatch_loop(Arc::clone(&sinks), rx));
                Some(tx)
            }
            Err(_) => {
                tracing::debug!("no tokio runtime, batches will be delivered inline");
                None
            }
        };

        Self { sinks, tx }
    }

    /// Queues a batch for delivery.
    pub(crate) fn submit(&self, batch: Batch) -> Submitted {
        let (reply, rx) = oneshot::channel();
        let ticket = FlushTicket { rx };
        let job = Job { batch, reply };

        let Some(tx) = &self.tx else {
            return Submitted::Inline(job, ticket);
        };
        match tx.send(job) {
            Ok(()) => Submitted::Queued(ticket),
            Err(mpsc::error::SendError(job)) => {
                tracing::warn!("dispatch task stopped, delivering inline");
                Submitted::Inline(job, ticket)
            }
        }
    }

    pub(crate) fn run_inline(&self, job: Job) {
        run_job(&self.sinks, job);
    }
}

async fn dispatch_loop(sinks: Arc<[Box<dyn Sink>]>, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        run_job(&sinks, job);
    }
    tracing::debug!("dispatch task finished");
}

fn run_job(sinks: &[Box<dyn Sink>], job: Job) {
    let report = deliver(sinks, &job.batch);
    // The caller may have dropped its ticket.
    let _ = job.reply.send(report);
}

/// Hands `batch` to every active sink. A failing or panicking sink is
/// recorded and never stops the others.
pub(crate) fn deliver(sinks: &[Box<dyn Sink>], batch: &Batch) -> FlushReport {
    let mut report = FlushReport {
        reason: batch.reason,
        entries: batch.entries,
        delivered: 0,
        skipped: 0,
        failures: Vec::new(),
    };

    for sink in sinks {
        if !sink.is_active(batch) {
            report.skipped += 1;
            continue;
        }

        let result = catch_unwind(AssertUnwindSafe(|| sink.deliver(batch)))
            .unwrap_or_else(|panic| Err(SinkError::Panicked(panic_message(panic.as_ref()))));

        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                tracing::warn!(sink = sink.name(), error = %e, "sink failed to take batch");
                report.failures.push(SinkFailure {
                    sink: sink.name().to_owned(),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::debug!(
        reason = ?report.reason,
        entries = report.entries,
        delivered = report.delivered,
        failed = report.failures.len(),
        "batch flushed"
    );
    report
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
