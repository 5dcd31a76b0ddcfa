//! Console interception with buffered trace flushing.
//!
//! A [`Tracer`] replaces a page's global console with a proxy that records
//! every method call as a [`TraceEntry`](tracerlog_protocol::TraceEntry),
//! keeps the entries in memory, and flushes them to sinks when the buffer
//! reaches its limit, when the page unloads, or on [`Tracer::force_save`].
//! Each flush dispatches a `console:save` event and, if enabled, exports a
//! `log_<unix>.json` file.

mod buffer;
mod config;
mod dispatch;
pub mod headless;
mod host;
mod proxy;
mod recorder;
mod sink;
mod tracer;

pub use buffer::LogBuffer;
pub use config::Config;
pub use dispatch::{FlushReport, FlushTicket, SinkFailure};
pub use host::{Console, Downloader, EventTarget, Member, Page, UnloadHandler};
pub use proxy::ConsoleProxy;
pub use recorder::{capture_call_site_frames, get_time, record, serialize_payload};
pub use sink::{Artifact, Batch, EventSink, FlushReason, Sink, SinkError};
pub use tracer::{Tracer, TracerBuilder};
