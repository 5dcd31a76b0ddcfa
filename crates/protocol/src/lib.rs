//! Wire types shared by the tracerlog engine and its consumers.
//!
//! The JSON shape of [`TraceEntry`] is consumed by external listeners of the
//! `console:save` event and by exported log files, so field names and order
//! are fixed.

pub mod console_log;
pub mod constants;

// Re-export primary types for convenience.
pub use console_log::{
    LogLevel, SaveEventDetail, TraceDate, TraceEntry, TraceObject, decode_batch, encode_batch,
};
