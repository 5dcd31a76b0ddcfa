use std::fmt;

use serde::{Deserialize, Serialize};

/// Console method a trace entry was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Log,
    Warn,
    Error,
    Debug,
    Info,
}

impl LogLevel {
    /// All recognized levels, in console declaration order.
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Log,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Debug,
        LogLevel::Info,
    ];

    /// Maps a console method name to its level.
    ///
    /// Unrecognized methods (`trace`, `table`, ...) are recorded as `info`.
    pub fn from_method(method: &str) -> Self {
        match method {
            "log" => LogLevel::Log,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            "debug" | "verbose" => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }

    /// Canonical lowercase name, as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Log => "log",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The captured call: stack frames, payload and level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceObject {
    /// Stack frames at interception time; `null` when capture failed.
    #[serde(rename = "__trace__")]
    pub trace: Option<Vec<String>>,
    /// Caller-supplied arguments, or an error description when they could
    /// not be serialized.
    pub info: serde_json::Value,
    #[serde(rename = "type")]
    pub level: LogLevel,
}

/// Wall-clock and page context taken when the entry was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceDate {
    /// Milliseconds since the Unix epoch.
    pub unix: i64,
    /// Local date, `YYYY-MM-DD`.
    pub date: String,
    /// Local time, `HH:MM:SS.mmm`.
    pub time: String,
    /// Page location.
    pub uri: String,
}

/// One captured console call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub object: TraceObject,
    pub date: TraceDate,
}

/// Detail carried by the `console:save` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveEventDetail {
    /// JSON array of [`TraceEntry`] records.
    pub logs: String,
}

/// Serializes a flushed batch into the JSON array sent to sinks.
pub fn encode_batch(entries: &[TraceEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string(entries)
}

/// Parses a JSON array produced by [`encode_batch`].
pub fn decode_batch(logs: &str) -> Result<Vec<TraceEntry>, serde_json::Error> {
    serde_json::from_str(logs)
}
