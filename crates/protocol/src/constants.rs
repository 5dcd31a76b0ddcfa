/// Name of the notification dispatched on every flush.
pub const SAVE_EVENT: &str = "console:save";

/// Default buffer length that triggers an automatic flush.
pub const DEFAULT_LIMIT: usize = 300;

/// Payload of the `info` marker recorded right before an unload flush.
pub const MARKER_BEFORE_UNLOAD: &str = "beforeunload";

/// Payload of the `info` marker recorded by an explicit save.
pub const MARKER_SAVE_NOW: &str = "saveNow";

/// MIME type of exported log files.
pub const LOG_FILE_MIME: &str = "text/plain;charset=utf-8";

/// Returns the export file name for a flush happening at `unix_millis`.
pub fn log_file_name(unix_millis: i64) -> String {
    format!("log_{unix_millis}.json")
}
