//! Turns an intercepted call into a [`TraceEntry`].
//!
//! Recording never fails: an unserializable payload is replaced by an error
//! description and a failed backtrace capture becomes a `null` trace.

use std::backtrace::{Backtrace, BacktraceStatus};

use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use tracerlog_protocol::{LogLevel, TraceDate, TraceEntry, TraceObject};

/// Builds the entry for one call.
///
/// Call site and timestamp are taken now, on the caller's stack.
pub fn record<T>(level: LogLevel, payload: &T, location: &str, capture_call_site: bool) -> TraceEntry
where
    T: Serialize + ?Sized,
{
    let trace = if capture_call_site {
        capture_call_site_frames()
    } else {
        None
    };

    TraceEntry {
        level,
        object: TraceObject {
            trace,
            info: serialize_payload(level, payload),
            level,
        },
        date: get_time(location),
    }
}

/// Serializes the payload, substituting an error description on failure.
pub fn serialize_payload<T>(level: LogLevel, payload: &T) -> Value
where
    T: Serialize + ?Sized,
{
    serde_json::to_value(payload).unwrap_or_else(|e| {
        Value::String(format!("{level} payload could not be serialized: {e}"))
    })
}

/// Captures the current stack as one string per frame.
pub fn capture_call_site_frames() -> Option<Vec<String>> {
    let backtrace = Backtrace::force_capture();
    match backtrace.status() {
        BacktraceStatus::Captured => {
            let frames = split_frames(&backtrace.to_string());
            (!frames.is_empty()).then_some(frames)
        }
        _ => None,
    }
}

/// Splits a rendered backtrace into frames, folding each `at file:line` line
/// into the frame above it.
fn split_frames(rendered: &str) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();

    for line in rendered.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(location) = line.strip_prefix("at ")
            && let Some(frame) = frames.last_mut()
        {
            frame.push_str(" at ");
            frame.push_str(location);
            continue;
        }

        let symbol = match line.split_once(": ") {
            Some((index, symbol)) if index.chars().all(|c| c.is_ascii_digit()) => symbol,
            _ => line,
        };
        frames.push(symbol.to_owned());
    }

    frames
}

/// Reads the local wall clock and the page location.
pub fn get_time(location: &str) -> TraceDate {
    let now = Local::now();
    TraceDate {
        unix: now.timestamp_millis(),
        date: now.format("%Y-%m-%d").to_string(),
        time: now.format("%H:%M:%S%.3f").to_string(),
        uri: normalize_location(location),
    }
}

/// Normalizes the location as a URL, or keeps it verbatim if it is not one.
fn normalize_location(location: &str) -> String {
    url::Url::parse(location)
        .map(String::from)
        .unwrap_or_else(|_| location.to_owned())
}

#[cfg(test)]
mod tests {
    use serde::ser::Error as _;

    use super::*;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cyclic structure"))
        }
    }

    #[test]
    fn record_keeps_payload_and_level() {
        let entry = record(LogLevel::Warn, &["c"], "https://example.com", false);
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.object.level, LogLevel::Warn);
        assert_eq!(entry.object.info, serde_json::json!(["c"]));
        assert!(entry.object.trace.is_none());
        assert_eq!(entry.date.uri, "https://example.com/");
    }

    #[test]
    fn unserializable_payload_becomes_description() {
        let entry = record(LogLevel::Log, &Unserializable, "about:blank", false);
        let info = entry.object.info.as_str().unwrap();
        assert!(info.starts_with("log payload could not be serialized"));
        assert!(info.contains("cyclic structure"));
    }

    #[test]
    fn call_site_follows_backtrace_support() {
        let supported = Backtrace::force_capture().status() == BacktraceStatus::Captured;
        let entry = record(LogLevel::Info, "x", "about:blank", true);

        match entry.object.trace {
            Some(frames) => {
                assert!(supported);
                assert!(!frames.is_empty());
                assert!(frames.iter().all(|f| !f.is_empty()));
            }
            None => assert!(!supported),
        }
    }

    #[test]
    fn call_site_disabled_is_null() {
        let entry = record(LogLevel::Info, "x", "about:blank", false);
        assert!(entry.object.trace.is_none());
    }

    #[test]
    fn split_frames_folds_locations() {
        let rendered = "   0: app::main\n             at ./src/main.rs:4:5\n   1: std::rt::lang_start\n";
        assert_eq!(
            split_frames(rendered),
            vec!["app::main at ./src/main.rs:4:5", "std::rt::lang_start"]
        );
    }

    #[test]
    fn time_fields_have_fixed_width() {
        let date = get_time("https://example.com/page?q=1");
        assert!(date.unix > 0);
        assert_eq!(date.date.len(), "YYYY-MM-DD".len());
        assert_eq!(date.time.len(), "HH:MM:SS.mmm".len());
        assert_eq!(&date.time[8..9], ".");
        assert_eq!(date.uri, "https://example.com/page?q=1");
    }

    #[test]
    fn non_url_location_is_kept() {
        assert_eq!(normalize_location("headless"), "headless");
    }
}
