fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tracerlog_protocol::{LogLevel, SaveEventDetail, TraceEntry, decode_batch};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values.
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  Rust:    {reserialized}"
        );
        parsed
    }

    /// Collects object keys in serialization order.
    fn keys(value: &serde_json::Value) -> Vec<&str> {
        value
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn fixture_trace_entry() {
        let entry = roundtrip_test::<TraceEntry>("trace_entry.json");
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.object.trace.as_ref().map(Vec::len), Some(3));
        assert_eq!(entry.date.uri, "https://example.com/dashboard?tab=storage");
    }

    #[test]
    fn fixture_trace_entry_without_trace() {
        let entry = roundtrip_test::<TraceEntry>("trace_entry_no_trace.json");
        assert!(entry.object.trace.is_none());
        assert_eq!(entry.object.info, "beforeunload");
    }

    #[test]
    fn fixture_save_event_detail() {
        let detail = roundtrip_test::<SaveEventDetail>("save_event_detail.json");
        let entries = decode_batch(&detail.logs).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].object.info, "saveNow");
    }

    #[test]
    fn fixture_batch() {
        let entries = roundtrip_test::<Vec<TraceEntry>>("batch.json");
        let levels: Vec<LogLevel> = entries.iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Log, LogLevel::Error, LogLevel::Debug]);
    }

    #[test]
    fn field_order_matches_browser_output() {
        let fixture = load_fixture("trace_entry.json");
        let entry: TraceEntry = serde_json::from_value(fixture).unwrap();
        let json = serde_json::to_string(&entry).unwrap();

        // Compare key order on the serialized text, not on a parsed map.
        let type_pos = json.find(r#""type""#).unwrap();
        let object_pos = json.find(r#""object""#).unwrap();
        let date_pos = json.find(r#""date":{"#).unwrap();
        assert!(type_pos < object_pos && object_pos < date_pos);

        let trace_pos = json.find(r#""__trace__""#).unwrap();
        let info_pos = json.find(r#""info""#).unwrap();
        assert!(trace_pos < info_pos);

        let unix_pos = json.find(r#""unix""#).unwrap();
        let time_pos = json.find(r#""time""#).unwrap();
        let uri_pos = json.find(r#""uri""#).unwrap();
        assert!(unix_pos < time_pos && time_pos < uri_pos);
    }

    #[test]
    fn no_extra_fields() {
        let fixture = load_fixture("trace_entry.json");
        let entry: TraceEntry = serde_json::from_value(fixture).unwrap();
        let value = serde_json::to_value(&entry).unwrap();

        let mut top = keys(&value);
        top.sort_unstable();
        assert_eq!(top, vec!["date", "object", "type"]);

        let mut object = keys(&value["object"]);
        object.sort_unstable();
        assert_eq!(object, vec!["__trace__", "info", "type"]);

        let mut date = keys(&value["date"]);
        date.sort_unstable();
        assert_eq!(date, vec!["date", "time", "unix", "uri"]);
    }
}
