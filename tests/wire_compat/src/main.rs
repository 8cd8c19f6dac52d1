fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use courier_protocol::{
        ErrorKind, StartRequest, StatusEvent, StatusMessage, TransferKind,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str)
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
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  encoded: {reserialized}"
        );
    }

    /// Decodes a status fixture into an event, encodes it again and compares
    /// the JSON values (order-independent).
    fn status_roundtrip(name: &str) -> StatusEvent {
        let fixture = load_fixture(name);
        let event = StatusMessage::decode(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to decode {name}: {e}"));
        let encoded = StatusMessage::encode(&event)
            .unwrap_or_else(|e| panic!("failed to encode {name}: {e}"));
        let reparsed: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            fixture, reparsed,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  encoded: {reparsed}"
        );
        event
    }

    #[test]
    fn fixture_status_messages_raw() {
        for name in [
            "status_in_progress.json",
            "status_completed.json",
            "status_completed_no_message.json",
            "status_error.json",
        ] {
            roundtrip_test::<StatusMessage>(name);
        }
    }

    #[test]
    fn fixture_status_in_progress() {
        let event = status_roundtrip("status_in_progress.json");
        assert_eq!(
            event,
            StatusEvent::InProgress {
                upload_id: "u1".into(),
                percentage: 42,
                uploaded_bytes: 420_000,
                total_bytes: 1_000_000,
            }
        );
    }

    #[test]
    fn fixture_status_completed() {
        let event = status_roundtrip("status_completed.json");
        assert_eq!(
            event,
            StatusEvent::Completed {
                upload_id: "u1".into(),
                response_code: 201,
                response_message: "Created".into(),
            }
        );
    }

    #[test]
    fn fixture_status_error() {
        match status_roundtrip("status_error.json") {
            StatusEvent::Error { upload_id, cause } => {
                assert_eq!(upload_id, "u1");
                assert_eq!(cause.kind, ErrorKind::Network);
                assert_eq!(cause.message, "connection reset by peer");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn missing_response_message_decodes_empty() {
        let event = StatusMessage::decode(&read_fixture("status_completed_no_message.json")).unwrap();
        assert_eq!(
            event,
            StatusEvent::Completed {
                upload_id: "u1".into(),
                response_code: 204,
                response_message: String::new(),
            }
        );
        // The empty message is written out explicitly.
        let encoded: serde_json::Value =
            serde_json::from_str(&StatusMessage::encode(&event).unwrap()).unwrap();
        assert_eq!(encoded["serverResponseMessage"], "");
    }

    #[test]
    fn status_codes_are_stable() {
        for (name, code) in [
            ("status_in_progress.json", 1),
            ("status_completed.json", 2),
            ("status_error.json", 3),
        ] {
            assert_eq!(load_fixture(name)["status"], code, "{name}");
        }
    }

    #[test]
    fn fixture_start_request() {
        let fixture = load_fixture("start_request.json");
        let request: StartRequest = serde_json::from_value(fixture).unwrap();
        assert_eq!(request.upload_id, "u1");
        assert_eq!(request.kind().unwrap(), TransferKind::Multipart);
        assert_eq!(request.task_config["files"][1], "/data/b.jpg");
        roundtrip_test::<StartRequest>("start_request.json");
    }
}
