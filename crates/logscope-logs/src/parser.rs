use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use logscope_types::{ControlCommand, LogEntry, ServerMessage, WatchValue};

/// Push message that could not be decoded
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not an object with a string `type` field")]
    MissingType,

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("invalid `{kind}` payload: {reason}")]
    Payload { kind: &'static str, reason: String },
}

impl ParseError {
    fn payload(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Payload {
            kind,
            reason: reason.into(),
        }
    }
}

/// Decoder for server push messages
pub struct MessageParser;

impl MessageParser {
    /// Decode one text frame into a tagged server message
    pub fn parse(text: &str) -> Result<ServerMessage, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut obj) = value else {
            return Err(ParseError::MissingType);
        };
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingType)?
            .to_string();

        match kind.as_str() {
            "entries" => {
                let items = Self::take_payload(&mut obj, "entries")
                    .ok_or_else(|| ParseError::payload("entries", "missing entries array"))?;
                let Value::Array(items) = items else {
                    return Err(ParseError::payload("entries", "expected an array"));
                };
                Ok(ServerMessage::Entries(Self::decode_batch(items, "entry")))
            }
            "entry" => {
                let payload = Self::take_payload(&mut obj, "entry").unwrap_or(Value::Object(obj));
                let entry: LogEntry = serde_json::from_value(payload)
                    .map_err(|e| ParseError::payload("entry", e.to_string()))?;
                Ok(ServerMessage::Entry(entry))
            }
            "watch" => {
                let payload = Self::take_payload(&mut obj, "watch").unwrap_or(Value::Object(obj));
                let watch: WatchValue = serde_json::from_value(payload)
                    .map_err(|e| ParseError::payload("watch", e.to_string()))?;
                Ok(ServerMessage::Watch(watch))
            }
            "watches" => {
                let payload = Self::take_payload(&mut obj, "watches")
                    .ok_or_else(|| ParseError::payload("watches", "missing watches"))?;
                match payload {
                    Value::Array(items) => {
                        Ok(ServerMessage::Watches(Self::decode_batch(items, "watch")))
                    }
                    Value::Object(map) => Ok(ServerMessage::Watches(Self::decode_watch_map(map))),
                    _ => Err(ParseError::payload("watches", "expected an array or object")),
                }
            }
            "control" => {
                let command = obj
                    .get("command")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ParseError::payload("control", "missing command"))?;
                ControlCommand::parse(command)
                    .map(ServerMessage::Control)
                    .ok_or_else(|| {
                        ParseError::payload("control", format!("unknown command '{command}'"))
                    })
            }
            "session" => Ok(ServerMessage::Session(Value::Object(obj))),
            _ => Err(ParseError::UnknownType(kind)),
        }
    }

    /// Decode a history response: `{"entries": [...]}` or a bare array
    pub fn parse_history(text: &str) -> Result<Vec<LogEntry>, ParseError> {
        let items = match serde_json::from_str::<Value>(text)? {
            Value::Array(items) => items,
            Value::Object(mut obj) => match Self::take_payload(&mut obj, "entries") {
                Some(Value::Array(items)) => items,
                _ => return Err(ParseError::payload("history", "missing entries array")),
            },
            _ => return Err(ParseError::payload("history", "expected an object or array")),
        };
        Ok(Self::decode_batch(items, "entry"))
    }

    /// Payload under its own key, falling back to `data`
    fn take_payload(obj: &mut Map<String, Value>, key: &str) -> Option<Value> {
        obj.remove(key).or_else(|| obj.remove("data"))
    }

    /// Decode each element on its own, dropping the ones that fail
    fn decode_batch<T: DeserializeOwned>(items: Vec<Value>, kind: &'static str) -> Vec<T> {
        items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!(index, kind, error = %e, "Dropping malformed batch element");
                    None
                }
            })
            .collect()
    }

    /// Watches keyed by name: `{"cpu": {"value": 3}, "mem": "2GB"}`
    fn decode_watch_map(map: Map<String, Value>) -> Vec<WatchValue> {
        map.into_iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    Value::Object(mut fields) => {
                        fields
                            .entry("name")
                            .or_insert_with(|| Value::String(name.clone()));
                        Value::Object(fields)
                    }
                    scalar => {
                        let mut fields = Map::new();
                        fields.insert("name".to_string(), Value::String(name.clone()));
                        fields.insert("value".to_string(), scalar);
                        Value::Object(fields)
                    }
                };
                match serde_json::from_value(value) {
                    Ok(watch) => Some(watch),
                    Err(e) => {
                        warn!(watch = %name, error = %e, "Dropping malformed watch");
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logscope_types::Level;

    #[test]
    fn test_entries_batch() {
        let text = r#"{"type":"entries","entries":[
            {"id":1,"title":"a","level":"Error"},
            {"id":2,"title":"b","level":3}
        ]}"#;
        let ServerMessage::Entries(entries) = MessageParser::parse(text).unwrap() else {
            panic!("expected entries");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Level::Error);
        assert_eq!(entries[1].level, Level::Warning);
    }

    #[test]
    fn test_entries_data_alias() {
        let text = r#"{"type":"entries","data":[{"id":5,"title":"x"}]}"#;
        let msg = MessageParser::parse(text).unwrap();
        assert!(matches!(msg, ServerMessage::Entries(ref e) if e.len() == 1 && e[0].id == 5));
    }

    #[test]
    fn test_malformed_batch_element_dropped() {
        let text = r#"{"type":"entries","entries":[
            {"id":1,"title":"ok"},
            {"id":"not a number"},
            {"id":3,"title":"also ok"}
        ]}"#;
        let ServerMessage::Entries(entries) = MessageParser::parse(text).unwrap() else {
            panic!("expected entries");
        };
        let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_entry_without_id_dropped_from_batch() {
        let text = r#"{"type":"entries","entries":[
            {"title":"a"},
            {"id":2,"title":"b"},
            {"title":"c"},
            {"id":4,"title":"d"}
        ]}"#;
        let ServerMessage::Entries(entries) = MessageParser::parse(text).unwrap() else {
            panic!("expected entries");
        };
        let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 4]);

        assert!(matches!(
            MessageParser::parse(r#"{"type":"entry","title":"lonely"}"#),
            Err(ParseError::Payload { kind: "entry", .. })
        ));
    }

    #[test]
    fn test_inline_entry() {
        let text = r#"{"type":"entry","id":9,"title":"inline","sessionName":"main"}"#;
        let ServerMessage::Entry(entry) = MessageParser::parse(text).unwrap() else {
            panic!("expected entry");
        };
        assert_eq!(entry.id, 9);
        assert_eq!(entry.session_name, "main");
    }

    #[test]
    fn test_nested_watch() {
        let text = r#"{"type":"watch","watch":{"name":"cpu","value":42}}"#;
        let msg = MessageParser::parse(text).unwrap();
        assert!(matches!(msg, ServerMessage::Watch(ref w) if w.name == "cpu" && w.value == "42"));
    }

    #[test]
    fn test_watch_map() {
        let text = r#"{"type":"watches","watches":{"cpu":{"value":"3%"},"mem":"2GB"}}"#;
        let ServerMessage::Watches(mut watches) = MessageParser::parse(text).unwrap() else {
            panic!("expected watches");
        };
        watches.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(watches.len(), 2);
        assert_eq!(watches[0].name, "cpu");
        assert_eq!(watches[0].value, "3%");
        assert_eq!(watches[1].value, "2GB");
    }

    #[test]
    fn test_control_commands() {
        for (raw, expected) in [
            ("clearLog", ControlCommand::ClearLog),
            ("clearWatches", ControlCommand::ClearWatches),
            ("clearAll", ControlCommand::ClearAll),
        ] {
            let text = format!(r#"{{"type":"control","command":"{raw}"}}"#);
            assert_eq!(
                MessageParser::parse(&text).unwrap(),
                ServerMessage::Control(expected)
            );
        }

        let bad = MessageParser::parse(r#"{"type":"control","command":"reboot"}"#);
        assert!(matches!(bad, Err(ParseError::Payload { kind: "control", .. })));
    }

    #[test]
    fn test_session_passthrough() {
        let msg = MessageParser::parse(r#"{"type":"session","name":"s1"}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Session(_)));
    }

    #[test]
    fn test_history_shapes() {
        let wrapped = MessageParser::parse_history(r#"{"entries":[{"id":1},{"id":2}]}"#).unwrap();
        assert_eq!(wrapped.len(), 2);

        let bare = MessageParser::parse_history(r#"[{"id":3}]"#).unwrap();
        assert_eq!(bare[0].id, 3);

        assert!(MessageParser::parse_history(r#"{"total":0}"#).is_err());
        assert!(MessageParser::parse_history("42").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            MessageParser::parse("not json"),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            MessageParser::parse("[1,2]"),
            Err(ParseError::MissingType)
        ));
        assert!(matches!(
            MessageParser::parse(r#"{"entries":[]}"#),
            Err(ParseError::MissingType)
        ));
        assert!(matches!(
            MessageParser::parse(r#"{"type":"bogus"}"#),
            Err(ParseError::UnknownType(ref t)) if t == "bogus"
        ));
        assert!(matches!(
            MessageParser::parse(r#"{"type":"entries","entries":{}}"#),
            Err(ParseError::Payload { kind: "entries", .. })
        ));
    }
}
