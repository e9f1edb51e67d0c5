use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// Values returned by the configurator, keyed by stringified protocol id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSettings(BTreeMap<String, Value>);

impl RawSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, value: impl Into<Value>) {
        self.0.insert(id.to_string(), value.into());
    }

    pub fn with(mut self, id: u32, value: impl Into<Value>) -> Self {
        self.insert(id, value);
        self
    }

    /// `None` when the key is absent. A present JSON `null` is `Some(Null)`.
    pub fn get(&self, id: u32) -> Option<&Value> {
        self.0.get(&id.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_object(object: serde_json::Map<String, Value>) -> Self {
        let entries = object
            .into_iter()
            .map(|(key, value)| (key, unwrap_stored_value(value)))
            .collect();
        Self(entries)
    }
}

/// Decodes the payload of a "form closed" event.
///
/// `None` or an empty payload means the user dismissed the form; nothing
/// downstream should run.
pub fn decode(response: Option<&str>) -> Result<Option<RawSettings>, DecodeError> {
    let Some(response) = response.filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    let trimmed = response.trim_start();
    let json = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        percent_decode(response)?
    };

    match serde_json::from_str::<Value>(&json)? {
        Value::Object(object) => Ok(Some(RawSettings::from_object(object))),
        _ => Err(DecodeError::NotAnObject),
    }
}

// The configurator stores each field as `{"value": ...}` before flattening;
// accept either shape.
fn unwrap_stored_value(value: Value) -> Value {
    match value {
        Value::Object(mut object) if object.contains_key("value") => {
            object.remove("value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn percent_decode(input: &str) -> Result<String, DecodeError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'%' {
            let high = bytes.get(index + 1).and_then(|b| hex_digit(*b));
            let low = bytes.get(index + 2).and_then(|b| hex_digit(*b));
            let (Some(high), Some(low)) = (high, low) else {
                return Err(DecodeError::Encoding(index));
            };
            out.push(high << 4 | low);
            index += 3;
        } else {
            out.push(bytes[index]);
            index += 1;
        }
    }

    String::from_utf8(out).map_err(|err| DecodeError::Encoding(err.utf8_error().valid_up_to()))
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_response_short_circuits() {
        assert!(decode(None).unwrap().is_none());
        assert!(decode(Some("")).unwrap().is_none());
    }

    #[test]
    fn decodes_plain_json_object() {
        let raw = decode(Some(r#"{"10000":"Europe/London","10005":false,"10006":0}"#))
            .unwrap()
            .unwrap();

        assert_eq!(raw.len(), 3);
        assert_eq!(raw.get(10000), Some(&json!("Europe/London")));
        assert_eq!(raw.get(10005), Some(&json!(false)));
        assert_eq!(raw.get(10006), Some(&json!(0)));
        assert_eq!(raw.get(10001), None);
    }

    #[test]
    fn decodes_percent_encoded_payload() {
        let encoded = "%7B%2210000%22%3A%22America%2FS%C3%A3o_Paulo%22%2C%2210010%22%3Atrue%7D";
        let raw = decode(Some(encoded)).unwrap().unwrap();

        assert_eq!(raw.get(10000), Some(&json!("America/São_Paulo")));
        assert_eq!(raw.get(10010), Some(&json!(true)));
    }

    #[test]
    fn unwraps_stored_value_objects() {
        let raw = decode(Some(r#"{"10007":{"value":16777215},"10008":{"value":null}}"#))
            .unwrap()
            .unwrap();

        assert_eq!(raw.get(10007), Some(&json!(16777215)));
        assert_eq!(raw.get(10008), Some(&Value::Null));
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(matches!(decode(Some("[1,2]")), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode(Some("{not json")), Err(DecodeError::Json(_))));
        assert!(matches!(decode(Some("%7B%2")), Err(DecodeError::Encoding(3))));
    }

    #[test]
    fn builder_round_trips_ids_as_strings() {
        let raw = RawSettings::new().with(10000, "Asia/Tokyo").with(10005, true);
        let json = serde_json::to_value(&raw).unwrap();

        assert_eq!(json, json!({"10000": "Asia/Tokyo", "10005": true}));
    }
}
