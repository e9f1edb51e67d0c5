use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{
    color::PackedColor,
    error::EncodeError,
    keys::{FieldClass, FieldName, KeyMap},
    settings::RawSettings,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageValue {
    Text(String),
    Flag(u8),
    Color(PackedColor),
}

/// Outbound message keyed by symbolic field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OutboundMessage(BTreeMap<FieldName, MessageValue>);

impl OutboundMessage {
    pub fn get(&self, field: FieldName) -> Option<&MessageValue> {
        self.0.get(&field)
    }

    pub fn contains(&self, field: FieldName) -> bool {
        self.0.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &MessageValue)> {
        self.0.iter().map(|(field, value)| (*field, value))
    }

    /// Substitutes protocol ids for field names, the shape the watch reads.
    /// Fields unknown to `keys` are dropped.
    pub fn to_app_message(&self, keys: &KeyMap) -> BTreeMap<u32, MessageValue> {
        self.iter()
            .filter_map(|(field, value)| keys.id(field).map(|id| (id, value.clone())))
            .collect()
    }

    fn insert(&mut self, field: FieldName, value: MessageValue) {
        self.0.insert(field, value);
    }
}

/// Builds the outbound message from configurator values.
///
/// Timezone selects are sent only when non-empty; the firmware reads a
/// missing slot as "unassigned". Toggles are sent as 0/1 whenever present
/// so an explicit `false` overwrites the stored flag. Colors are sent
/// whenever present and non-null, including a zero color.
pub fn encode(raw: &RawSettings, keys: &KeyMap) -> Result<OutboundMessage, EncodeError> {
    let mut message = OutboundMessage::default();

    for (field, id) in keys.iter() {
        let value = raw.get(id);
        let encoded = match field.class() {
            FieldClass::TimezoneSelect => encode_timezone(field, value)?,
            FieldClass::Toggle => value.map(|value| MessageValue::Flag(u8::from(is_truthy(value)))),
            FieldClass::Color => encode_color(field, value)?,
        };

        if let Some(encoded) = encoded {
            message.insert(field, encoded);
        }
    }

    Ok(message)
}

fn encode_timezone(
    field: FieldName,
    value: Option<&Value>,
) -> Result<Option<MessageValue>, EncodeError> {
    match value {
        None => Ok(None),
        Some(value) if !is_truthy(value) => Ok(None),
        Some(Value::String(identifier)) => Ok(Some(MessageValue::Text(identifier.clone()))),
        Some(other) => Err(EncodeError::InvalidTimezone {
            field,
            value: other.clone(),
        }),
    }
}

fn encode_color(
    field: FieldName,
    value: Option<&Value>,
) -> Result<Option<MessageValue>, EncodeError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    let packed = match value {
        Value::Number(number) => number
            .as_u64()
            .and_then(|raw| u32::try_from(raw).ok())
            .map(PackedColor),
        Value::String(hex) => PackedColor::from_hex(hex),
        _ => None,
    };

    packed
        .map(|color| Some(MessageValue::Color(color)))
        .ok_or_else(|| EncodeError::InvalidColor {
            field,
            value: value.clone(),
        })
}

// Mirrors the configurator's loose boolean semantics.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
