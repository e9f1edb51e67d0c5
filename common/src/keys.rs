use std::fmt;

use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Bumped whenever a field is added or an id changes. Installed watch
/// firmware only understands the ids it was built against.
pub const KEY_MAP_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldName {
    Home,
    #[serde(rename = "TIMEZONE_1")]
    Timezone1,
    #[serde(rename = "TIMEZONE_2")]
    Timezone2,
    #[serde(rename = "TIMEZONE_3")]
    Timezone3,
    #[serde(rename = "TIMEZONE_4")]
    Timezone4,
    AlwaysShowHome,
    BackgroundColor,
    TimeColor,
    TimezoneLabelColor,
    HomeTimeColor,
    ShowSeconds,
    ShowHomeSeconds,
}

/// Inclusion policy class of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    TimezoneSelect,
    Toggle,
    Color,
}

impl FieldName {
    pub const ALL: [FieldName; 12] = [
        Self::Home,
        Self::Timezone1,
        Self::Timezone2,
        Self::Timezone3,
        Self::Timezone4,
        Self::AlwaysShowHome,
        Self::BackgroundColor,
        Self::TimeColor,
        Self::TimezoneLabelColor,
        Self::HomeTimeColor,
        Self::ShowSeconds,
        Self::ShowHomeSeconds,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "HOME",
            Self::Timezone1 => "TIMEZONE_1",
            Self::Timezone2 => "TIMEZONE_2",
            Self::Timezone3 => "TIMEZONE_3",
            Self::Timezone4 => "TIMEZONE_4",
            Self::AlwaysShowHome => "ALWAYS_SHOW_HOME",
            Self::BackgroundColor => "BACKGROUND_COLOR",
            Self::TimeColor => "TIME_COLOR",
            Self::TimezoneLabelColor => "TIMEZONE_LABEL_COLOR",
            Self::HomeTimeColor => "HOME_TIME_COLOR",
            Self::ShowSeconds => "SHOW_SECONDS",
            Self::ShowHomeSeconds => "SHOW_HOME_SECONDS",
        }
    }

    pub fn class(self) -> FieldClass {
        match self {
            Self::Home | Self::Timezone1 | Self::Timezone2 | Self::Timezone3 | Self::Timezone4 => {
                FieldClass::TimezoneSelect
            }
            Self::AlwaysShowHome | Self::ShowSeconds | Self::ShowHomeSeconds => FieldClass::Toggle,
            Self::BackgroundColor
            | Self::TimeColor
            | Self::TimezoneLabelColor
            | Self::HomeTimeColor => FieldClass::Color,
        }
    }

    /// Protocol key id compiled into the watch firmware.
    pub fn protocol_id(self) -> u32 {
        match self {
            Self::Home => 10000,
            Self::Timezone1 => 10001,
            Self::Timezone2 => 10002,
            Self::Timezone3 => 10003,
            Self::Timezone4 => 10004,
            Self::AlwaysShowHome => 10005,
            Self::BackgroundColor => 10006,
            Self::TimeColor => 10007,
            Self::TimezoneLabelColor => 10008,
            Self::HomeTimeColor => 10009,
            Self::ShowSeconds => 10010,
            Self::ShowHomeSeconds => 10011,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name to protocol key id mapping shared by the schema, the encoder
/// and the device bridge registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    entries: Vec<(FieldName, u32)>,
}

impl KeyMap {
    pub fn standard() -> Self {
        let mut entries: Vec<(FieldName, u32)> = FieldName::ALL
            .into_iter()
            .map(|field| (field, field.protocol_id()))
            .collect();
        entries.sort_by_key(|(_, id)| *id);
        Self { entries }
    }

    pub fn version(&self) -> u32 {
        KEY_MAP_VERSION
    }

    pub fn id(&self, field: FieldName) -> Option<u32> {
        self.entries
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, id)| *id)
    }

    pub fn name(&self, id: u32) -> Option<FieldName> {
        self.entries
            .iter()
            .find(|(_, key)| *key == id)
            .map(|(name, _)| *name)
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldName, u32)> + '_ {
        self.entries.iter().copied()
    }

    /// Hex SHA-256 over `NAME=ID` lines in id order. Two parties holding the
    /// same fingerprint agree on every name/id pair.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, id) in self.iter() {
            hasher.update(format!("{name}={id}\n").as_bytes());
        }
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    pub fn registration(&self) -> KeyMapRegistration {
        KeyMapRegistration {
            version: self.version(),
            fingerprint: self.fingerprint(),
            keys: self.clone(),
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::standard()
    }
}

impl Serialize for KeyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, id) in &self.entries {
            map.serialize_entry(name.as_str(), id)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyMapRegistration {
    pub version: u32,
    pub fingerprint: String,
    pub keys: KeyMap,
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn standard_ids_match_firmware() {
        let keys = KeyMap::standard();
        let expected = [
            ("HOME", 10000),
            ("TIMEZONE_1", 10001),
            ("TIMEZONE_2", 10002),
            ("TIMEZONE_3", 10003),
            ("TIMEZONE_4", 10004),
            ("ALWAYS_SHOW_HOME", 10005),
            ("BACKGROUND_COLOR", 10006),
            ("TIME_COLOR", 10007),
            ("TIMEZONE_LABEL_COLOR", 10008),
            ("HOME_TIME_COLOR", 10009),
            ("SHOW_SECONDS", 10010),
            ("SHOW_HOME_SECONDS", 10011),
        ];

        let actual: Vec<(&str, u32)> = keys.iter().map(|(name, id)| (name.as_str(), id)).collect();
        assert_eq!(actual, expected.to_vec());
    }

    #[test]
    fn mapping_is_bijective() {
        let keys = KeyMap::standard();
        let ids: HashSet<u32> = keys.iter().map(|(_, id)| id).collect();
        assert_eq!(ids.len(), FieldName::ALL.len());

        for field in FieldName::ALL {
            let id = keys.id(field).unwrap();
            assert_eq!(keys.name(id), Some(field));
        }
        assert_eq!(keys.name(9999), None);
    }

    #[test]
    fn serializes_as_message_key_object() {
        let json = serde_json::to_value(KeyMap::standard()).unwrap();
        assert_eq!(json["HOME"], 10000);
        assert_eq!(json["SHOW_HOME_SECONDS"], 10011);
        assert_eq!(json.as_object().unwrap().len(), 12);
    }

    #[test]
    fn field_name_serde_uses_protocol_names() {
        assert_eq!(
            serde_json::to_string(&FieldName::Timezone3).unwrap(),
            "\"TIMEZONE_3\""
        );
        assert_eq!(
            serde_json::to_string(&FieldName::TimezoneLabelColor).unwrap(),
            "\"TIMEZONE_LABEL_COLOR\""
        );
        for field in FieldName::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn fingerprint_is_stable_and_hex() {
        let a = KeyMap::standard().fingerprint();
        let b = KeyMap::standard().fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn fingerprint_changes_when_an_id_moves() {
        let standard = KeyMap::standard();
        let mut drifted = standard.clone();
        drifted.entries[0].1 = 20000;
        assert_ne!(standard.fingerprint(), drifted.fingerprint());
    }
}
