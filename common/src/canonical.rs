//! Canonical timezone dataset: the compact, deduplicated list the catalog
//! mapper reads.

use std::{collections::HashSet, fs, path::Path};

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, TZ_VARIANTS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{catalog::TimezoneRecord, error::CatalogError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTimezone {
    pub identifier: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub abbr: String,
    #[serde(default)]
    pub offset_str: String,
    #[serde(default)]
    pub offset_minutes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl From<&CanonicalTimezone> for TimezoneRecord {
    fn from(entry: &CanonicalTimezone) -> Self {
        TimezoneRecord::new(entry.identifier.clone(), entry.offset_str.clone())
    }
}

/// One entry of an upstream timezone export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTimezoneEntry {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub abbreviation_sdt: Option<String>,
    #[serde(default)]
    pub abbreviation_dst: Option<String>,
    #[serde(default)]
    pub offset_sdt: Option<String>,
    #[serde(default)]
    pub offset_dst: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
}

/// Deduplicates an upstream export by identifier (first wins), prefers
/// standard-time abbreviation and offset, and sorts by identifier.
pub fn compact(entries: &[RawTimezoneEntry]) -> Vec<CanonicalTimezone> {
    let mut seen = HashSet::new();
    let mut compacted = Vec::new();

    for entry in entries {
        let Some(identifier) = non_empty(&entry.identifier) else {
            continue;
        };
        if !seen.insert(identifier.to_string()) {
            continue;
        }

        let offset_str = non_empty(&entry.offset_sdt)
            .or_else(|| non_empty(&entry.offset_dst))
            .unwrap_or_default()
            .to_string();

        compacted.push(CanonicalTimezone {
            identifier: identifier.to_string(),
            display_name: entry.display_name.clone().unwrap_or_default(),
            abbr: non_empty(&entry.abbreviation_sdt)
                .or_else(|| non_empty(&entry.abbreviation_dst))
                .unwrap_or_default()
                .to_string(),
            offset_minutes: parse_offset_minutes(&offset_str),
            offset_str,
            id: entry.id.as_ref().and_then(Value::as_i64),
        });
    }

    compacted.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    compacted
}

/// `"+05:30"` → 330, `"-03"` → -180. Anything unparseable is 0.
pub fn parse_offset_minutes(offset: &str) -> i32 {
    let trimmed = offset.trim();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        Some(_) => (1, trimmed),
        None => return 0,
    };

    let mut parts = rest.split(':');
    let hours = parts.next().and_then(|h| h.trim().parse::<i32>().ok());
    let minutes = match parts.next() {
        Some(m) => m.trim().parse::<i32>().ok(),
        None => Some(0),
    };

    match (hours, minutes) {
        (Some(h), Some(m)) => h
            .checked_mul(60)
            .and_then(|total| total.checked_add(m))
            .and_then(|total| total.checked_mul(sign))
            .unwrap_or(0),
        _ => 0,
    }
}

pub fn format_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}

/// Builds the dataset from the bundled IANA database, using each zone's
/// standard offset in effect at `instant`.
pub fn from_tz_database(instant: DateTime<Utc>) -> Vec<CanonicalTimezone> {
    let mut zones: Vec<CanonicalTimezone> = TZ_VARIANTS
        .iter()
        .map(|tz| {
            let offset = tz.offset_from_utc_datetime(&instant.naive_utc());
            let total = offset.fix().local_minus_utc() / 60;
            let standard = i32::try_from(offset.base_utc_offset().num_minutes()).unwrap_or(total);
            let local = instant.with_timezone(tz);

            CanonicalTimezone {
                identifier: tz.name().to_string(),
                display_name: tz.name().replace('_', " "),
                abbr: local.format("%Z").to_string(),
                offset_str: format_offset(standard),
                offset_minutes: standard,
                id: None,
            }
        })
        .collect();

    zones.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    zones
}

pub fn parse_records(json: &str) -> Result<Vec<TimezoneRecord>, CatalogError> {
    Ok(serde_json::from_str(json)?)
}

/// Reads a canonical dataset file written by the catalog tool.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<TimezoneRecord>, CatalogError> {
    parse_records(&fs::read_to_string(path)?)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}
