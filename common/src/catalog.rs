use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// One entry of the canonical timezone dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneRecord {
    pub identifier: String,
    #[serde(rename = "offset_str", default)]
    pub offset_label: String,
}

impl TimezoneRecord {
    pub fn new(identifier: impl Into<String>, offset_label: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            offset_label: offset_label.into(),
        }
    }

    /// Records without a GMT offset are never shown to the user.
    pub fn is_presentable(&self) -> bool {
        !self.offset_label.is_empty()
    }
}

/// A selectable option as understood by the configurator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneOption {
    pub label: String,
    pub value: String,
}

impl TimezoneOption {
    /// The always-available "unset" choice.
    pub fn none() -> Self {
        Self {
            label: "None".to_string(),
            value: String::new(),
        }
    }
}

impl From<&TimezoneRecord> for TimezoneOption {
    fn from(record: &TimezoneRecord) -> Self {
        Self {
            label: format!("{} (GMT {})", record.identifier, record.offset_label),
            value: record.identifier.clone(),
        }
    }
}

/// Filters out records without an offset and maps the rest to options,
/// preserving input order.
pub fn map_catalog(records: &[TimezoneRecord]) -> Vec<TimezoneOption> {
    records
        .iter()
        .filter(|record| record.is_presentable())
        .map(TimezoneOption::from)
        .collect()
}

/// Opt-in alphabetical ordering by value. Changes the order options appear
/// in every select, so callers enable it explicitly.
pub fn sort_catalog(options: &mut [TimezoneOption]) {
    options.sort_by(|a, b| natural_cmp(&a.value, &b.value));
}

// Case-insensitive, digit runs compared numerically ("Etc/GMT+2" < "Etc/GMT+10").
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_num = take_number(&mut left);
                let r_num = take_number(&mut right);
                match l_num.cmp(&r_num) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            (Some(l), Some(r)) => {
                match l.to_lowercase().cmp(r.to_lowercase()) {
                    Ordering::Equal => {}
                    other => return other,
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u64 {
    let mut value: u64 = 0;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(u64::from(digit));
        chars.next();
    }
    value
}
