use std::fmt;

use serde::{Deserialize, Serialize};

/// A `0xRRGGBB` color packed into the integer the firmware stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackedColor(pub u32);

impl PackedColor {
    pub const BLACK: PackedColor = PackedColor(0x000000);
    pub const WHITE: PackedColor = PackedColor(0xFFFFFF);
    pub const LIGHT_GRAY: PackedColor = PackedColor(0xAAAAAA);

    /// Accepts `RRGGBB`, `#RRGGBB` or `0xRRGGBB`.
    pub fn from_hex(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() || digits.len() > 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self)
    }

    pub fn to_hex(self) -> String {
        format!("{:06X}", self.0 & 0xFF_FFFF)
    }
}

impl fmt::Display for PackedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}
