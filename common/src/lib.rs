pub mod canonical;
pub mod catalog;
pub mod color;
pub mod config;
pub mod error;
pub mod keys;
pub mod message;
pub mod schema;
pub mod settings;
pub mod topics;
pub mod transport;

pub use canonical::{compact, from_tz_database, CanonicalTimezone, RawTimezoneEntry};
pub use catalog::{map_catalog, sort_catalog, TimezoneOption, TimezoneRecord};
pub use color::PackedColor;
pub use config::{BridgeNetworkConfig, CompanionConfig};
pub use error::{CatalogError, DecodeError, EncodeError, TransportError};
pub use keys::{FieldClass, FieldName, KeyMap, KeyMapRegistration, KEY_MAP_VERSION};
pub use message::{encode, MessageValue, OutboundMessage};
pub use schema::{build_schema, ConfigSchema, Field, FieldDefault, FieldKind, Section, SectionLayout};
pub use settings::{decode, RawSettings};
pub use topics::*;
pub use transport::{DeliveryOutcome, DeviceBridge};
