use thiserror::Error;

use crate::keys::FieldName;

/// The configurator handed back something that is not a settings object.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("configurator response is not a JSON object")]
    NotAnObject,
    #[error("configurator response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed percent-encoding at byte {0}")]
    Encoding(usize),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{field} is neither a packed color nor a hex string: {value}")]
    InvalidColor {
        field: FieldName,
        value: serde_json::Value,
    },
    #[error("{field} is not a timezone identifier: {value}")]
    InvalidTimezone {
        field: FieldName,
        value: serde_json::Value,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device bridge unavailable: {0}")]
    Unavailable(String),
    #[error("device rejected message: {0}")]
    Rejected(String),
    #[error("failed to serialize outbound message: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read timezone dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("timezone dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
