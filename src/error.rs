//! Error types for annohub.

use thiserror::Error;

/// Result type for annohub operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for annohub operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A factory received a value whose shape matches none of its
    /// recognized forms (null, id string, record object).
    #[error("No factory found for {type_name} value")]
    UnresolvableShape {
        /// JSON type name of the offending value.
        type_name: &'static str,
    },

    /// Malformed scalar: timestamp, number, or enum wire code.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A serializer was asked for an id with no live record.
    #[error("Unknown {kind} id `{id}`")]
    UnknownId {
        /// Entity type name.
        kind: &'static str,
        /// The unresolved id.
        id: String,
    },

    /// Warehouse query failure. Propagates unhandled, no retry.
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] rusqlite::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unresolvable-shape error for a JSON value shape.
    #[must_use]
    pub fn shape(type_name: &'static str) -> Self {
        Error::UnresolvableShape { type_name }
    }

    /// Create a parse error.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create an unknown-id error.
    #[must_use]
    pub fn unknown_id(kind: &'static str, id: impl Into<String>) -> Self {
        Error::UnknownId {
            kind,
            id: id.into(),
        }
    }
}

/// JSON type name used in unresolvable-shape errors.
#[must_use]
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
