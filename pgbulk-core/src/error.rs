/// Structured error types for pgbulk-core.
///
/// Uses `thiserror` so the PostgreSQL layer can wrap these without losing
/// the variant. Everything here is raised before or while encoding rows;
/// none of it involves a live connection.
use thiserror::Error;

use crate::wire::WireType;

/// Main error type for pgbulk-core operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Entity shape cannot be used for the requested operation
    #[error("Invalid entity '{entity}': {reason}")]
    InvalidEntity { entity: String, reason: String },

    /// A declared field has a Rust type with no wire-type mapping
    #[error("Unsupported type {type_name} for field '{field}' of entity '{entity}'")]
    UnsupportedType {
        entity: String,
        field: String,
        type_name: &'static str,
    },

    /// A row could not be encoded for the binary COPY stream
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Failure while turning a row of values into binary COPY bytes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("row has {found} values but {expected} columns were mapped")]
    ArityMismatch { expected: usize, found: usize },

    #[error("column '{column}' expects {expected} but got {found}")]
    ValueMismatch {
        column: String,
        expected: WireType,
        found: WireType,
    },

    #[error("column '{column}' is not nullable")]
    NullViolation { column: String },

    #[error("timestamp for column '{column}' is out of range")]
    TimestampOutOfRange { column: String },

    #[error("value for column '{column}' exceeds the maximum field length")]
    FieldTooLarge { column: String },
}

/// Result type alias for pgbulk-core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid entity error
    pub fn invalid_entity(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEntity {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported type error
    pub fn unsupported_type(
        entity: impl Into<String>,
        field: impl Into<String>,
        type_name: &'static str,
    ) -> Self {
        Self::UnsupportedType {
            entity: entity.into(),
            field: field.into(),
            type_name,
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_entity("Customer", "no key column");
        assert_eq!(err.to_string(), "Invalid entity 'Customer': no key column");

        let err = Error::unsupported_type("Customer", "tags", "alloc::vec::Vec<u8>");
        assert!(err.to_string().contains("Unsupported type"));
        assert!(err.to_string().contains("'tags'"));
    }

    #[test]
    fn test_encode_error_conversion() {
        let encode = EncodeError::ValueMismatch {
            column: "age".to_string(),
            expected: WireType::Integer,
            found: WireType::Text,
        };
        let err: Error = encode.into();

        assert!(matches!(err, Error::Encode(EncodeError::ValueMismatch { .. })));
        assert_eq!(
            err.to_string(),
            "Encode error: column 'age' expects integer but got text"
        );
    }
}
