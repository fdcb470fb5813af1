//! Error types for credvault.

use crate::engine::ValidationFailures;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A validator definition that cannot be turned into a runnable check.
///
/// These are schema bugs, not bad user values: they abort the write that hit
/// them and must reach whoever maintains the catalog.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaConfigError {
    #[error("Validator '{validator}' references unknown implementation '{reference}'")]
    UnknownImplementation { validator: String, reference: String },

    #[error("Validator '{validator}' declares argument '{key}' more than once")]
    DuplicateArgument { validator: String, key: String },

    #[error("Validator '{validator}' ({reference}) does not accept argument '{key}'")]
    UnexpectedArgument {
        validator: String,
        reference: String,
        key: String,
    },

    #[error("Validator '{validator}' is missing required argument '{key}'")]
    MissingArgument { validator: String, key: String },

    #[error("Validator '{validator}' argument '{key}' must be {expected}, got {found}")]
    ArgumentType {
        validator: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Validator '{validator}' argument '{key}' is invalid: {reason}")]
    InvalidArgument {
        validator: String,
        key: String,
        reason: String,
    },

    #[error("Malformed argument literal {raw:?}: {reason}")]
    MalformedLiteral { raw: String, reason: String },
}

/// Specific reasons an argument key can be rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyErrorKind {
    Empty,
    TooLong { length: usize, maximum: usize },
    InvalidStart { character: char },
    InvalidCharacter { character: char, position: usize },
    ReservedWord,
}

/// Argument key rejected by the keyword validator, with position information.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValidationError {
    pub key: String,
    pub kind: KeyErrorKind,
}

impl KeyValidationError {
    pub fn new(key: &str, kind: KeyErrorKind) -> Self {
        Self {
            key: key.to_string(),
            kind,
        }
    }

    fn issue(&self) -> String {
        match &self.kind {
            KeyErrorKind::Empty => "key is empty".to_string(),
            KeyErrorKind::TooLong { length, maximum } => {
                format!("key is {length} characters long (maximum {maximum})")
            }
            KeyErrorKind::InvalidStart { character } => {
                format!("key starts with '{character}' at position 1; it must start with a letter or underscore")
            }
            KeyErrorKind::InvalidCharacter {
                character,
                position,
            } => format!("invalid character '{character}' at position {position}"),
            KeyErrorKind::ReservedWord => format!("'{}' is a reserved word", self.key),
        }
    }
}

impl fmt::Display for KeyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid argument key '{}'\n  Issue: {}\n  Expected format: letters, digits and underscores, not starting with a digit\n  Example: limit_value",
            self.key,
            self.issue()
        )
    }
}

impl std::error::Error for KeyValidationError {}

/// Main error type for vault operations.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Schema configuration error: {0}")]
    SchemaConfiguration(#[from] SchemaConfigError),

    #[error("{0}")]
    Validation(ValidationFailures),

    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    #[error("{0}")]
    InvalidArgumentKey(#[from] KeyValidationError),

    #[error("Group '{group}' cannot be placed under '{parent}': it would become its own ancestor")]
    GroupCycle { group: String, parent: String },

    #[error("Field '{field}' is not declared by template '{template}'")]
    UndeclaredField { template: String, field: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("{kind} name '{name}' is ambiguous ({count} matches)")]
    Ambiguous {
        kind: &'static str,
        name: String,
        count: usize,
    },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl VaultError {
    pub fn not_found(kind: &'static str, name: impl fmt::Display) -> Self {
        VaultError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    /// Structured failures when this is a rejected value, `None` otherwise.
    pub fn validation_failures(&self) -> Option<&ValidationFailures> {
        match self {
            VaultError::Validation(failures) => Some(failures),
            _ => None,
        }
    }

    pub fn is_schema_configuration(&self) -> bool {
        matches!(self, VaultError::SchemaConfiguration(_))
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_error_message_carries_position() {
        let err = KeyValidationError::new(
            "limit-value",
            KeyErrorKind::InvalidCharacter {
                character: '-',
                position: 6,
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("Invalid argument key 'limit-value'"));
        assert!(msg.contains("position 6"));
        assert!(msg.contains("Example:"));
    }

    #[test]
    fn test_schema_error_converts_into_vault_error() {
        let err: VaultError = SchemaConfigError::UnknownImplementation {
            validator: "Broken".to_string(),
            reference: "nowhere.Missing".to_string(),
        }
        .into();
        assert!(err.is_schema_configuration());
        assert!(err.validation_failures().is_none());
        assert!(err.to_string().contains("nowhere.Missing"));
    }
}
