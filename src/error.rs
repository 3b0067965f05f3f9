//! Error definitions shared by every store operation.

use thiserror::Error;

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input: unknown field, malformed payload, unreachable path.
    Validation,
    /// A feature is unavailable because its prerequisite is not configured.
    Precondition,
    /// The named section or tenant does not exist.
    NotFound,
    /// The backing store failed while talking to it.
    Backend,
    /// The caller cancelled the request before commit.
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Precondition => "precondition",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Backend => "backend",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while reading, updating, reloading or persisting sections.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Section name is not registered.
    #[error("section <{0}> not found")]
    SectionNotFound(String),

    /// Tenant has no live state and nothing to fall back on.
    #[error("tenant <{0}> not found")]
    TenantNotFound(String),

    /// Payload names a field the section does not have.
    #[error("unknown field <{field}> in section <{section}>")]
    UnknownField { section: String, field: String },

    /// Payload value cannot be converted to the field's type.
    #[error("field <{field}> in section <{section}>: expected {expected}, got {found}")]
    FieldType {
        section: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Merged value failed typed decoding or semantic checks.
    #[error("invalid value for section <{section}>: {reason}")]
    InvalidValue { section: String, reason: String },

    /// Raw payload could not be parsed into the partial-payload shape.
    #[error("malformed config payload: {0}")]
    MalformedPayload(String),

    /// Every section is valid on its own but the combination is not.
    #[error("inconsistent config: {0}")]
    Inconsistent(String),

    /// Reload source is empty, missing or unreadable.
    #[error("path:\"{0}\" is not reachable")]
    PathNotReachable(String),

    /// Reload source is reachable but carries no definition for the section.
    #[error("no definition for section <{section}> in \"{path}\"")]
    MissingDefinition { section: String, path: String },

    /// No backing store connection configured.
    #[error("no DB connection for config")]
    NoBackingStore,

    /// Backing store I/O failed.
    #[error("backing store error: {0}")]
    Backend(String),

    /// Request was cancelled before commit.
    #[error("request cancelled")]
    Cancelled,
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::SectionNotFound(_) | ConfigError::TenantNotFound(_) => ErrorKind::NotFound,
            ConfigError::UnknownField { .. }
            | ConfigError::FieldType { .. }
            | ConfigError::InvalidValue { .. }
            | ConfigError::MalformedPayload(_)
            | ConfigError::Inconsistent(_)
            | ConfigError::PathNotReachable(_)
            | ConfigError::MissingDefinition { .. } => ErrorKind::Validation,
            ConfigError::NoBackingStore => ErrorKind::Precondition,
            ConfigError::Backend(_) => ErrorKind::Backend,
            ConfigError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Only transient backend faults are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConfigError::Backend(_))
    }
}

/// Result type for store operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ConfigError::NoBackingStore.to_string(), "no DB connection for config");
        assert_eq!(
            ConfigError::PathNotReachable(String::new()).to_string(),
            "path:\"\" is not reachable"
        );

        let err = ConfigError::UnknownField {
            section: "general".into(),
            field: "nodeid".into(),
        };
        assert!(err.to_string().contains("nodeid"));
        assert!(err.to_string().contains("general"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ConfigError::NoBackingStore.kind(), ErrorKind::Precondition);
        assert_eq!(ConfigError::SectionNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(ConfigError::MalformedPayload("x".into()).kind(), ErrorKind::Validation);
        assert!(!ConfigError::NoBackingStore.is_retryable());
        assert!(ConfigError::Backend("timeout".into()).is_retryable());
    }
}
