//! Error types, exit codes and non-fatal degradations for Vaultport.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes returned by the `vaultport` binary.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const OBJECT_NOT_FOUND: i32 = 2;
    pub const INVALID_BUNDLE: i32 = 3;
    pub const CONFIG_ERROR: i32 = 4;
}

/// Fatal errors. Only the outer shell (bundle loading, config, output)
/// produces these; value resolution and query compilation never fail.
#[derive(Error, Debug)]
pub enum VaultportError {
    #[error("Object not found in bundle: {0}")]
    ObjectNotFound(String),

    #[error("Invalid bundle {path}: {message}")]
    InvalidBundle { path: PathBuf, message: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

impl VaultportError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            VaultportError::ObjectNotFound(_) => exit_code::OBJECT_NOT_FOUND,
            VaultportError::InvalidBundle { .. } => exit_code::INVALID_BUNDLE,
            VaultportError::ConfigError(_) | VaultportError::TomlParse(_) => {
                exit_code::CONFIG_ERROR
            }
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

/// Result type alias for Vaultport operations.
pub type Result<T> = std::result::Result<T, VaultportError>;

/// A recoverable problem met while resolving values or compiling views.
///
/// The core degrades instead of failing: an unresolved id stays visible as
/// a literal, a malformed filter node is skipped while its siblings still
/// compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    #[error("unresolved reference '{id}' in property '{key}'")]
    UnresolvedReference { key: String, id: String },

    #[error("unparseable {expected} value in property '{key}': {value}")]
    UnparseableValue {
        key: String,
        expected: &'static str,
        value: String,
    },

    #[error("property '{key}' cannot be addressed in a filter")]
    UnaddressableProperty { key: String },

    #[error("malformed view spec: {reason}")]
    MalformedViewSpec { reason: String },
}

impl Degradation {
    /// Log the degradation. Never interrupts the caller.
    pub fn emit(self) {
        match &self {
            Degradation::UnresolvedReference { key, id } => {
                tracing::debug!(%key, %id, "{}", self);
            }
            Degradation::UnparseableValue { key, value, .. } => {
                tracing::debug!(%key, %value, "{}", self);
            }
            Degradation::UnaddressableProperty { key } => {
                tracing::debug!(%key, "{}", self);
            }
            Degradation::MalformedViewSpec { .. } => {
                tracing::debug!("{}", self);
            }
        }
    }
}

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GeneralError,
    ObjectNotFound,
    InvalidBundle,
    ConfigError,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::GeneralError => exit_code::GENERAL_ERROR,
            ExitCode::ObjectNotFound => exit_code::OBJECT_NOT_FOUND,
            ExitCode::InvalidBundle => exit_code::INVALID_BUNDLE,
            ExitCode::ConfigError => exit_code::CONFIG_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            VaultportError::ObjectNotFound("x".into()).exit_code(),
            exit_code::OBJECT_NOT_FOUND
        );
        assert_eq!(
            VaultportError::ConfigError("bad".into()).exit_code(),
            exit_code::CONFIG_ERROR
        );
        assert_eq!(
            VaultportError::Other("boom".into()).exit_code(),
            exit_code::GENERAL_ERROR
        );
        assert_eq!(ExitCode::InvalidBundle.code(), 3);
    }

    #[test]
    fn test_degradation_display() {
        let d = Degradation::UnresolvedReference {
            key: "assignee".into(),
            id: "bafyabc".into(),
        };
        assert_eq!(
            d.to_string(),
            "unresolved reference 'bafyabc' in property 'assignee'"
        );
    }
}
