//! Error types for mapping storage and parsing.

use std::path::PathBuf;
use thiserror::Error;

use crate::kind::MappingKind;

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Trait implemented by every rigbake error enum so callers can report a
/// stable code alongside the message.
pub trait CodedError: std::error::Error {
    /// Returns the stable error code (e.g., "MAPPING_001").
    fn code(&self) -> &'static str;

    /// Returns the error category (e.g., "mapping").
    fn category(&self) -> &'static str;
}

/// Errors that can occur while loading, parsing, or saving mappings.
#[derive(Debug, Error)]
pub enum MappingError {
    /// No mapping file exists for the requested name and kind.
    #[error("Mapping '{name}' ({kind}) not found at {path}")]
    NotFound {
        name: String,
        kind: MappingKind,
        path: PathBuf,
    },

    /// Failed to read a mapping file.
    #[error("Failed to read mapping file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a mapping file.
    #[error("Failed to write mapping file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The mapping file is not a JSON object of name -> slot id.
    #[error("Failed to parse mapping file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize a mapping.
    #[error("Failed to serialize mapping: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// Failed to scan the mappings directory.
    #[error("Failed to scan mappings directory {path}: {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Mapping name is empty or contains a path separator.
    #[error("Invalid mapping name '{name}'")]
    InvalidName { name: String },

    /// Unknown mapping kind suffix.
    #[error("Unknown mapping kind '{kind}'. Expected one of: sk, cr")]
    UnknownKind { kind: String },
}

impl MappingError {
    /// Creates a new invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Returns true if this error means the mapping simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MappingError::NotFound { .. })
    }
}

impl CodedError for MappingError {
    fn code(&self) -> &'static str {
        match self {
            MappingError::NotFound { .. } => "MAPPING_001",
            MappingError::ReadFailed { .. } => "MAPPING_002",
            MappingError::WriteFailed { .. } => "MAPPING_003",
            MappingError::ParseFailed { .. } => "MAPPING_004",
            MappingError::SerializeFailed(_) => "MAPPING_005",
            MappingError::ScanFailed { .. } => "MAPPING_006",
            MappingError::InvalidName { .. } => "MAPPING_007",
            MappingError::UnknownKind { .. } => "MAPPING_008",
        }
    }

    fn category(&self) -> &'static str {
        "mapping"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_names_file() {
        let err = MappingError::NotFound {
            name: "iPi".to_string(),
            kind: MappingKind::Skeleton,
            path: PathBuf::from("mappings/iPi.sk.json"),
        };
        assert!(err.to_string().contains("iPi.sk.json"));
        assert!(err.is_not_found());
        assert_eq!(err.code(), "MAPPING_001");
        assert_eq!(err.category(), "mapping");
    }

    #[test]
    fn test_invalid_name() {
        let err = MappingError::invalid_name("../etc");
        assert!(err.to_string().contains("../etc"));
        assert!(!err.is_not_found());
    }
}
