//! Error types for host access and retarget operations.

use rigbake_mapping::{CodedError, MappingError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for host capability calls.
pub type HostResult<T> = Result<T, HostError>;

/// Result type for retarget operations.
pub type HikResult<T> = Result<T, HikError>;

/// Errors raised by a [`Host`](crate::host::Host) implementation.
#[derive(Debug, Error)]
pub enum HostError {
    /// A named node does not exist in the scene.
    #[error("Node '{name}' not found")]
    NodeNotFound { name: String },

    /// The host refused or failed to run a command.
    #[error("Command '{command}' rejected: {message}")]
    CommandRejected { command: String, message: String },

    /// An attribute is locked against edits.
    #[error("Attribute '{plug}' is locked")]
    AttributeLocked { plug: String },

    /// An attribute could not be read or written.
    #[error("Attribute '{plug}': {message}")]
    AttributeError { plug: String, message: String },

    /// The host answered with something the caller could not interpret.
    #[error("Unexpected reply to '{command}': {reply}")]
    UnexpectedReply { command: String, reply: String },

    /// Could not connect to the host command port.
    #[error("Failed to connect to command port at {address}: {source}")]
    ConnectFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The host did not answer in time.
    #[error("Host did not reply within {timeout:?}")]
    Timeout { timeout: Duration },

    /// The connection can no longer be trusted to pair replies with commands.
    #[error("Command port connection unusable: {message}")]
    Transport { message: String },

    /// IO error on the host connection.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    /// Creates a new node not found error.
    pub fn node_not_found(name: impl Into<String>) -> Self {
        Self::NodeNotFound { name: name.into() }
    }

    /// Creates a new command rejected error.
    pub fn rejected(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandRejected {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a new attribute error.
    pub fn attribute(plug: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AttributeError {
            plug: plug.into(),
            message: message.into(),
        }
    }

    /// Creates a new unexpected reply error.
    pub fn unexpected_reply(command: impl Into<String>, reply: impl Into<String>) -> Self {
        Self::UnexpectedReply {
            command: command.into(),
            reply: reply.into(),
        }
    }

    /// Creates a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true if the error means a node was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostError::NodeNotFound { .. })
    }
}

impl CodedError for HostError {
    fn code(&self) -> &'static str {
        match self {
            HostError::NodeNotFound { .. } => "HOST_001",
            HostError::CommandRejected { .. } => "HOST_002",
            HostError::AttributeLocked { .. } => "HOST_003",
            HostError::AttributeError { .. } => "HOST_004",
            HostError::UnexpectedReply { .. } => "HOST_005",
            HostError::ConnectFailed { .. } => "HOST_006",
            HostError::Timeout { .. } => "HOST_007",
            HostError::Io(_) => "HOST_008",
            HostError::Transport { .. } => "HOST_009",
        }
    }

    fn category(&self) -> &'static str {
        "host"
    }
}

/// Fatal errors that abort a retarget operation.
///
/// Per-joint and per-control binding failures are not errors; they are
/// reported through [`MappingReport`](crate::outcome::MappingReport).
#[derive(Debug, Error)]
pub enum HikError {
    /// A mapping could not be loaded.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A host call needed to continue failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// No mocap file path was given and none could be prompted for.
    #[error("No mocap file path given")]
    MocapPathMissing,

    /// The mocap file does not exist.
    #[error("Mocap path does not exist: {path}")]
    MocapPathNotFound { path: PathBuf },

    /// The rig file does not exist.
    #[error("Rig path does not exist: {path}")]
    RigPathNotFound { path: PathBuf },

    /// The user declined a file-path prompt.
    #[error("Operation cancelled")]
    Cancelled,

    /// No rig namespace was given and nothing is selected.
    #[error("No selection found in the scene; cannot resolve the rig namespace")]
    NoRigNamespace,

    /// A skeleton mapping has no joint bound to the root slot.
    #[error("Mapping '{mapping}' defines no root joint (slot 1)")]
    RootUndefined { mapping: String },

    /// The imported mocap root joint is not in the scene.
    #[error("Could not find mocap root node '{node}'")]
    MocapRootNotFound { node: String },
}

impl HikError {
    /// Returns true if the user cancelled before any scene mutation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HikError::Cancelled)
    }
}

impl CodedError for HikError {
    fn code(&self) -> &'static str {
        match self {
            HikError::Mapping(e) => e.code(),
            HikError::Host(e) => e.code(),
            HikError::MocapPathMissing => "HIK_001",
            HikError::MocapPathNotFound { .. } => "HIK_002",
            HikError::RigPathNotFound { .. } => "HIK_003",
            HikError::Cancelled => "HIK_004",
            HikError::NoRigNamespace => "HIK_005",
            HikError::RootUndefined { .. } => "HIK_006",
            HikError::MocapRootNotFound { .. } => "HIK_007",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            HikError::Mapping(e) => e.category(),
            HikError::Host(e) => e.category(),
            _ => "hik",
        }
    }
}
