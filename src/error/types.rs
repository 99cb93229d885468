//! Error types
//!
//! Defines domain-specific error types for each module of the control panel core.

use std::fmt;
use std::io;

/// Path resolution errors
///
/// Produced by `storage::validation` before any filesystem access happens.
#[derive(Debug)]
pub enum PathError {
    /// The path normalizes to a location outside the storage root.
    Escape(String),
    /// The path or filename is malformed (empty, control characters, `.`/`..` name).
    Invalid(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Escape(p) => write!(f, "Path escapes storage root: {}", p),
            PathError::Invalid(p) => write!(f, "Invalid path: {}", p),
        }
    }
}

impl std::error::Error for PathError {}

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    Path(PathError),
    NotFound(String),
    AlreadyExists(String),
    InvalidName(String),
    ExtensionNotAllowed(String),
    /// Deleting the storage root itself is refused.
    Forbidden(String),
    Io(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Path(e) => write!(f, "{}", e),
            StorageError::NotFound(p) => write!(f, "Not found: {}", p),
            StorageError::AlreadyExists(p) => write!(f, "Already exists: {}", p),
            StorageError::InvalidName(n) => write!(f, "Invalid name: {}", n),
            StorageError::ExtensionNotAllowed(n) => {
                write!(f, "File type not allowed: {}", n)
            }
            StorageError::Forbidden(p) => write!(f, "Operation forbidden: {}", p),
            StorageError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<PathError> for StorageError {
    fn from(error: PathError) -> Self {
        StorageError::Path(error)
    }
}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::Io(error)
    }
}

/// Deploy module errors
#[derive(Debug)]
pub enum DeployError {
    /// Every candidate port in the scan range was excluded or occupied.
    NoPortAvailable,
    /// The container spec or command vector is unusable (empty name, empty argv).
    InvalidSpec(String),
    /// An external command ran and exited nonzero where success was required.
    CommandFailed { exit_code: i32, stderr: String },
    /// The command could not be spawned or its output could not be collected.
    Io(io::Error),
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployError::NoPortAvailable => {
                write!(f, "No free port available in the configured range")
            }
            DeployError::InvalidSpec(msg) => write!(f, "Invalid deployment spec: {}", msg),
            DeployError::CommandFailed { exit_code, stderr } => {
                write!(f, "Command failed with exit code {}: {}", exit_code, stderr)
            }
            DeployError::Io(e) => write!(f, "Command IO error: {}", e),
        }
    }
}

impl std::error::Error for DeployError {}

impl From<io::Error> for DeployError {
    fn from(error: io::Error) -> Self {
        DeployError::Io(error)
    }
}

/// General error that encompasses both subsystems
#[derive(Debug)]
pub enum ServerError {
    Storage(StorageError),
    Deploy(DeployError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Storage(e) => write!(f, "Storage error: {}", e),
            ServerError::Deploy(e) => write!(f, "Deploy error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<StorageError> for ServerError {
    fn from(error: StorageError) -> Self {
        ServerError::Storage(error)
    }
}

impl From<DeployError> for ServerError {
    fn from(error: DeployError) -> Self {
        ServerError::Deploy(error)
    }
}

impl From<PathError> for ServerError {
    fn from(error: PathError) -> Self {
        ServerError::Storage(StorageError::Path(error))
    }
}
