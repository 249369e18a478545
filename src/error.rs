//! Error types shared by the transfer pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Startup errors. Never raised once the worker is running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown transfer type: {0}")]
    UnknownTransferType(String),

    #[error("Transfer profile {profile} ({transfer_type}): {message}")]
    InvalidTransferProfile {
        profile: String,
        transfer_type: String,
        message: String,
    },

    #[error("Transfer type {0} is not available in this build or environment")]
    DependencyUnavailable(String),
}

/// A failed upload, delete or invalidation against one destination.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid destination name: {0}")]
    InvalidName(String),

    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("FTP error: {0}")]
    Ftp(String),

    #[error("Object storage error: {0}")]
    ObjectStorage(String),

    #[error("CDN invalidation failed: {0}")]
    Invalidation(String),

    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Backend panicked: {0}")]
    Panicked(String),
}

/// Result type for backend operations
pub type TransferResult<T> = Result<T, TransferError>;

/// Failure of a whole command. Logged by the worker loop, never surfaced to producers.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to read segment source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Command processing panicked: {0}")]
    Panicked(String),
}
