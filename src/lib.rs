//! HLS Transfer - Live segment shipping library
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (commands, playlists, naming, retention)
//! - ports/: Trait definitions (backends)
//! - adapters/: Concrete backends (copy, scp, ftp, s3, cf) and the command queue
//! - application/: The transfer worker
//! - config: Configuration file loading and validation
//!
//! # Features
//! - `aws`: S3 and S3 + CloudFront destinations
//! - `ftp`: FTP destinations
//!
//! Both are enabled by default.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use adapters::local::{command_queue, CommandSender};
pub use application::worker::{TransferWorker, WorkerContext, WorkerHandle};
pub use config::Config;
pub use domain::commands::{Command, SegmentCommand};
pub use domain::hls;
pub use error::{ConfigError, TransferError, WorkerError};
pub use ports::{Backend, BackendCapabilities, TransferTarget};
