//! Adapters that need nothing beyond the host: local copy, SCP, FTP and the in-process queue.

pub mod fs;
#[cfg(feature = "ftp")]
pub mod ftp;
pub mod queue;
pub mod scp;

pub use fs::CopyBackend;
#[cfg(feature = "ftp")]
pub use ftp::FtpBackend;
pub use queue::{command_queue, CommandReceiver, CommandSender};
pub use scp::ScpBackend;
