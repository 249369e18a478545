//! Ports - Trait definitions the application layer depends on.

pub mod backend;

pub use backend::{Backend, BackendCapabilities, ContentSource, TransferTarget};
