use crate::error::{TransferError, TransferResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek};

/// Readable, rewindable bytes handed to a backend.
pub trait ContentSource: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> ContentSource for T {}

/// Optional operations a backend supports beyond upload and delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Backend fronts a CDN and can purge cached copies of a name
    pub invalidate: bool,
}

/// An upload destination.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short identifier used in logs (`copy`, `scp`, ...)
    fn kind(&self) -> &'static str;

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }

    /// Store `content`, read from its current position to the end, under `name`.
    async fn create_file(&self, name: &str, content: &mut dyn ContentSource)
        -> TransferResult<()>;

    /// Delete `name`. A missing target is not an error.
    async fn try_delete_file(&self, name: &str) -> TransferResult<()>;

    /// Purge cached copies of `name`. Only called when `capabilities().invalidate` is set.
    async fn invalidate(&self, _name: &str) -> TransferResult<()> {
        Err(TransferError::Unsupported("invalidate"))
    }
}

/// One configured destination: a backend plus the public URLs it serves content under.
#[derive(Clone)]
pub struct TransferTarget {
    /// Transfer profile name from configuration
    pub name: String,
    pub backend: Arc<dyn Backend>,
    /// Prefix for segment URIs inside media playlists
    pub url_prefix: String,
    /// Prefix for media playlist URIs inside the master playlist
    pub url_prefix_for_playlists: String,
}

impl TransferTarget {
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn Backend>,
        url_prefix: impl Into<String>,
        url_prefix_for_playlists: Option<String>,
    ) -> Self {
        let url_prefix = url_prefix.into();
        Self {
            name: name.into(),
            backend,
            url_prefix_for_playlists: url_prefix_for_playlists
                .unwrap_or_else(|| url_prefix.clone()),
            url_prefix,
        }
    }
}

impl std::fmt::Debug for TransferTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferTarget")
            .field("name", &self.name)
            .field("kind", &self.backend.kind())
            .field("url_prefix", &self.url_prefix)
            .field("url_prefix_for_playlists", &self.url_prefix_for_playlists)
            .finish()
    }
}
