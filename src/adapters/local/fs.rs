use crate::error::{TransferError, TransferResult};
use crate::ports::backend::{Backend, ContentSource};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Copies artifacts into a local directory, e.g. a web server's document root.
#[derive(Clone, Debug)]
pub struct CopyBackend {
    directory: PathBuf,
}

impl CopyBackend {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Names are flat file names inside `directory`.
    fn path_for(&self, name: &str) -> TransferResult<PathBuf> {
        if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(TransferError::InvalidName(name.to_string()));
        }
        Ok(self.directory.join(name))
    }
}

#[async_trait]
impl Backend for CopyBackend {
    fn kind(&self) -> &'static str {
        "copy"
    }

    async fn create_file(
        &self,
        name: &str,
        content: &mut dyn ContentSource,
    ) -> TransferResult<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.directory).await?;

        let mut file = fs::File::create(&path).await?;
        let size = tokio::io::copy(content, &mut file).await?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), size_bytes = size, "Copied file");
        Ok(())
    }

    async fn try_delete_file(&self, name: &str) -> TransferResult<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
