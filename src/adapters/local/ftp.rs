use crate::config::FtpConfig;
use crate::error::{TransferError, TransferResult};
use crate::ports::backend::{Backend, ContentSource};
use async_trait::async_trait;
use std::io::Cursor;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Status};
use tokio::io::AsyncReadExt;
use tokio::task;

/// FTP destination. Opens a new control connection per call.
#[derive(Clone, Debug)]
pub struct FtpBackend {
    config: FtpConfig,
}

impl FtpBackend {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }

    fn connect(config: &FtpConfig) -> Result<FtpStream, FtpError> {
        let mut ftp = FtpStream::connect((config.host.as_str(), config.port))?;
        ftp.login(&config.user, &config.password)?;
        ftp.transfer_type(FileType::Binary)?;
        if let Some(directory) = config.directory.as_deref().filter(|d| !d.is_empty()) {
            ftp.cwd(directory)?;
        }
        Ok(ftp)
    }
}

fn ftp_error(e: FtpError) -> TransferError {
    TransferError::Ftp(e.to_string())
}

/// A `550` reply to `DELE`: the file does not exist. Busy, auth and service errors are failures.
fn is_absent(error: &FtpError) -> bool {
    matches!(
        error,
        FtpError::UnexpectedResponse(response) if response.status == Status::FileUnavailable
    )
}

#[async_trait]
impl Backend for FtpBackend {
    fn kind(&self) -> &'static str {
        "ftp"
    }

    async fn create_file(
        &self,
        name: &str,
        content: &mut dyn ContentSource,
    ) -> TransferResult<()> {
        let mut data = Vec::new();
        content.read_to_end(&mut data).await?;

        let config = self.config.clone();
        let name = name.to_string();
        task::spawn_blocking(move || {
            let mut ftp = Self::connect(&config).map_err(ftp_error)?;
            ftp.put_file(&name, &mut Cursor::new(data))
                .map_err(ftp_error)?;
            let _ = ftp.quit();
            Ok(())
        })
        .await?
    }

    async fn try_delete_file(&self, name: &str) -> TransferResult<()> {
        let config = self.config.clone();
        let name = name.to_string();
        task::spawn_blocking(move || {
            let mut ftp = Self::connect(&config).map_err(ftp_error)?;
            let result = match ftp.rm(&name) {
                Ok(()) => Ok(()),
                Err(e) if is_absent(&e) => {
                    tracing::debug!(file = %name, "FTP file already absent");
                    Ok(())
                }
                Err(e) => Err(ftp_error(e)),
            };
            let _ = ftp.quit();
            result
        })
        .await?
    }
}
