//! SCP destination. Every call spawns its own `scp`/`ssh` process.

use crate::config::ScpConfig;
use crate::error::{TransferError, TransferResult};
use crate::ports::backend::{Backend, ContentSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Remote side of the SCP backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Copy a local file to `remote_path` on the host.
    async fn upload(&self, local_path: &Path, remote_path: &str) -> TransferResult<()>;

    /// `rm -f` a remote path.
    async fn remove(&self, remote_path: &str) -> TransferResult<()>;
}

/// [`RemoteShell`] backed by the OpenSSH client binaries.
#[derive(Clone, Debug)]
pub struct OpenSshShell {
    host: String,
    user: String,
    port: Option<u16>,
    identity_file: Option<PathBuf>,
}

impl OpenSshShell {
    pub fn new(config: &ScpConfig) -> Self {
        Self {
            host: config.host.clone(),
            user: config.user.clone(),
            port: config.port,
            identity_file: config.identity_file.clone(),
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn scp_args(&self, local_path: &Path, remote_path: &str) -> Vec<String> {
        let mut args = vec!["-q".to_string(), "-B".to_string()];
        if let Some(port) = self.port {
            args.push("-P".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(local_path.display().to_string());
        args.push(format!("{}:{}", self.destination(), remote_path));
        args
    }

    fn ssh_args(&self, remote_command: String) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(self.destination());
        args.push(remote_command);
        args
    }
}

async fn run(program: &str, args: Vec<String>) -> TransferResult<()> {
    let output = Command::new(program).args(&args).output().await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(TransferError::Command {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Single-quote `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[async_trait]
impl RemoteShell for OpenSshShell {
    async fn upload(&self, local_path: &Path, remote_path: &str) -> TransferResult<()> {
        run("scp", self.scp_args(local_path, remote_path)).await
    }

    async fn remove(&self, remote_path: &str) -> TransferResult<()> {
        let command = format!("rm -f -- {}", shell_quote(remote_path));
        run("ssh", self.ssh_args(command)).await
    }
}

pub struct ScpBackend<S = OpenSshShell> {
    shell: S,
    directory: String,
}

impl ScpBackend<OpenSshShell> {
    pub fn new(config: &ScpConfig) -> Self {
        Self::with_shell(OpenSshShell::new(config), config.directory.clone())
    }
}

impl<S: RemoteShell> ScpBackend<S> {
    pub fn with_shell(shell: S, directory: String) -> Self {
        Self { shell, directory }
    }

    fn remote_path(&self, name: &str) -> String {
        let directory = self.directory.trim_end_matches('/');
        if directory.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", directory, name)
        }
    }
}

#[async_trait]
impl<S: RemoteShell> Backend for ScpBackend<S> {
    fn kind(&self) -> &'static str {
        "scp"
    }

    async fn create_file(
        &self,
        name: &str,
        content: &mut dyn ContentSource,
    ) -> TransferResult<()> {
        // scp needs a file on disk, so the content is spooled first
        let mut data = Vec::new();
        content.read_to_end(&mut data).await?;

        let spool = tempfile::NamedTempFile::new()?;
        tokio::fs::write(spool.path(), &data).await?;

        self.shell
            .upload(spool.path(), &self.remote_path(name))
            .await
    }

    async fn try_delete_file(&self, name: &str) -> TransferResult<()> {
        self.shell.remove(&self.remote_path(name)).await
    }
}
