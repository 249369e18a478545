//! Transfer-type names, dependency probes and backend construction.

use crate::config::{BackendConfig, TransferProfileConfig};
use crate::error::ConfigError;
use crate::ports::backend::{Backend, TransferTarget};
use std::env;
use std::path::Path;
use std::sync::Arc;

use super::local::{CopyBackend, ScpBackend};

pub const COPY: &str = "copy";
pub const SCP: &str = "scp";
pub const FTP: &str = "ftp";
pub const S3: &str = "s3";
pub const CF: &str = "cf";

/// Every transfer type this crate knows about, whether or not it is compiled in.
pub const TRANSFER_TYPES: [&str; 5] = [COPY, SCP, FTP, S3, CF];

pub fn is_known(transfer_type: &str) -> bool {
    TRANSFER_TYPES.contains(&transfer_type)
}

/// Whether the runtime dependencies of `transfer_type` are present. Never fails: unknown types
/// and missing dependencies both report `false`.
pub fn probe(transfer_type: &str) -> bool {
    match transfer_type {
        COPY => true,
        SCP => executable_on_path("scp") && executable_on_path("ssh"),
        FTP => cfg!(feature = "ftp"),
        S3 | CF => cfg!(feature = "aws"),
        _ => false,
    }
}

fn executable_on_path(program: &str) -> bool {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| is_executable(&dir.join(program))))
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// Build the backend for one transfer profile.
pub async fn construct(profile: &TransferProfileConfig) -> Result<Arc<dyn Backend>, ConfigError> {
    if !is_known(&profile.transfer_type) {
        return Err(ConfigError::UnknownTransferType(
            profile.transfer_type.clone(),
        ));
    }

    match BackendConfig::from_profile(profile)? {
        BackendConfig::Copy(config) => Ok(Arc::new(CopyBackend::new(config.directory))),

        BackendConfig::Scp(config) => Ok(Arc::new(ScpBackend::new(&config))),

        #[cfg(feature = "ftp")]
        BackendConfig::Ftp(config) => Ok(Arc::new(super::local::FtpBackend::new(config))),

        #[cfg(not(feature = "ftp"))]
        BackendConfig::Ftp(_) => Err(ConfigError::DependencyUnavailable(
            "ftp (ftp feature not enabled)".to_string(),
        )),

        #[cfg(feature = "aws")]
        BackendConfig::S3(config) => {
            let sdk_config = super::aws::s3::load_sdk_config(&config).await;
            Ok(Arc::new(super::aws::S3Backend::from_sdk_config(
                &sdk_config,
                &config,
            )))
        }

        #[cfg(feature = "aws")]
        BackendConfig::Cf(config) => {
            let sdk_config = super::aws::s3::load_sdk_config(&config.storage).await;
            Ok(Arc::new(super::aws::CdnBackend::from_sdk_config(
                &sdk_config,
                &config,
            )))
        }

        #[cfg(not(feature = "aws"))]
        BackendConfig::S3(_) | BackendConfig::Cf(_) => Err(ConfigError::DependencyUnavailable(
            format!("{} (aws feature not enabled)", profile.transfer_type),
        )),
    }
}

/// Build every configured destination, in configuration order.
pub async fn build_targets(
    profiles: &[TransferProfileConfig],
) -> Result<Vec<TransferTarget>, ConfigError> {
    let mut targets = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let backend = construct(profile).await?;
        tracing::info!(
            profile = %profile.name,
            transfer_type = %profile.transfer_type,
            "Transfer profile ready"
        );
        targets.push(TransferTarget::new(
            profile.name.clone(),
            backend,
            profile.url_prefix.clone(),
            profile.url_prefix_for_playlists.clone(),
        ));
    }
    Ok(targets)
}
