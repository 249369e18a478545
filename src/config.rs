//! Configuration for the transfer daemon.
//!
//! The configuration file is TOML (or JSON when the file name ends in `.json`):
//!
//! ```toml
//! temp_dir = "/var/tmp/hls"
//! segment_prefix = "live"
//! index_prefix = "live"
//! segment_length = 10
//! index_segment_count = 3
//! delete_nth_segment_back = 10
//!
//! [[encoding_profile]]
//! name = "ep_128k"
//! bandwidth = 128000
//!
//! [[transfer_profile]]
//! name = "origin"
//! transfer_type = "copy"
//! directory = "/var/www/live"
//! url_prefix = "http://example.com/live/"
//! ```

use crate::adapters::registry;
use crate::domain::profile::EncodingProfile;
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_PATH_VAR: &str = "HLS_TRANSFER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "hls-transfer.toml";

/// Shortest accepted `segment_length`, in seconds
pub const MIN_SEGMENT_LENGTH: u64 = 3;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Directory the segmenter writes finished `.ts` files to
    pub temp_dir: PathBuf,
    pub segment_prefix: String,
    pub index_prefix: String,
    /// Segment duration in seconds
    pub segment_length: u64,
    /// Number of segments listed in each media playlist
    pub index_segment_count: u64,
    /// Delete the segment this many positions behind the newest one
    #[serde(default)]
    pub delete_nth_segment_back: Option<u64>,
    #[serde(rename = "encoding_profile", default)]
    pub encoding_profiles: Vec<EncodingProfile>,
    #[serde(rename = "transfer_profile", default)]
    pub transfer_profiles: Vec<TransferProfileConfig>,
}

/// One destination as written in the configuration file.
#[derive(Clone, Debug, Deserialize)]
pub struct TransferProfileConfig {
    pub name: String,
    pub transfer_type: String,
    #[serde(default)]
    pub url_prefix: String,
    #[serde(default)]
    pub url_prefix_for_playlists: Option<String>,
    /// Type-specific fields, parsed by [`BackendConfig::from_profile`]
    #[serde(flatten)]
    pub settings: toml::Table,
}

impl Config {
    /// Load the file named by `HLS_TRANSFER_CONFIG` (after reading `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| String::from(DEFAULT_CONFIG_PATH));
        Self::from_file(path)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Startup checks. Every transfer type must be known and its dependencies available.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_length < MIN_SEGMENT_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "segment_length must be at least {} seconds, got {}",
                MIN_SEGMENT_LENGTH, self.segment_length
            )));
        }
        if self.index_segment_count == 0 {
            return Err(ConfigError::Invalid(
                "index_segment_count must be at least 1".to_string(),
            ));
        }
        if self.delete_nth_segment_back == Some(0) {
            return Err(ConfigError::Invalid(
                "delete_nth_segment_back must be at least 1".to_string(),
            ));
        }
        if self.segment_prefix.is_empty() || self.index_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "segment_prefix and index_prefix must not be empty".to_string(),
            ));
        }

        if self.encoding_profiles.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one encoding_profile is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for profile in &self.encoding_profiles {
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate encoding_profile {}",
                    profile.name
                )));
            }
        }

        if self.transfer_profiles.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one transfer_profile is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for profile in &self.transfer_profiles {
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate transfer_profile {}",
                    profile.name
                )));
            }
            if !registry::is_known(&profile.transfer_type) {
                return Err(ConfigError::UnknownTransferType(
                    profile.transfer_type.clone(),
                ));
            }
            if !registry::probe(&profile.transfer_type) {
                tracing::warn!(
                    profile = %profile.name,
                    transfer_type = %profile.transfer_type,
                    "Transfer type dependencies are unavailable"
                );
                return Err(ConfigError::DependencyUnavailable(
                    profile.transfer_type.clone(),
                ));
            }
            BackendConfig::from_profile(profile)?;
        }

        Ok(())
    }
}

/// Typed settings of one transfer profile, keyed by its `transfer_type`.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendConfig {
    Copy(CopyConfig),
    Scp(ScpConfig),
    Ftp(FtpConfig),
    S3(S3Config),
    Cf(CdnConfig),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CopyConfig {
    pub directory: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ScpConfig {
    pub host: String,
    pub user: String,
    pub directory: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FtpConfig {
    pub host: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_ftp_port() -> u16 {
    21
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default)]
    pub key_prefix: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CdnConfig {
    #[serde(flatten)]
    pub storage: S3Config,
    pub distribution_id: String,
}

impl BackendConfig {
    pub fn from_profile(profile: &TransferProfileConfig) -> Result<Self, ConfigError> {
        let parsed = match profile.transfer_type.as_str() {
            registry::COPY => BackendConfig::Copy(parse_settings(profile)?),
            registry::SCP => BackendConfig::Scp(parse_settings(profile)?),
            registry::FTP => BackendConfig::Ftp(parse_settings(profile)?),
            registry::S3 => BackendConfig::S3(parse_settings(profile)?),
            registry::CF => BackendConfig::Cf(parse_settings(profile)?),
            other => return Err(ConfigError::UnknownTransferType(other.to_string())),
        };
        Ok(parsed)
    }
}

fn parse_settings<T: DeserializeOwned>(profile: &TransferProfileConfig) -> Result<T, ConfigError> {
    toml::Value::Table(profile.settings.clone())
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidTransferProfile {
            profile: profile.name.clone(),
            transfer_type: profile.transfer_type.clone(),
            message: e.message().to_string(),
        })
}
