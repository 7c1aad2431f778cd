use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::descriptor::DEFAULT_VERSION_KEY;
use crate::error::{ReleaseError, Result};
use crate::git::Identity;

/// File name looked up in the current directory
pub const CONFIG_FILE_NAME: &str = "release-tagger.toml";

/// Represents the complete configuration for release-tagger.
///
/// Contains the repository layout, the descriptor to rewrite, tagging and
/// push behavior, the automation identity and the downstream scan toggles.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_root_folder")]
    pub root_folder: PathBuf,

    #[serde(default = "default_descriptor")]
    pub descriptor: PathBuf,

    #[serde(default = "default_version_key")]
    pub version_key: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Expected branch; `None` releases whatever branch HEAD is on
    #[serde(default)]
    pub branch: Option<String>,

    #[serde(default = "default_true")]
    pub force_tag: bool,

    #[serde(default = "default_true")]
    pub push: bool,

    #[serde(default = "default_tag_message")]
    pub tag_message: String,

    #[serde(default)]
    pub identity: Identity,

    #[serde(default)]
    pub scans: BTreeMap<String, ScanConfig>,
}

/// A downstream scanner the pipeline hands the new tag to.
///
/// Opaque to the release core: entries are passed through to the run
/// outputs and never contacted.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ScanConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_root_folder() -> PathBuf {
    PathBuf::from(".")
}

fn default_descriptor() -> PathBuf {
    PathBuf::from("build.properties")
}

fn default_version_key() -> String {
    DEFAULT_VERSION_KEY.to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tag_message() -> String {
    "Release {tag}".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root_folder: default_root_folder(),
            descriptor: default_descriptor(),
            version_key: default_version_key(),
            remote: default_remote(),
            branch: None,
            force_tag: true,
            push: true,
            tag_message: default_tag_message(),
            identity: Identity::default(),
            scans: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Checks values that serde cannot: empty names and absolute descriptor paths.
    pub fn validate(&self) -> Result<()> {
        if self.version_key.trim().is_empty() {
            return Err(ReleaseError::config("version_key must not be empty"));
        }
        if self.remote.trim().is_empty() {
            return Err(ReleaseError::config("remote must not be empty"));
        }
        if self.descriptor.as_os_str().is_empty() {
            return Err(ReleaseError::config("descriptor must not be empty"));
        }
        if self.descriptor.is_absolute() {
            return Err(ReleaseError::config(format!(
                "descriptor must be relative to root_folder, got {}",
                self.descriptor.display()
            )));
        }
        if self.identity.name.trim().is_empty() || self.identity.email.trim().is_empty() {
            return Err(ReleaseError::config("identity name and email must be set"));
        }
        Ok(())
    }

    /// Scans that are switched on, by name
    pub fn enabled_scans(&self) -> impl Iterator<Item = &str> {
        self.scans
            .iter()
            .filter(|(_, scan)| scan.enabled)
            .map(|(name, _)| name.as_str())
    }
}

/// Parses configuration from TOML text
pub fn parse_config(text: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(text).map_err(|e| ReleaseError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release-tagger.toml` in current directory
/// 3. `.release-tagger.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Errors
/// A file that exists but cannot be read or parsed is an error; an explicit
/// path that does not exist is an error too.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path).map_err(|e| {
            ReleaseError::config(format!("Cannot read {}: {}", path.display(), e))
        })?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}
