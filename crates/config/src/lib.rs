#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for nasemu
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (/etc/nasemu/config.toml)
//! - Environment variables (`XL_*`)
//! - CLI flags
//!
//! Loading is synchronous on purpose: it runs before the process leaves its
//! mount namespace and must not start any helper threads.

pub mod constants;

use nasemu_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default)]
    pub isolation: IsolationConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Dashboard listen address, `HOST:PORT` or `:PORT`
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Pass `-update_url null` to the vendor launcher
    #[serde(default)]
    pub prevent_update: bool,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Download directories; each entry may itself be a `:` separated list
    #[serde(default = "default_download_dirs")]
    pub download_dirs: Vec<String>,
}

/// Identity the vendor process runs as
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IdentityConfig {
    #[serde(default)]
    pub uid: u32,
    #[serde(default)]
    pub gid: u32,
}

/// Vendor package source and layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// `file://`, `http://` or `https://` location of the `.spk`
    #[serde(default = "default_package_url")]
    pub url: String,
    /// Fetch even when the installed package looks complete
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub layout: PackageLayout,
}

/// Files that make up a complete installation, relative to the package root
///
/// `version_file` holds the installed version and only has to be non-empty.
/// Artifact templates may contain `{arch}` and `{version}` and are subject
/// to the minimum size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageLayout {
    #[serde(default = "default_version_file")]
    pub version_file: String,
    #[serde(default = "default_artifacts")]
    pub artifacts: Vec<String>,
    /// Smallest acceptable size of every artifact, in bytes
    #[serde(default = "default_min_artifact_size")]
    pub min_artifact_size: u64,
}

/// Namespace isolation configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct IsolationConfig {
    /// What to do when mounting `/proc` in the new namespace fails
    #[serde(default)]
    pub proc_mount_policy: FailurePolicy,
}

/// How a failing step affects the rest of the pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the pipeline
    #[default]
    Fatal,
    /// Report a warning and continue with the next step
    Warn,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(Self::Fatal),
            "warn" | "warning" => Ok(Self::Warn),
            _ => Err(ConfigError::InvalidValue {
                field: "isolation.proc_mount_policy".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            prevent_update: false,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            download_dirs: default_download_dirs(),
        }
    }
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            url: default_package_url(),
            force: false,
            layout: PackageLayout::default(),
        }
    }
}

impl Default for PackageLayout {
    fn default() -> Self {
        Self {
            version_file: default_version_file(),
            artifacts: default_artifacts(),
            min_artifact_size: default_min_artifact_size(),
        }
    }
}

// Default value functions for serde
fn default_listen() -> String {
    constants::DEFAULT_LISTEN.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_DATA_DIR)
}

fn default_download_dirs() -> Vec<String> {
    vec![constants::DEFAULT_DOWNLOAD_DIR.to_string()]
}

fn default_package_url() -> String {
    constants::DEFAULT_PACKAGE_URL.to_string()
}

fn default_version_file() -> String {
    "bin/bin/version".to_string()
}

fn default_artifacts() -> Vec<String> {
    vec![
        "bin/bin/xunlei-pan-cli-launcher.{arch}".to_string(),
        "bin/bin/xunlei-pan-cli.{version}.{arch}".to_string(),
        "ui/index.cgi".to_string(),
    ]
}

fn default_min_artifact_size() -> u64 {
    10 * 1024 * 1024 // 10 MiB
}

impl PackageLayout {
    /// Expand the artifact templates for an architecture and version
    #[must_use]
    pub fn expand(&self, arch: &str, version: &str) -> Vec<String> {
        self.artifacts
            .iter()
            .map(|template| template.replace("{arch}", arch).replace("{version}", version))
            .collect()
    }
}

impl Config {
    /// Get the default config file path
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from(constants::CONFIG_PATH)
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
            path: path.display().to_string(),
        })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub fn load() -> Result<Self, Error> {
        let config_path = Self::default_path();

        if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "loading configuration file");
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path),
            None => Self::load(),
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // XL_LISTEN
        if let Ok(listen) = std::env::var("XL_LISTEN") {
            self.general.listen = listen;
        }

        // XL_DIR_DOWNLOAD
        if let Ok(dirs) = std::env::var("XL_DIR_DOWNLOAD") {
            self.paths.download_dirs = vec![dirs];
        }

        // XL_DIR_DATA
        if let Ok(data) = std::env::var("XL_DIR_DATA") {
            self.paths.data_dir = PathBuf::from(data);
        }

        // XL_UID
        if let Ok(uid) = std::env::var("XL_UID") {
            self.identity.uid = parse_id("XL_UID", &uid)?;
        }

        // XL_GID
        if let Ok(gid) = std::env::var("XL_GID") {
            self.identity.gid = parse_id("XL_GID", &gid)?;
        }

        // XL_PREVENT_UPDATE
        if let Ok(prevent) = std::env::var("XL_PREVENT_UPDATE") {
            self.general.prevent_update = parse_bool("XL_PREVENT_UPDATE", &prevent)?;
        }

        // XL_SPK_URL
        if let Ok(url) = std::env::var("XL_SPK_URL") {
            self.package.url = url;
        }

        Ok(())
    }

    /// Bring paths into canonical form and validate the listen address
    ///
    /// Download directory entries are split on `:`, trimmed and made
    /// absolute; empty results fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a relative path cannot be resolved or the listen
    /// address is malformed.
    pub fn normalize(&mut self) -> Result<(), Error> {
        let mut dirs = Vec::new();
        for entry in &self.paths.download_dirs {
            for part in entry.split(':').map(str::trim).filter(|p| !p.is_empty()) {
                let path = absolutize("paths.download_dirs", Path::new(part))?;
                dirs.push(path.display().to_string());
            }
        }
        if dirs.is_empty() {
            dirs = default_download_dirs();
        }
        self.paths.download_dirs = dirs;

        if self.paths.data_dir.as_os_str().is_empty() {
            self.paths.data_dir = default_data_dir();
        }
        self.paths.data_dir = absolutize("paths.data_dir", &self.paths.data_dir)?;

        self.listen_addr()?;
        Ok(())
    }

    /// Parsed dashboard listen address
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidListen` if the address cannot be parsed.
    pub fn listen_addr(&self) -> Result<SocketAddr, Error> {
        parse_listen(&self.general.listen)
    }

    /// Download directories as paths
    #[must_use]
    pub fn download_dirs(&self) -> Vec<PathBuf> {
        self.paths.download_dirs.iter().map(PathBuf::from).collect()
    }
}

/// Parse `HOST:PORT`, `:PORT` or a bare port into a socket address
///
/// # Errors
///
/// Returns `ConfigError::InvalidListen` for anything else.
pub fn parse_listen(value: &str) -> Result<SocketAddr, Error> {
    let invalid = || ConfigError::InvalidListen {
        value: value.to_string(),
    };
    let trimmed = value.trim();

    if let Some(port) = trimmed.strip_prefix(':') {
        let port: u16 = port.parse().map_err(|_| invalid())?;
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }
    if let Ok(port) = trimmed.parse::<u16>() {
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }
    trimmed
        .parse::<SocketAddr>()
        .map_err(|_| invalid().into())
}

fn absolutize(field: &str, path: &Path) -> Result<PathBuf, Error> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| ConfigError::InvalidPath {
        field: field.to_string(),
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(cwd.join(path))
}

fn parse_id(field: &str, value: &str) -> Result<u32, Error> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

fn parse_bool(field: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()),
    }
}
