//! Store configuration.
//!
//! # Responsibility
//! - Load optional settings from `<config dir>/brain/config.toml`.
//! - Resolve the store root directory.
//!
//! # Invariants
//! - A missing config file yields defaults, never an error.
//! - Root precedence: explicit path, `BRAIN_DIR`, config `root`, `~/.brain`.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable overriding the store root.
pub const ROOT_ENV_VAR: &str = "BRAIN_DIR";
const DEFAULT_ROOT_DIR_NAME: &str = ".brain";

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// No root configured and the home directory is unknown.
    NoHomeDir,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config file {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config file {}: {source}", path.display())
            }
            Self::NoHomeDir => write!(
                f,
                "cannot locate a home directory; set {ROOT_ENV_VAR} or `root` in config"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::NoHomeDir => None,
        }
    }
}

/// Settings for opening a cell store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the log and the index.
    pub root: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: Option<String>,
    /// Call `sync_data` after every log append.
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: None,
            log_level: None,
            sync_writes: true,
        }
    }
}

impl StoreConfig {
    /// Loads the config file from its default location.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads the config file at `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default: `~/.config/brain/config.toml` on Linux.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("brain").join("config.toml"))
    }

    /// Resolves the store root directory.
    pub fn store_root(&self, explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let from_env = std::env::var_os(ROOT_ENV_VAR).map(PathBuf::from);
        self.resolve_root(explicit, from_env, dirs::home_dir())
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    fn resolve_root(
        &self,
        explicit: Option<&Path>,
        from_env: Option<PathBuf>,
        home: Option<PathBuf>,
    ) -> Result<PathBuf, ConfigError> {
        explicit
            .map(Path::to_path_buf)
            .or(from_env.filter(|path| !path.as_os_str().is_empty()))
            .or_else(|| self.root.clone())
            .or_else(|| home.map(|home| home.join(DEFAULT_ROOT_DIR_NAME)))
            .ok_or(ConfigError::NoHomeDir)
    }
}
