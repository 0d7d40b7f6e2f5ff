//! Application configuration.
//!
//! Settings are layered, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, or `config.toml` in the platform config
//!    directory)
//! 3. `RUSTSUMS_*` environment variables, e.g. `RUSTSUMS_IO_THREADS=8`
//!
//! Command-line flags are applied on top by the commands themselves.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::collisions::DEFAULT_CHUNK_SIZE;
use crate::manifest::ParseMode;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "RUSTSUMS_";

/// When to colour terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    /// Colour when writing to a terminal.
    #[default]
    Auto,
    /// Always colour.
    Always,
    /// Never colour.
    Never,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bytes read per step when comparing file contents.
    pub chunk_size: usize,
    /// How malformed manifest lines are treated.
    pub parse_mode: ParseMode,
    /// Worker threads for hashing and collision analysis.
    pub io_threads: usize,
    /// Invalid answers accepted per dedup prompt before the cluster is skipped.
    pub prompt_max_retries: u32,
    /// Optional cap on bytes read by a whole collision analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bytes_read: Option<u64>,
    /// Colour preference.
    pub color: ColorChoice,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            parse_mode: ParseMode::Lenient,
            io_threads: 4,
            prompt_max_retries: 3,
            max_bytes_read: None,
            color: ColorChoice::Auto,
        }
    }
}

/// Errors from loading or saving configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer could not be parsed.
    #[error("Invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Writing the configuration failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Configuration file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Serializing the configuration failed.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration file location, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "rustsums", "rustsums")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file is not an error; its layer is simply empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Extract`] when the file or environment holds
    /// values of the wrong type and [`ConfigError::Invalid`] when a value is
    /// out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);
        Self::figment(path.as_deref())
            .extract::<Self>()
            .map_err(|e| ConfigError::Extract(Box::new(e)))?
            .validated()
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            log::debug!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                field: "chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.io_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "io_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.prompt_max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "prompt_max_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    /// Write this configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
