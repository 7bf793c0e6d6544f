//! Configuration for the protocol book and its stress driver.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PROTOBOOK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/protobook/config.toml
//!   3. ~/.config/protobook/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub protobook: ProtoBookConfig,
    pub stress: StressConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtoBookConfig {
    /// Most distinct protocols tracked per peer.
    pub max_protocols: usize,
    /// Initial capacity of the interning table. The table grows past it.
    pub intern_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Worker threads. 0 = available parallelism.
    pub threads: usize,
    pub peers_per_thread: usize,
    pub ops_per_thread: usize,
    /// Number of distinct protocol names drawn from.
    pub protocol_pool: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_MAX_PROTOCOLS: usize = 1024;
pub const DEFAULT_INTERN_CAPACITY: usize = 256;

impl Default for ProtoBookConfig {
    fn default() -> Self {
        Self {
            max_protocols: DEFAULT_MAX_PROTOCOLS,
            intern_capacity: DEFAULT_INTERN_CAPACITY,
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            peers_per_thread: 64,
            ops_per_thread: 100_000,
            protocol_pool: 32,
        }
    }
}

impl ProtoBookConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_protocols == 0 {
            return Err(ConfigError::Invalid("max_protocols must be at least 1".into()));
        }
        Ok(())
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("protobook")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl BookConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::file_path())?;
        config.apply_env_overrides();
        config.protobook.validate()?;
        Ok(config)
    }

    /// Read `path` if it exists, else defaults. Ignores the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(BookConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Parse a config document without touching the environment.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: BookConfig = toml::from_str(text)
            .map_err(|e| ConfigError::ParseFailed(PathBuf::from("<inline>"), e))?;
        config.protobook.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PROTOBOOK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write the default document to `file_path()` if nothing is there.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        Self::write_default_at(&path)?;
        Ok(path)
    }

    /// Write the default document to `path` unless a file already exists.
    /// Returns whether a file was written.
    pub fn write_default_at(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text = toml::to_string_pretty(&BookConfig::default())
            .map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        tracing::info!(path = %path.display(), "wrote default config");
        Ok(true)
    }

    /// Apply PROTOBOOK_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PROTOBOOK_MAX_PROTOCOLS") {
            if let Ok(n) = v.parse() {
                self.protobook.max_protocols = n;
            }
        }
        if let Ok(v) = std::env::var("PROTOBOOK_INTERN_CAPACITY") {
            if let Ok(n) = v.parse() {
                self.protobook.intern_capacity = n;
            }
        }
        if let Ok(v) = std::env::var("PROTOBOOK_STRESS__THREADS") {
            if let Ok(n) = v.parse() {
                self.stress.threads = n;
            }
        }
    }
}
