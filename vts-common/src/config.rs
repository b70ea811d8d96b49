//! Configuration loading and data folder resolution
//!
//! Resolution priority, highest first:
//! 1. Command-line argument
//! 2. Environment variable (`VTS_HOST`, `VTS_PORT`, `VTS_DATA_DIR`)
//! 3. TOML config file (`~/.config/vts/config.toml`, or `/etc/vts/config.toml` on Linux)
//! 4. Compiled default
//!
//! A missing or unreadable config file never prevents startup; the resolver
//! falls through to the next layer and logs a warning.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5870;

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the SQLite database file
    pub data_dir: PathBuf,
}

impl ServerConfig {
    /// Path of the SQLite database inside the data directory.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("vts.db")
    }

    /// Create the data directory if it does not exist yet.
    pub fn ensure_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Schema of the optional TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
}

impl TomlConfig {
    pub fn load(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }
}

/// Command-line overrides, already parsed by the caller.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
}

/// Resolve the effective configuration from all layers.
pub fn resolve(cli: &CliOverrides) -> ServerConfig {
    let toml_config = load_config_file()
        .and_then(|path| match TomlConfig::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring config file: {}", e);
                None
            }
        })
        .unwrap_or_default();

    let host = cli
        .host
        .clone()
        .or_else(|| std::env::var("VTS_HOST").ok())
        .or(toml_config.host)
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = cli
        .port
        .or_else(|| {
            std::env::var("VTS_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
        })
        .or(toml_config.port)
        .unwrap_or(DEFAULT_PORT);

    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| std::env::var("VTS_DATA_DIR").ok().map(PathBuf::from))
        .or(toml_config.data_dir)
        .unwrap_or_else(default_data_dir);

    ServerConfig {
        host,
        port,
        data_dir,
    }
}

/// Locate the config file for the platform, if one exists.
fn load_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("vts").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/vts/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// OS-dependent default data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vts"))
        .unwrap_or_else(|| PathBuf::from("./vts_data"))
}
