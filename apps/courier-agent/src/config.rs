//! Agent configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/courier/agent.toml`
//! - Windows: `%APPDATA%/courier/agent.toml`

use std::path::{Path, PathBuf};

use courier_upload_service::ServiceConfig;
use serde::{Deserialize, Serialize};

/// Agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory uploads are delivered to, one subdirectory per upload ID.
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,

    /// Bytes copied between progress reports.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Upload service settings (`[service]` table).
    #[serde(default)]
    pub service: ServiceConfig,
}

fn default_outbox_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base =
            std::env::var("LOCALAPPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(base).join("courier").join("outbox")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("courier")
            .join("outbox")
    }
}

fn default_chunk_size() -> usize {
    256 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            outbox_dir: default_outbox_dir(),
            chunk_size: default_chunk_size(),
            service: ServiceConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the platform path, or creates a default.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from `path`, writing a default there if missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "default configuration created");
            Ok(config)
        }
    }

    /// Saves the current configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("courier")
            .join("agent.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("courier").join("agent.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/courier/agent.toml"))
    }
}
