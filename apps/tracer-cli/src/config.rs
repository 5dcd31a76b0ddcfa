//! Host configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/tracerlog/tracerlog.toml`
//! - Windows: `%APPDATA%/tracerlog/tracerlog.toml`

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Location reported by the headless page.
    #[serde(default = "default_url")]
    pub url: String,

    /// Directory receiving exported log files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Tracer settings.
    #[serde(default)]
    pub tracer: tracerlog_console_log::Config,
}

fn default_url() -> String {
    "about:blank".into()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            output_dir: default_output_dir(),
            tracer: tracerlog_console_log::Config::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`.
    ///
    /// Without an explicit path the platform default is used, and created
    /// with default values if it does not exist yet.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return Self::read(path);
        }

        let path = config_path();
        if path.exists() {
            Self::read(&path)
        } else {
            let config = Config::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("tracerlog").join("tracerlog.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("tracerlog")
            .join("tracerlog.toml")
    }
}
