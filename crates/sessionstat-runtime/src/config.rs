use crate::pipeline::PipelineConfig;
use crate::service::ServiceConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "SESSIONSTAT_CONFIG";

/// Resolve the config file path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. SESSIONSTAT_CONFIG environment variable (with tilde expansion)
/// 3. XDG config directory (recommended default)
/// 4. ~/.sessionstat/config.toml (fallback for systems without XDG)
pub fn resolve_config_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(config_dir) = dirs::config_dir() {
        return Ok(config_dir.join("sessionstat").join("config.toml"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".sessionstat").join("config.toml"));
    }

    Err(Error::Config(
        "Could not determine config path: no HOME directory or XDG config directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP transport binds to
    pub listen_address: String,
    /// Trailing window after which a completed session stops counting
    pub retention_secs: u64,
    /// Capacity of the event and session buffers
    pub buffer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:8080".to_string(),
            retention_secs: 600,
            buffer_capacity: 1024,
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        let config_path = resolve_config_path(explicit_path)?;
        Self::load_from(&config_path)
    }

    /// Missing files yield the defaults; fields absent from the file keep
    /// their default values.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retention_secs == 0 {
            return Err(Error::Config("retention_secs must be positive".to_string()));
        }
        if self.buffer_capacity == 0 {
            return Err(Error::Config("buffer_capacity must be positive".to_string()));
        }
        if self.retention_ms() == i64::MAX {
            return Err(Error::Config(format!(
                "retention_secs {} is out of range",
                self.retention_secs
            )));
        }
        Ok(())
    }

    pub fn retention_ms(&self) -> i64 {
        i64::try_from(self.retention_secs)
            .ok()
            .and_then(|secs| secs.checked_mul(1_000))
            .unwrap_or(i64::MAX)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            retention_ms: self.retention_ms(),
            buffer_capacity: self.buffer_capacity,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            buffer_capacity: self.buffer_capacity,
        }
    }
}
