// cli/src/config.rs — sighaxctl configuration (TOML)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LEGIT_FIRMWARE: &str = "NATIVE_FIRM v11.17 ARM9=0x08006000 ARM11=0x1FF80000";
pub const DEFAULT_EVIL_FIRMWARE: &str = "EVIL_FIRM payload=boot9strap ARM9=0x08006000 persist=1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub firmware: FirmwareConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FirmwareConfig {
    pub legit: String,
    pub evil: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub columns: usize,
    pub json: bool,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            legit: DEFAULT_LEGIT_FIRMWARE.into(),
            evil: DEFAULT_EVIL_FIRMWARE.into(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { columns: sighax_boot::hexdump::DEFAULT_COLUMNS, json: false }
    }
}

impl Config {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.display.columns == 0 {
            return Err(ConfigError::Invalid("display.columns must be at least 1".into()));
        }
        Ok(())
    }
}

/// Load the config at `path`, or the built-in defaults when none is named.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        tracing::debug!("no config file named, using defaults");
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    let cfg = Config::from_toml(&text, path)?;
    tracing::info!(path = %path.display(), "loaded config");
    Ok(cfg)
}
