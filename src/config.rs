//! Process configuration, read from an optional TOML file.
//!
//! Every field has a default, so a missing file or an empty table is valid.
//! Per-user domain settings (luteal phase length and friends) live in the store.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::KdfParams;
use crate::store::{file, StoreError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the data file; platform default when unset.
    pub data_dir: Option<PathBuf>,
    /// How long a cached cycle read stays fresh.
    pub cache_freshness_secs: u64,
    /// Filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub kdf: KdfSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            cache_freshness_secs: 300,
            log_filter: "femcycle=info".to_string(),
            kdf: KdfSettings::default(),
        }
    }
}

/// Argon2id cost of the store key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfSettings {
    fn default() -> Self {
        let params = KdfParams::default();
        Self {
            memory_kib: params.memory_kib,
            iterations: params.iterations,
            parallelism: params.parallelism,
        }
    }
}

impl Settings {
    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.cache_freshness_secs == 0 {
            return Err(ConfigError::Validation(
                "cache_freshness_secs must be greater than 0".to_string(),
            ));
        }
        if self.kdf.iterations == 0 || self.kdf.parallelism == 0 {
            return Err(ConfigError::Validation(
                "kdf iterations and parallelism must be greater than 0".to_string(),
            ));
        }
        if self.kdf.memory_kib < 8 * self.kdf.parallelism {
            return Err(ConfigError::Validation(
                "kdf memory_kib must be at least 8 * parallelism".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_freshness(&self) -> Duration {
        Duration::from_secs(self.cache_freshness_secs)
    }

    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            memory_kib: self.kdf.memory_kib,
            iterations: self.kdf.iterations,
            parallelism: self.kdf.parallelism,
        }
    }

    pub fn store_path(&self) -> Result<PathBuf, StoreError> {
        match &self.data_dir {
            Some(dir) => Ok(file::path_in(dir)),
            None => file::default_path(),
        }
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("femcycle").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.cache_freshness(), Duration::from_secs(300));
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let settings = Settings::from_toml(
            r#"
            data_dir = "/tmp/femcycle"
            [kdf]
            iterations = 1
            "#,
        )
        .unwrap();

        assert_eq!(settings.data_dir, Some(PathBuf::from("/tmp/femcycle")));
        assert_eq!(settings.kdf.iterations, 1);
        assert_eq!(settings.kdf.memory_kib, 65536);
        assert_eq!(
            settings.store_path().unwrap(),
            PathBuf::from("/tmp/femcycle/data.femcycle")
        );
    }

    #[test]
    fn zero_freshness_is_rejected() {
        assert!(matches!(
            Settings::from_toml("cache_freshness_secs = 0"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn file_on_disk_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_filter = \"femcycle=debug\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.log_filter, "femcycle=debug");
    }
}
