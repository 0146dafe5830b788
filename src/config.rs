use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Deserializer};

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/onewol/config.yml";
pub const DEFAULT_STORE_PATH: &str = "~/.local/share/onewol/macs.json";

/// Deserializes an absent field as None and an unset field as T::default.
///
/// This avoid having Option<Option<T>> as in serde_with::rust::double_option
pub fn deserialize_absent_or_null<'de, D, T: Default>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.or(Some(T::default())))
}

pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("cannot expand path '{path}'"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}


#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: LevelFilter,
}

fn default_level() -> LevelFilter {
    LevelFilter::Info
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default, deserialize_with = "deserialize_absent_or_null")]
    pub store: Option<StoreConfig>,

    #[serde(default, deserialize_with = "deserialize_absent_or_null")]
    pub log: Option<LogConfig>,
}

impl Config {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() { return Ok(Self::default()); }
        serde_yml::from_str(raw).context("invalid configuration")
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw)
                .with_context(|| format!("in {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::trace!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        let path = self.store.as_ref().map_or(DEFAULT_STORE_PATH, |s| s.path.as_str());
        expand_path(path)
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log.as_ref().map_or_else(default_level, |l| l.level)
    }
}
