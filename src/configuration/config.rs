use super::types::ConnectionOptions;
use crate::error_handling::types::ConfigError;
use log::{debug, error, info};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides `working_directory` when set.
pub const WORKING_DIR_ENV: &str = "PERSISTENCE_WORKING_DIR";

/// Persistence network configuration, usually read from a TOML file.
///
/// ```toml
/// default_uri = "file://persistence.db"
/// filters = "persistence.ini"
/// working_directory = "/var/lib/app"
/// ```
///
/// # Fields Overview
///
/// - `default_uri`: connection used for keys no filter rule matches
/// - `filters`: path of the filter rule file, relative to the config file
/// - `filter_rules`: the filter rules inline, instead of `filters`
/// - `working_directory`: base for relative backend locations, defaults to
///   the directory holding the config file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub default_uri: String,
    #[serde(default)]
    pub filters: Option<PathBuf>,
    #[serde(default)]
    pub filter_rules: Option<String>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    /// Directory of the file this configuration was read from.
    #[serde(skip)]
    pub base_directory: Option<PathBuf>,
}

impl NetworkConfig {
    /// A configuration with only a default connection.
    pub fn new(default_uri: &str) -> Self {
        Self {
            default_uri: default_uri.to_string(),
            filters: None,
            filter_rules: None,
            working_directory: None,
            base_directory: None,
        }
    }

    /// Reads a TOML configuration file, then applies `PERSISTENCE_WORKING_DIR`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| {
            error!("Unable to read configuration {}: {}", path.display(), e);
            ConfigError::IoError(e)
        })?;
        let mut config = Self::from_toml(&text)?;
        config.base_directory = path.parent().map(Path::to_path_buf);
        config.apply_env_overrides();
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: NetworkConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.filters.is_some() && self.filter_rules.is_some() {
            return Err(ConfigError::ConflictingSources(
                "only one of `filters` and `filter_rules` may be set".into(),
            ));
        }
        if self.default_uri.trim().is_empty() {
            return Err(ConfigError::InvalidUri("`default_uri` is empty".into()));
        }
        Ok(())
    }

    /// Applies `PERSISTENCE_WORKING_DIR`, if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(WORKING_DIR_ENV) {
            debug!("Using working directory from {}: {}", WORKING_DIR_ENV, dir);
            self.working_directory = Some(PathBuf::from(dir));
        }
    }

    fn relative_to_base(&self, path: &Path) -> PathBuf {
        match &self.base_directory {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// The filter rules, loading them from `filters` when needed.
    pub fn filter_text(&self) -> Result<String, ConfigError> {
        if let Some(rules) = &self.filter_rules {
            return Ok(rules.clone());
        }
        match &self.filters {
            Some(path) => {
                let path = self.relative_to_base(path);
                fs::read_to_string(&path).map_err(|e| {
                    error!("Unable to read filter rules {}: {}", path.display(), e);
                    ConfigError::IoError(e)
                })
            }
            None => Ok(String::new()),
        }
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        match (&self.working_directory, &self.base_directory) {
            (Some(dir), _) => ConnectionOptions::new(self.relative_to_base(dir)),
            (None, Some(base)) => ConnectionOptions::new(base),
            (None, None) => ConnectionOptions::default(),
        }
    }
}
