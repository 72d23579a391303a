//! Bootstrap settings
//!
//! Names of the directories, files and resources the bootstrap looks for.
//! Defaults are set in code and can be overridden through `LOGBOOT_*`
//! environment variables, e.g. `LOGBOOT_LOGS_DIR_NAME=log`.

use crate::error::BootstrapError;
use crate::resources::{DEFAULT_RESOURCE, LOGGERS_RESOURCE};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment prefix for settings overrides.
pub const ENV_PREFIX: &str = "LOGBOOT";

/// Name of the published variable holding the logs folder.
pub const LOGS_FOLDER_VARIABLE: &str = "logs.folder";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BootstrapSettings {
    /// Directory created under the logs root
    pub logs_dir_name: String,

    /// Directory under the config root holding external configuration
    pub config_dir: PathBuf,

    /// External base file inside `config_dir`
    pub base_file_name: String,

    /// Directory inside `config_dir` holding per-logger files
    pub loggers_dir_name: String,

    /// Extension (without dot) of per-logger files
    pub loggers_extension: String,

    /// Resource name of the bundled default configuration
    pub default_resource: String,

    /// Resource name of bundled per-component logger configuration
    pub loggers_resource: String,

    /// Name of the variable the logs folder is published under
    pub published_variable: String,

    /// Publish the logs folder into the process environment
    pub publish_to_env: bool,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            logs_dir_name: "logs".to_string(),
            config_dir: PathBuf::from("config").join("log4j"),
            base_file_name: "log4j.properties".to_string(),
            loggers_dir_name: "loggers".to_string(),
            loggers_extension: "properties".to_string(),
            default_resource: DEFAULT_RESOURCE.to_string(),
            loggers_resource: LOGGERS_RESOURCE.to_string(),
            published_variable: LOGS_FOLDER_VARIABLE.to_string(),
            publish_to_env: true,
        }
    }
}

/// Create a Config builder with the default settings applied.
fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = BootstrapSettings::default();
    Config::builder()
        .set_default("logs_dir_name", defaults.logs_dir_name)?
        .set_default(
            "config_dir",
            defaults.config_dir.to_string_lossy().into_owned(),
        )?
        .set_default("base_file_name", defaults.base_file_name)?
        .set_default("loggers_dir_name", defaults.loggers_dir_name)?
        .set_default("loggers_extension", defaults.loggers_extension)?
        .set_default("default_resource", defaults.default_resource)?
        .set_default("loggers_resource", defaults.loggers_resource)?
        .set_default("published_variable", defaults.published_variable)?
        .set_default("publish_to_env", defaults.publish_to_env)
}

impl BootstrapSettings {
    /// Load settings from defaults and `LOGBOOT_*` environment variables.
    pub fn load() -> Result<Self, BootstrapError> {
        let settings = builder_with_defaults()?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<BootstrapSettings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Like [`load`](Self::load), falling back to defaults on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid bootstrap settings, using defaults");
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), BootstrapError> {
        if self.logs_dir_name.trim().is_empty() {
            return Err(BootstrapError::ConfigError(
                "logs_dir_name cannot be empty".to_string(),
            ));
        }
        if self.published_variable.is_empty()
            || self.published_variable.contains(['=', '\0'])
        {
            return Err(BootstrapError::ConfigError(format!(
                "published_variable is not a valid variable name: {:?}",
                self.published_variable
            )));
        }
        if self.loggers_extension.is_empty() {
            return Err(BootstrapError::ConfigError(
                "loggers_extension cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// `<logs_root>/<logs_dir_name>`
    pub fn logs_dir(&self, logs_root: &Path) -> PathBuf {
        logs_root.join(&self.logs_dir_name)
    }

    /// `<config_root>/<config_dir>/<base_file_name>`
    pub fn base_file(&self, config_root: &Path) -> PathBuf {
        config_root.join(&self.config_dir).join(&self.base_file_name)
    }

    /// `<config_root>/<config_dir>/<loggers_dir_name>`
    pub fn loggers_dir(&self, config_root: &Path) -> PathBuf {
        config_root
            .join(&self.config_dir)
            .join(&self.loggers_dir_name)
    }

    /// Suffix matched against per-logger file names, dot included.
    pub fn loggers_suffix(&self) -> String {
        format!(".{}", self.loggers_extension)
    }
}
