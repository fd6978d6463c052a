//! Loading [`RikkaConfig`] with figment.
//!
//! Layers, lowest to highest:
//!
//! 1. [`RikkaConfig::default`]
//! 2. `rikka.toml`: the file passed to [`ConfigLoader::file`], or else the
//!    first one found in the current directory and `<config dir>/rikka`
//! 3. `RIKKA_*` environment variables, with `__` between nested keys:
//!    `RIKKA_BOT__PREFIX=!`, `RIKKA_AUDIT__RETENTION__MAX_AGE_DAYS=30`
//!
//! The merged result is validated before it is returned.

use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::{debug, info};

use super::error::{ConfigError, ConfigResult};
use super::schema::RikkaConfig;
use super::validation::validate_config;

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "rikka.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "RIKKA_";

/// Locates and merges the configuration layers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
    env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Searches the current directory, then `<config dir>/rikka`.
    pub fn new() -> Self {
        let search_dirs = std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("rikka")))
            .collect();
        Self {
            file: None,
            search_dirs,
            env: true,
        }
    }

    /// Loads exactly `path` instead of searching. A missing file is an error.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Searches only `dir` for `rikka.toml`.
    pub fn search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs = vec![dir.into()];
        self
    }

    /// Ignores `RIKKA_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    fn locate(&self) -> ConfigResult<Option<PathBuf>> {
        match &self.file {
            Some(path) if path.is_file() => Ok(Some(path.clone())),
            Some(path) => Err(ConfigError::FileNotFound(path.clone())),
            None => Ok(self
                .search_dirs
                .iter()
                .map(|dir| dir.join(CONFIG_FILE_NAME))
                .find(|path| path.is_file())),
        }
    }

    /// Returns the merged, unvalidated layers.
    pub fn figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(RikkaConfig::default()));

        match self.locate()? {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                figment = figment.merge(Toml::file(path));
            }
            None => debug!(dirs = ?self.search_dirs, "No {CONFIG_FILE_NAME} found, using defaults"),
        }

        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        Ok(figment)
    }

    /// Loads and validates the configuration.
    pub fn load(&self) -> ConfigResult<RikkaConfig> {
        let config: RikkaConfig = self
            .figment()?
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        validate_config(&config)?;

        debug!(
            prefix = %config.bot.prefix,
            level = %config.logging.level,
            bucket = %config.audit.bucket,
            "Configuration loaded"
        );
        Ok(config)
    }
}
