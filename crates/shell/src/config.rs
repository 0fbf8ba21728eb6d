use std::env;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use navigation::NavigationConfig;
use paths::PathContext;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefix of environment overrides, e.g. `NAVSHELL_NAVIGATION__SETTLE_DELAY_MS`.
pub const ENV_PREFIX: &str = "NAVSHELL";

lazy_static! {
    /// `NAVSHELL_DATA` replaces the platform base directory.
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{ENV_PREFIX}_DATA"))
            .ok()
            .map(PathBuf::from);
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub navigation: NavigationConfig,
    /// Session state assumed by `navshell run` when `--signed-in` is not given.
    pub start_signed_in: bool,
    /// Mirror logs to stderr while the interactive loop runs.
    pub log_to_console: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            navigation: NavigationConfig::default(),
            start_signed_in: false,
            log_to_console: false,
        }
    }
}

impl ShellConfig {
    /// Defaults, then `<project>/navshell.toml`, then `NAVSHELL_*` variables.
    pub fn load(paths: &PathContext) -> Result<Self, config::ConfigError> {
        Self::load_from(&paths.config_file(), true)
    }

    pub fn load_from(file: &Path, with_env: bool) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("navigation.settle_delay_ms", defaults.navigation.settle_delay_ms)?
            .set_default("navigation.pending_key", defaults.navigation.pending_key)?
            .set_default("start_signed_in", defaults.start_signed_in)?
            .set_default("log_to_console", defaults.log_to_console)?
            .add_source(
                config::File::from(file)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        if with_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }
        let cfg: Self = builder.build()?.try_deserialize()?;
        debug!(file = %file.display(), ?cfg, "shell configuration loaded");
        Ok(cfg)
    }
}

/// Base directory override, if `NAVSHELL_DATA` is set.
pub fn data_dir_override() -> Option<PathBuf> {
    DATA_FOLDER.clone()
}
