//! Command handlers -- one module per subcommand

pub mod analyze;
pub mod config;
pub mod files;
pub mod rules;
pub mod tail;

use std::path::{Path, PathBuf};

use logwatch_core::config::LogwatchConfig;
use logwatch_core::error::{ConfigError, LogwatchError};
use logwatch_tailer::{RuleLoader, RuleSetConfig};
use tracing::debug;

use crate::error::CliError;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "logwatch.toml";

/// Effective settings shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Loaded (or default) configuration.
    pub config: LogwatchConfig,
    /// Where the configuration came from, for display.
    pub config_source: String,
    /// Rule file after `--rules` override.
    pub rules_path: PathBuf,
}

impl CommandContext {
    /// Resolve configuration and rule file path.
    ///
    /// An explicit `--config` must load. Without it, `logwatch.toml` in the
    /// working directory is used when present, otherwise built-in defaults
    /// plus environment overrides.
    pub async fn load(
        config_path: Option<&Path>,
        rules_override: Option<&Path>,
    ) -> Result<Self, CliError> {
        let (config, config_source) = match config_path {
            Some(path) => (
                LogwatchConfig::load(path).await?,
                path.display().to_string(),
            ),
            None => match LogwatchConfig::load(DEFAULT_CONFIG_PATH).await {
                Ok(config) => (config, DEFAULT_CONFIG_PATH.to_owned()),
                Err(LogwatchError::Config(ConfigError::FileNotFound { .. })) => {
                    debug!("no logwatch.toml found, using defaults");
                    let mut config = LogwatchConfig::default();
                    config.apply_env_overrides();
                    config.validate()?;
                    (config, "(defaults)".to_owned())
                }
                Err(e) => return Err(e.into()),
            },
        };

        let rules_path = rules_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&config.tailer.rules_path));

        Ok(Self {
            config,
            config_source,
            rules_path,
        })
    }

    /// Read and parse the rule file (no regex compilation).
    pub async fn load_rule_set(&self) -> Result<RuleSetConfig, CliError> {
        debug!(path = %self.rules_path.display(), "loading rule file");
        Ok(RuleLoader::load_file(&self.rules_path).await?)
    }
}
