//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered in order:
//! built-in defaults, `batch-kernel.{toml,yaml}`, `batch-kernel.<environment>.{toml,yaml}`,
//! then `BATCH_KERNEL__<FIELD>` environment variables.

use super::error::{ConfigResult, ConfigurationError};
use super::KernelConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_STEM: &str = "batch-kernel";
const ENV_PREFIX: &str = "BATCH_KERNEL";
const ENV_SEPARATOR: &str = "__";

/// Loaded and validated kernel configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: KernelConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_sources(config_dir, &environment, true)
    }

    /// Load configuration with an explicit environment, optionally ignoring
    /// environment variable overrides. Useful for tests that must not depend on
    /// the process environment.
    pub fn load_from_sources(
        config_dir: Option<PathBuf>,
        environment: &str,
        apply_env_overrides: bool,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading batch kernel configuration"
        );

        let mut builder = Config::builder()
            .set_default("environment", environment)
            .map_err(|e| ConfigurationError::load_error("defaults", e))?
            .add_source(File::with_name(&Self::file_stem(&config_directory, None)).required(false))
            .add_source(
                File::with_name(&Self::file_stem(&config_directory, Some(environment)))
                    .required(false),
            );

        if apply_env_overrides {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let merged = builder
            .build()
            .map_err(|e| ConfigurationError::load_error(config_directory.display().to_string(), e))?;

        let config: KernelConfig =
            merged
                .try_deserialize()
                .map_err(|e| ConfigurationError::DeserializationError {
                    error: e.to_string(),
                })?;

        config.validate()?;

        info!(
            environment = %config.environment,
            shutdown_grace_period_ms = config.shutdown_grace_period_ms,
            max_concurrent_jobs = config.max_concurrent_jobs,
            publish_events = config.publish_events,
            "⚙️ CONFIG: Batch kernel configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Load configuration from one explicit file, failing if it does not exist
    pub fn load_from_file(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        if !path.is_file() {
            return Err(ConfigurationError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let merged = Config::builder()
            .add_source(File::from(path))
            .build()
            .map_err(|e| ConfigurationError::load_error(path.display().to_string(), e))?;

        let config: KernelConfig =
            merged
                .try_deserialize()
                .map_err(|e| ConfigurationError::DeserializationError {
                    error: e.to_string(),
                })?;
        config.validate()?;

        let config_directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_directory);

        Ok(Arc::new(ConfigManager {
            environment: config.environment.clone(),
            config,
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (tests, embedding)
    pub fn from_config(config: KernelConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            environment: config.environment.clone(),
            config,
            config_directory: Self::default_config_directory(),
        }))
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("BATCH_KERNEL_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        env::var("BATCH_KERNEL_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn file_stem(directory: &Path, environment: Option<&str>) -> String {
        let file_name = match environment {
            Some(env) => format!("{CONFIG_FILE_STEM}.{env}"),
            None => CONFIG_FILE_STEM.to_string(),
        };
        directory.join(file_name).to_string_lossy().into_owned()
    }
}
