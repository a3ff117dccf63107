//! Configuration layering and environment overrides
//!
//! Precedence, lowest first: built-in defaults, rehash.toml, `REHASH_*`
//! environment variables, command line flags.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use rehash_core::error::RehashError;
use tracing::debug;

use crate::toml::{OutputFormat, RehashToml};
use crate::{ConfigResult, CONFIG_FILE_NAME};

/// Environment variable overriding `target.algorithm`
pub const ENV_ALGORITHM: &str = "REHASH_ALGORITHM";
/// Environment variable overriding `lookup.map`
pub const ENV_LOOKUP_MAP: &str = "REHASH_LOOKUP_MAP";
/// Environment variable overriding `output.format`
pub const ENV_OUTPUT_FORMAT: &str = "REHASH_OUTPUT_FORMAT";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Built-in defaults, no file found
    Defaults,
    /// Project rehash.toml file
    ProjectToml(Utf8PathBuf),
    /// File given with `--config`
    Explicit(Utf8PathBuf),
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Load the nearest rehash.toml, falling back to defaults
    pub async fn load_project_config(&self) -> ConfigResult<(RehashToml, ConfigSource)> {
        match self.find_config_path(CONFIG_FILE_NAME) {
            Some(path) => {
                debug!("Using configuration from {}", path);
                let config = crate::toml::load_from_file(&path).await?;
                Ok((config, ConfigSource::ProjectToml(path)))
            }
            None => Ok((RehashToml::default(), ConfigSource::Defaults)),
        }
    }

    /// Load a configuration file named on the command line; it must exist
    pub async fn load_explicit(&self, path: &Utf8Path) -> ConfigResult<(RehashToml, ConfigSource)> {
        let path = if path.is_relative() {
            self.cwd.join(path)
        } else {
            path.to_path_buf()
        };
        if !path.exists() {
            return Err(RehashError::ConfigValidation {
                field: "config".to_string(),
                reason: format!("configuration file {} does not exist", path),
            });
        }
        let config = crate::toml::load_from_file(&path).await?;
        Ok((config, ConfigSource::Explicit(path)))
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn find_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());
        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }
        None
    }

    /// Path of the nearest configuration file, or where one would go
    pub fn resolve_config_path(&self, filename: &str) -> Utf8PathBuf {
        self.find_config_path(filename)
            .unwrap_or_else(|| self.cwd.join(filename))
    }
}

impl ConfigLayering {
    /// Merge environment and CLI overrides into a loaded configuration
    pub fn merge_configs(
        file_config: RehashToml,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<RehashToml> {
        let mut merged = file_config;

        Self::apply_env_overrides(&mut merged, &env_overrides)?;

        // CLI flags have the highest priority
        Self::apply_cli_overrides(&mut merged, &cli_overrides)?;

        crate::toml::validate_config(&merged)?;
        Ok(merged)
    }

    fn apply_env_overrides(config: &mut RehashToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                ENV_ALGORITHM => {
                    config.target.algorithm = value.parse().map_err(|e| with_field(ENV_ALGORITHM, e))?;
                }
                ENV_LOOKUP_MAP => {
                    config.lookup.map = Some(Utf8PathBuf::from(value));
                }
                ENV_OUTPUT_FORMAT => {
                    config.output.format = value.parse().map_err(|e| with_field(ENV_OUTPUT_FORMAT, e))?;
                }
                _ => {
                    // Unknown environment variable, ignore
                }
            }
        }

        Ok(())
    }

    fn apply_cli_overrides(config: &mut RehashToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "algorithm" => {
                    config.target.algorithm = value.parse().map_err(|e| with_field("--algorithm", e))?;
                }
                "lookup-map" => {
                    config.lookup.map = Some(Utf8PathBuf::from(value));
                }
                "loose" => {
                    config.output.format = OutputFormat::Loose;
                }
                _ => {
                    // Unknown CLI override, ignore
                }
            }
        }

        Ok(())
    }

    /// Collect `REHASH_*` environment variables
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("REHASH_"))
            .collect()
    }
}

fn with_field(field: &str, err: RehashError) -> RehashError {
    match err {
        RehashError::ConfigValidation { reason, .. } => RehashError::ConfigValidation {
            field: field.to_string(),
            reason,
        },
        other => other,
    }
}
