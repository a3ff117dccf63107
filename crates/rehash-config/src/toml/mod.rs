//! rehash.toml configuration parsing and serialization

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use rehash_core::error::RehashError;
use rehash_core::HashAlgorithm;
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Complete rehash.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RehashToml {
    /// Target hash settings
    #[serde(default)]
    pub target: TargetSection,

    /// External hash lookup
    #[serde(default)]
    pub lookup: LookupSection,

    /// Output settings
    #[serde(default)]
    pub output: OutputSection,
}

/// `[target]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    /// Target hash algorithm
    #[serde(default)]
    pub algorithm: HashAlgorithm,
}

/// `[lookup]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupSection {
    /// JSON file mapping source hex to target hex.
    ///
    /// Relative paths are resolved against the directory of the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<Utf8PathBuf>,
}

/// `[output]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Layout used when writing source-form objects
    #[serde(default)]
    pub format: OutputFormat,
}

/// How restored objects are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Single framed object stream
    #[default]
    Stream,
    /// Loose object directory (`xx/yyyy...` zlib files)
    Loose,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Stream => f.write_str("stream"),
            OutputFormat::Loose => f.write_str("loose"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = RehashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" => Ok(OutputFormat::Stream),
            "loose" => Ok(OutputFormat::Loose),
            _ => Err(RehashError::ConfigValidation {
                field: "output.format".to_string(),
                reason: format!("expected 'stream' or 'loose', got '{}'", s),
            }),
        }
    }
}

impl RehashToml {
    /// Resolve a relative lookup map path against `base`
    pub fn anchor_paths(&mut self, base: &Utf8Path) {
        if let Some(map) = &self.lookup.map {
            if map.is_relative() {
                self.lookup.map = Some(base.join(map));
            }
        }
    }
}

/// Parse TOML string to RehashToml configuration
pub fn parse_rehash_toml(content: &str) -> ConfigResult<RehashToml> {
    let config: RehashToml = ::toml::from_str(content).map_err(|e| RehashError::TomlParse {
        message: format!("TOML parsing error: {}", e),
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize RehashToml to TOML string
pub fn serialize_rehash_toml(config: &RehashToml) -> ConfigResult<String> {
    ::toml::to_string_pretty(config).map_err(|e| RehashError::TomlParse {
        message: format!("TOML serialization error: {}", e),
    })
}

/// Validate configuration completeness
pub fn validate_config(config: &RehashToml) -> ConfigResult<()> {
    if let Some(map) = &config.lookup.map {
        if map.as_str().is_empty() {
            return Err(RehashError::ConfigValidation {
                field: "lookup.map".to_string(),
                reason: "path must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

/// Load and parse rehash.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<RehashToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RehashError::io(format!("Failed to read {}", path), e))?;

    let mut config = parse_rehash_toml(&content).map_err(|e| match e {
        RehashError::TomlParse { message } => RehashError::TomlParse {
            message: format!("In file {}: {}", path, message),
        },
        other => other,
    })?;
    if let Some(dir) = path.parent() {
        config.anchor_paths(dir);
    }
    Ok(config)
}
