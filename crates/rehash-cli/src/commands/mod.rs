//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking its resolved configuration and
//! the shared CommandContext.

use std::collections::HashMap;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use rehash_config::{ConfigLayering, ConfigLoader, ConfigSource, RehashToml};
use rehash_core::error::{RehashError, RehashResult};
use rehash_resolver::OutputStream;
use tracing::{debug, info};

pub mod from_git;
pub mod hash_object;
pub mod to_git;


use crate::io::FrameWriter;
use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    /// Configuration from rehash.toml, before overrides
    pub file_config: RehashToml,
    pub config_source: ConfigSource,
    /// `REHASH_*` variables captured at startup
    pub env_overrides: HashMap<String, String>,
}

impl CommandContext {
    /// Create a context for the process working directory
    pub async fn new(config_path: Option<&Utf8Path>) -> RehashResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| RehashError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| RehashError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("working directory is not UTF-8: {}", e),
        })?;

        Self::load(cwd, config_path, ConfigLayering::collect_env_overrides()).await
    }

    /// Create a context for `cwd` with explicit environment overrides
    pub async fn load(
        cwd: Utf8PathBuf,
        config_path: Option<&Utf8Path>,
        env_overrides: HashMap<String, String>,
    ) -> RehashResult<Self> {
        let loader = ConfigLoader::new(cwd.clone());
        let (file_config, config_source) = match config_path {
            Some(path) => loader.load_explicit(path).await?,
            None => loader.load_project_config().await?,
        };
        debug!("Configuration source: {:?}", config_source);

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            file_config,
            config_source,
            env_overrides,
        })
    }

    /// Final configuration for one command
    pub fn resolve(&self, cli_overrides: HashMap<String, String>) -> RehashResult<RehashToml> {
        let mut config =
            ConfigLayering::merge_configs(self.file_config.clone(), self.env_overrides.clone(), cli_overrides)?;
        config.anchor_paths(&self.cwd);
        Ok(config)
    }

    /// Resolve a command line path against the working directory
    pub fn path(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_relative() {
            self.cwd.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

fn overrides<const N: usize>(pairs: [(&str, Option<String>); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key.to_string(), value)))
        .collect()
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> RehashResult<()> {
    match command {
        Commands::FromGit {
            input,
            output,
            algorithm,
            lookup_map,
        } => {
            let config = ctx.resolve(overrides([
                ("algorithm", algorithm),
                ("lookup-map", lookup_map.map(String::from)),
            ]))?;
            info!("Rewriting {} into {} ({})", input, output, config.target.algorithm);
            from_git::execute(&ctx.path(&input), &ctx.path(&output), &config, ctx)
                .await
                .map(drop)
        }
        Commands::ToGit {
            input,
            output,
            algorithm,
            loose,
        } => {
            let config = ctx.resolve(overrides([
                ("algorithm", algorithm),
                ("loose", loose.then(|| "true".to_string())),
            ]))?;
            info!("Restoring {} into {} ({})", input, output, config.output.format);
            to_git::execute(&ctx.path(&input), &ctx.path(&output), &config, ctx)
                .await
                .map(drop)
        }
        Commands::HashObject { kind, algorithm, file } => {
            let config = ctx.resolve(overrides([("algorithm", algorithm)]))?;
            hash_object::execute(kind, &ctx.path(&file), &config, ctx).await.map(drop)
        }
    }
}

/// Drain a pipeline's output into a framed stream
pub async fn write_stream<W: Write>(mut stream: OutputStream, writer: &mut FrameWriter<W>) -> RehashResult<usize> {
    while let Some(object) = stream.next().await {
        writer.write_object(&object?)?;
    }
    Ok(writer.written())
}
