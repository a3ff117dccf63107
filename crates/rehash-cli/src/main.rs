//! # rehash-cli
//!
//! Rewrites git object streams into a new hash space and back.
//!
//! This is the main entry point for the rehash CLI tool. It handles command parsing,
//! sets up logging and error handling, and dispatches to the appropriate command handlers.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use rehash_core::error::RehashError;
use rehash_core::ObjectKind;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod io;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Rewrite git objects into a new hash space
#[derive(Parser)]
#[command(name = "rehash", version, about = "Rewrite git objects into a new hash space")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to the nearest rehash.toml)
    #[arg(long, global = true, env = "REHASH_CONFIG", value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite source objects into the dual-hash form
    FromGit {
        /// Framed object stream, or a loose object directory
        #[arg(short, long)]
        input: Utf8PathBuf,
        /// Framed stream file to write
        #[arg(short, long)]
        output: Utf8PathBuf,
        /// Target hash algorithm
        #[arg(long)]
        algorithm: Option<String>,
        /// JSON map of source hashes to target hashes for missing objects
        #[arg(long, value_name = "PATH")]
        lookup_map: Option<Utf8PathBuf>,
    },
    /// Restore dual-hash objects to their source form
    ToGit {
        /// Framed stream of rewritten objects
        #[arg(short, long)]
        input: Utf8PathBuf,
        /// Framed stream file, or loose object directory with --loose
        #[arg(short, long)]
        output: Utf8PathBuf,
        /// Target hash algorithm the input was rewritten with
        #[arg(long)]
        algorithm: Option<String>,
        /// Write a loose object directory instead of a stream
        #[arg(long)]
        loose: bool,
    },
    /// Print the source and target hash of a file
    HashObject {
        /// Object kind used in the source hash header
        #[arg(short = 't', long, default_value = "blob")]
        kind: ObjectKind,
        /// Target hash algorithm
        #[arg(long)]
        algorithm: Option<String>,
        file: Utf8PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting rehash v{}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run_cli(cli) {
        report_error(&err);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.config.as_deref())
            .await
            .context("Failed to load configuration")?;
        commands::dispatch_command(cli.command, &ctx).await?;
        Ok(())
    })
}

fn report_error(err: &anyhow::Error) {
    let formatter = ErrorFormatter::new();
    match err.chain().find_map(|cause| cause.downcast_ref::<RehashError>()) {
        Some(rehash_err) => {
            for context in err.chain().take_while(|cause| cause.downcast_ref::<RehashError>().is_none()) {
                eprintln!("{}", formatter.format_simple(&context.to_string()));
            }
            eprint!("{}", formatter.format_error(rehash_err));
        }
        None => eprintln!("{}", formatter.format_simple(&format!("{:#}", err))),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("rehash={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("rehash encountered an unexpected error: {}", panic_info);
        eprintln!("rehash crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/rehash-rs/rehash/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
