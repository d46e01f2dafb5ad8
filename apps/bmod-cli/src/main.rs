//! # bmod-cli
//!
//! Command-line interface for agent behavior modification.
//!
//! - `bmod policy add/list/remove`: manage the active behavior policies
//! - `bmod translate`: dry-run a plain-language request into a rule
//! - `bmod check`: evaluate one action request, as an agent would
//! - `bmod audit tail/verify/query`: inspect the tamper-evident audit trail

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bmod_runtime::RuntimeConfig;

/// Behavior modification CLI: change what an agent may do, and see why.
#[derive(Parser)]
#[command(name = "bmod", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add, list, and remove behavior policies.
    Policy {
        #[command(subcommand)]
        command: commands::policy::PolicyCommands,
    },
    /// Show the rule a plain-language request translates to, without adding it.
    Translate {
        /// The request, e.g. "Never delete files".
        text: String,
    },
    /// Evaluate an action request against the active policies.
    Check(commands::check::CheckArgs),
    /// Inspect the audit trail.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

fn init_logging(json: bool) {
    // Logs go to stderr so command output on stdout stays clean.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let config = RuntimeConfig::load(&root)?;
    tracing::debug!(root = %root.display(), "loaded runtime config");

    match &cli.command {
        Commands::Policy { command } => commands::policy::execute(command, &config),
        Commands::Translate { text } => commands::translate::execute(text),
        Commands::Check(args) => commands::check::execute(args, &config),
        Commands::Audit { command } => commands::audit::execute(command, &config),
    }
}
