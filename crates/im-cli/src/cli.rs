//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// idmig - backfill time-ordered UUIDv7 identifiers on a live table
#[derive(Parser, Debug)]
#[command(name = "idmig")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Database URL (postgres://..., duckdb://path, or a DuckDB file path)
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Config file path (default: idmig.yml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assign identifiers to rows that lack one, then resolve dependent cursors
    Backfill(BackfillArgs),

    /// Show pending and assigned counts per table
    Status(TableArgs),

    /// Check that identifier columns are complete, unique and ordered
    Verify(TableArgs),
}

/// Arguments for the backfill command
#[derive(Args, Debug, Default)]
pub struct BackfillArgs {
    /// Rows per batch transaction (overrides config)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Compute identifiers without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Number of would-be assignments shown by a dry run (overrides config)
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Stop after this many committed batches per table
    #[arg(long)]
    pub max_batches: Option<usize>,

    /// Only migrate this table (and its dependents)
    #[arg(short, long)]
    pub table: Option<String>,

    /// Skip the dependent-cursor pass
    #[arg(long)]
    pub skip_dependents: bool,
}

/// Arguments for commands that work on one or all configured tables
#[derive(Args, Debug, Default)]
pub struct TableArgs {
    /// Only report on this table (and its dependents)
    #[arg(short, long)]
    pub table: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
