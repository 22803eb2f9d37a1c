//! idmig CLI - batched, resumable UUIDv7 identifier backfill

use clap::Parser;

mod cli;
mod commands;
mod context;
#[cfg(test)]
mod test_fixtures;

use cli::Cli;
use commands::common::exit_code_for;
use commands::{backfill, status, verify};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match &cli.command {
        cli::Commands::Backfill(args) => backfill::execute(args, &cli.global).await,
        cli::Commands::Status(args) => status::execute(args, &cli.global).await,
        cli::Commands::Verify(args) => verify::execute(args, &cli.global).await,
    };

    if let Err(err) = result {
        let code = exit_code_for(&err);
        let message = format!("{:#}", err);
        if !message.is_empty() {
            eprintln!("Error: {}", message);
        }
        std::process::exit(code);
    }
}
