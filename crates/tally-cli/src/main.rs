//! Tally CLI - Bank statement import
//!
//! Usage:
//!   tally parse --file jan.csv                       Print parsed transactions
//!   tally import --file jan.pdf --existing db.json   Dedup and categorize
//!   tally normalize "AMAZON.COM*ABC123"              Normalize a merchant name
//!   tally dedup --left a.json --right b.json         Flag duplicate pairs

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Parse { file, file_type } => {
            commands::cmd_parse(config, &file, file_type.as_deref()).await
        }
        Commands::Import {
            file,
            file_type,
            existing,
            tolerance,
            output,
            no_ai,
        } => {
            commands::cmd_import(
                config,
                &file,
                file_type.as_deref(),
                existing.as_deref(),
                tolerance,
                output.as_deref(),
                no_ai,
            )
            .await
        }
        Commands::Normalize { description } => commands::cmd_normalize(config, &description),
        Commands::Dedup {
            left,
            right,
            tolerance,
        } => commands::cmd_dedup(config, &left, &right, tolerance),
        Commands::Config => commands::cmd_config(config),
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { id }) => commands::cmd_prompts_show(&id),
        },
    }
}
