//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Import bank statements without the duplicates
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Bank statement parser and duplicate filter", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Import config file (defaults to ~/.local/share/tally/config/import.toml
    /// if present, else the built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a statement and print its transactions as JSON
    Parse {
        /// CSV or PDF statement
        #[arg(short, long)]
        file: PathBuf,

        /// File type: csv or pdf (inferred from the extension if not specified)
        #[arg(short = 't', long = "type")]
        file_type: Option<String>,
    },

    /// Parse, drop duplicates of existing transactions, and categorize
    Import {
        /// CSV or PDF statement
        #[arg(short, long)]
        file: PathBuf,

        /// File type: csv or pdf (inferred from the extension if not specified)
        #[arg(short = 't', long = "type")]
        file_type: Option<String>,

        /// JSON array of already-stored transactions to check against
        #[arg(short, long)]
        existing: Option<PathBuf>,

        /// Duplicate date tolerance in days (overrides config)
        #[arg(long)]
        tolerance: Option<i64>,

        /// Write the import outcome JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip AI categorization and use the fallback rules
        #[arg(long)]
        no_ai: bool,
    },

    /// Show the normalized merchant name for a description
    Normalize {
        /// Raw transaction description
        description: String,
    },

    /// Flag likely duplicates between two transaction lists
    Dedup {
        /// JSON array of transactions
        #[arg(long)]
        left: PathBuf,

        /// JSON array of transactions
        #[arg(long)]
        right: PathBuf,

        /// Date tolerance in days (overrides config)
        #[arg(long)]
        tolerance: Option<i64>,
    },

    /// Show the effective configuration
    Config,

    /// Manage AI prompts
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List prompts and their override status
    List,

    /// Show the content of a prompt
    Show {
        /// Prompt ID (e.g. reconstruct_statement)
        id: String,
    },
}
