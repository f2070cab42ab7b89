//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `common` - Shared utilities (config loading, transaction JSON files) and `config`
//! - `import` - Statement commands (parse, import)
//! - `dedup` - Duplicate and merchant commands (dedup, normalize)
//! - `prompts` - Prompt library commands

pub mod common;
pub mod dedup;
pub mod import;
pub mod prompts;

// Re-export command functions for main.rs
pub use common::*;
pub use dedup::*;
pub use import::*;
pub use prompts::*;
