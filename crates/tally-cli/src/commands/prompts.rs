//! Prompts-related command implementations

use anyhow::Result;
use tally_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

/// List the prompts each import step sends, and where overrides live
pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();

    println!(
        "{:<24} {:<20} {:>3}  {:<26} {}",
        "PROMPT", "IMPORT STEP", "V", "PLACEHOLDERS", "SOURCE"
    );
    for info in library.list() {
        let source = match &info.override_path {
            Some(path) => path.display().to_string(),
            None => "built-in".to_string(),
        };
        println!(
            "{:<24} {:<20} {:>3}  {:<26} {}",
            info.id,
            info.import_step,
            info.version,
            placeholder_list(info.placeholders),
            source
        );
    }

    match default_prompts_dir() {
        Some(dir) => println!("\nOverrides are read from {}/<prompt>.md", dir.display()),
        None => println!("\nNo data directory on this platform; overrides are disabled"),
    }
    Ok(())
}

/// Show the content of a specific prompt
pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let Some(id) = PromptId::all().iter().find(|id| id.as_str() == prompt_id) else {
        let known: Vec<&str> = PromptId::all().iter().map(|id| id.as_str()).collect();
        anyhow::bail!(
            "Unknown prompt ID: {} (expected one of: {})",
            prompt_id,
            known.join(", ")
        );
    };

    let mut library = PromptLibrary::new();
    let prompt = library.get(*id)?;

    println!(
        "{} v{} ({}, used for {})",
        prompt.metadata.id,
        prompt.metadata.version,
        prompt.metadata.task_type,
        id.import_step()
    );
    println!("Placeholders: {}", placeholder_list(id.placeholders()));
    if let Some(path) = &prompt.override_path {
        println!("Override: {}", path.display());
    }
    println!();
    println!("{}", prompt.content);

    Ok(())
}

/// `{{a}} {{b}}` for display
pub fn placeholder_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("{{{{{}}}}}", name))
        .collect::<Vec<_>>()
        .join(" ")
}
