//! Tools listing command

use anyhow::Result;
use colored::Colorize;
use tracing::info;

/// Show available tools
pub async fn tools_command() -> Result<()> {
    info!("Listing available tools");

    let catalog = crate::tools::create_cli_tool_catalog()?;

    println!("{}\n", "Available Tools".bold());

    for definition in catalog.definitions() {
        println!("  {}", definition.name.bold());
        // First line of the description only
        let first_line = definition
            .description
            .lines()
            .next()
            .unwrap_or(&definition.description);
        println!("    {}\n", first_line);
    }

    Ok(())
}
