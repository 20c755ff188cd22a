//! CLI tool catalog

use super::{CurrentTimeTool, ReadFileTool};
use conductor_core::error::ToolError;
use conductor_core::ToolCatalog;

/// Create the catalog of every tool the CLI provides
pub fn create_cli_tool_catalog() -> Result<ToolCatalog, ToolError> {
    ToolCatalog::new()
        .with_tool(CurrentTimeTool::new())?
        .with_tool(ReadFileTool::new())
}
