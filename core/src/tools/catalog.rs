//! Tool catalog: the named set of tools a model may request

use crate::error::ToolError;
use crate::model::ToolDefinition;
use crate::tools::Tool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of tools keyed by unique name.
///
/// Built once at start-up, then shared read-only behind an `Arc`.
#[derive(Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails if a tool with the same name is present.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), ToolError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register an already shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        debug!(tool_name = %name, "ToolCatalog::register");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Builder-style registration
    pub fn with_tool<T: Tool + 'static>(mut self, tool: T) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool descriptors for model function calling, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }
}

impl std::fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("tools", &self.names())
            .finish()
    }
}
