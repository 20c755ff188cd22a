//! Tool system: catalog, invocation and the tool trait

pub mod base;
pub mod catalog;
pub mod invoker;

pub use base::{
    FnTool, Tool, ToolArguments, ToolCallRequest, ToolOutcome, ToolResult, TOOL_FAILURE_OUTPUT,
};
pub use catalog::ToolCatalog;
pub use invoker::{BatchOutcome, ToolInvoker};
