//! Tools the CLI offers to the model

pub mod clock;
pub mod read_file;
pub mod registry;

pub use clock::CurrentTimeTool;
pub use read_file::ReadFileTool;
pub use registry::create_cli_tool_catalog;
