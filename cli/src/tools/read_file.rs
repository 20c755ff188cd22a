//! Bounded local file reading tool

use async_trait::async_trait;
use conductor_core::error::ToolError;
use conductor_core::tools::{Tool, ToolArguments, ToolOutcome};
use serde_json::json;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Default number of bytes returned when `max_bytes` is not given
const DEFAULT_MAX_BYTES: usize = 64 * 1024;

/// Hard upper bound for `max_bytes`
const MAX_BYTES_LIMIT: usize = 1024 * 1024;

/// Reads a text file from the local filesystem
pub struct ReadFileTool;

impl ReadFileTool {
    pub fn new() -> Self {
        Self
    }

    fn failed(message: String) -> ToolError {
        ToolError::ExecutionFailed {
            name: "read_file".into(),
            message,
        }
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file from the local filesystem.\n\
         * Relative paths are resolved against the working directory\n\
         * Output is truncated to `max_bytes` (default 65536)\n\
         * Invalid UTF-8 sequences are replaced"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file to read."
                },
                "max_bytes": {
                    "type": "integer",
                    "description": "Maximum number of bytes to return (default: 65536).",
                    "minimum": 1
                }
            },
            "required": ["path"]
        })
    }

    async fn call(&self, arguments: ToolArguments) -> ToolOutcome {
        let path: String = arguments.get("path")?;
        let max_bytes: usize = arguments
            .get_or("max_bytes", DEFAULT_MAX_BYTES)
            .clamp(1, MAX_BYTES_LIMIT);
        let path = PathBuf::from(path);

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Self::failed(format!("{}: {}", path.display(), e)))?;
        if metadata.is_dir() {
            return Err(Self::failed(format!("{} is a directory", path.display())));
        }

        // Read one byte past the cap to detect truncation without loading the rest
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| Self::failed(format!("{}: {}", path.display(), e)))?;
        let mut limited = file.take(max_bytes as u64 + 1);
        let mut bytes = Vec::new();
        limited
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| Self::failed(format!("{}: {}", path.display(), e)))?;

        let truncated = bytes.len() > max_bytes;
        bytes.truncate(max_bytes);
        let total = metadata.len().max(bytes.len() as u64);
        let mut content = String::from_utf8_lossy(&bytes).into_owned();
        if truncated {
            content.push_str(&format!(
                "\n[truncated: showing {} of {} bytes]",
                max_bytes, total
            ));
        }
        Ok(content)
    }
}
