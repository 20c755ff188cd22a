//! Current date and time tool

use async_trait::async_trait;
use chrono::{FixedOffset, Local, Utc};
use conductor_core::error::ToolError;
use conductor_core::tools::{Tool, ToolArguments, ToolOutcome};
use serde_json::json;

/// Reports the current time, in local time or at a fixed UTC offset
pub struct CurrentTimeTool;

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time as an RFC 3339 timestamp.\n\
         * Uses the local time zone unless `utc_offset_hours` is given\n\
         * Use it whenever the answer depends on today's date"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "utc_offset_hours": {
                    "type": "integer",
                    "description": "Offset from UTC in whole hours, between -12 and 14.",
                    "minimum": -12,
                    "maximum": 14
                }
            }
        })
    }

    async fn call(&self, arguments: ToolArguments) -> ToolOutcome {
        let offset: Option<i32> = arguments.get_or("utc_offset_hours", None);
        match offset {
            None => Ok(Local::now().to_rfc3339()),
            Some(hours) => {
                let zone = if (-12..=14).contains(&hours) {
                    FixedOffset::east_opt(hours * 3600)
                } else {
                    None
                };
                let zone = zone.ok_or_else(|| ToolError::InvalidArguments {
                    message: format!("utc_offset_hours out of range: {}", hours),
                })?;
                Ok(Utc::now().with_timezone(&zone).to_rfc3339())
            }
        }
    }
}
