//! CLI output handler implementation

use async_trait::async_trait;
use colored::Colorize;
use conductor_core::output::{LoopEvent, LoopObserver};
use conductor_core::{Reply, ToolArguments};

/// Longest argument or result preview shown per line
const PREVIEW_CHARS: usize = 120;

/// CLI output configuration
#[derive(Debug, Clone, Default)]
pub struct CliOutputConfig {
    /// Show a preview of each tool's output
    pub verbose: bool,
}

/// Prints loop progress to stderr so stdout carries only the final answer
pub struct CliOutputHandler {
    config: CliOutputConfig,
}

impl CliOutputHandler {
    pub fn new(config: CliOutputConfig) -> Self {
        Self { config }
    }

    /// Render one event, or `None` if it is not shown
    fn format_event(&self, event: &LoopEvent) -> Option<String> {
        match event {
            LoopEvent::RunStarted { .. } | LoopEvent::RunCompleted { .. } => None,
            LoopEvent::ModelRequested { turn } => {
                Some(format!("{} turn {}", "◆".blue(), turn).dimmed().to_string())
            }
            LoopEvent::ModelRetry {
                attempt,
                delay_ms,
                error,
                ..
            } => Some(format!(
                "{} model call failed ({}), retry {} in {}ms",
                "↻".yellow(),
                truncate(error),
                attempt,
                delay_ms
            )),
            LoopEvent::ModelReplied { reply, .. } => match reply {
                Reply::ToolCalls(calls) if calls.len() > 1 => Some(format!(
                    "{} running {} tools concurrently",
                    "⇉".cyan(),
                    calls.len()
                )),
                _ => None,
            },
            LoopEvent::ToolStarted { request, .. } => Some(format!(
                "{} {}({})",
                "→".cyan(),
                request.name.bold(),
                format_arguments(&request.arguments)
            )),
            LoopEvent::ToolCompleted {
                tool_name,
                result,
                duration_ms,
                ..
            } => {
                let mut line = match &result.error {
                    Some(error) => format!(
                        "{} {} failed after {}ms: {}",
                        "✗".red(),
                        tool_name.bold(),
                        duration_ms,
                        truncate(error).red()
                    ),
                    None => format!(
                        "{} {} finished in {}ms",
                        "✓".green(),
                        tool_name.bold(),
                        duration_ms
                    ),
                };
                if self.config.verbose && result.error.is_none() {
                    line.push_str(&format!("\n    {}", truncate(&result.output).dimmed()));
                }
                Some(line)
            }
            LoopEvent::RunFailed { error } => Some(format!("{} {}", "✗".red(), error.red())),
        }
    }
}

#[async_trait]
impl LoopObserver for CliOutputHandler {
    async fn emit(&self, event: &LoopEvent) {
        if let Some(line) = self.format_event(event) {
            eprintln!("{}", line);
        }
    }
}

fn format_arguments(arguments: &ToolArguments) -> String {
    let rendered = arguments
        .as_map()
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(", ");
    truncate(&rendered)
}

/// First line of `text`, cut to [`PREVIEW_CHARS`] characters
fn truncate(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() > PREVIEW_CHARS {
        let cut: String = first_line.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    } else if text.lines().nth(1).is_some() {
        format!("{} …", first_line)
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::{ToolCallRequest, ToolResult};
    use serde_json::json;

    fn handler() -> CliOutputHandler {
        colored::control::set_override(false);
        CliOutputHandler::new(CliOutputConfig::default())
    }

    #[test]
    fn test_tool_started_shows_arguments() {
        let event = LoopEvent::ToolStarted {
            turn: 1,
            request: ToolCallRequest::new(
                "c1",
                "read_file",
                ToolArguments::new().with("path", json!("README.md")),
            ),
        };
        let line = handler().format_event(&event).unwrap();
        assert!(line.contains("read_file(path=\"README.md\")"));
    }

    #[test]
    fn test_failed_tool_shows_error() {
        let event = LoopEvent::ToolCompleted {
            turn: 1,
            tool_name: "search".into(),
            result: ToolResult {
                call_id: "c1".into(),
                output: String::new(),
                error: Some("Unknown tool: search".into()),
            },
            duration_ms: 3,
        };
        let line = handler().format_event(&event).unwrap();
        assert!(line.contains("search failed after 3ms: Unknown tool: search"));
    }

    #[test]
    fn test_final_events_are_silent() {
        let event = LoopEvent::RunCompleted {
            model_turns: 1,
            final_text: "done".into(),
            duration_ms: 1,
        };
        assert!(handler().format_event(&event).is_none());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short"), "short");
        assert_eq!(truncate("one\ntwo"), "one …");
        assert_eq!(truncate(&"x".repeat(200)).chars().count(), PREVIEW_CHARS + 1);
    }
}
