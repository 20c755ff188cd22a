//! Drives the orchestration loop with a scripted model and two local tools.
//!
//! Run with `cargo run -p conductor-core --example scripted_run`.

use async_trait::async_trait;
use conductor_core::{
    ConversationState, FnTool, LoopEvent, LoopObserver, ModelClient, OrchestratorBuilder, Reply,
    Result, ToolArguments, ToolCallRequest, ToolCatalog, ToolDefinition,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Asks for both tools on the first turn, then summarizes their results
struct ScriptedModel;

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(
        &self,
        conversation: &ConversationState,
        _tools: &[ToolDefinition],
    ) -> Result<Reply> {
        if conversation.model_turns() == 0 {
            return Ok(Reply::ToolCalls(vec![
                ToolCallRequest::new("a", "slow_lookup", ToolArguments::new()),
                ToolCallRequest::new("b", "fast_lookup", ToolArguments::new()),
            ]));
        }
        let outputs: Vec<&str> = conversation
            .last()
            .map(|turn| turn.tool_results().iter().map(|r| r.output.as_str()).collect())
            .unwrap_or_default();
        Ok(Reply::Text(format!("Results in request order: {}", outputs.join(", "))))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_name(&self) -> &str {
        "demo"
    }
}

struct PrintObserver;

#[async_trait]
impl LoopObserver for PrintObserver {
    async fn emit(&self, event: &LoopEvent) {
        if let LoopEvent::ToolCompleted {
            tool_name,
            duration_ms,
            ..
        } = event
        {
            println!("  {} finished after {}ms", tool_name, duration_ms);
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let catalog = ToolCatalog::new()
        .with_tool(FnTool::new(
            "slow_lookup",
            "Answers after 200ms",
            json!({"type": "object", "properties": {}}),
            |_args: ToolArguments| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok("slow".to_string())
            },
        ))?
        .with_tool(FnTool::new(
            "fast_lookup",
            "Answers immediately",
            json!({"type": "object", "properties": {}}),
            |_args: ToolArguments| async { Ok("fast".to_string()) },
        ))?;

    let orchestrator = OrchestratorBuilder::new(Arc::new(ScriptedModel))
        .with_catalog(catalog)
        .with_observer(Arc::new(PrintObserver))
        .build()?;

    let outcome = orchestrator.run("Look both things up").await?;
    println!("{}", outcome.final_text);
    println!(
        "{} model turns, {} turns total, {}ms",
        outcome.model_turns,
        outcome.transcript.len(),
        outcome.duration_ms
    );
    Ok(())
}
