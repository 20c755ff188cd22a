//! Single query execution command

use crate::config::CliConfigLoader;
use crate::output::{CliOutputConfig, CliOutputHandler};
use anyhow::{Context, Result};
use colored::Colorize;
use conductor_core::output::ObserverSet;
use conductor_core::{
    create_model_client, ConversationState, Error, OrchestratorBuilder, Reply, Turn,
    TrajectoryRecorder,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run one query through the tool loop and print the final answer
pub async fn run_command(
    query: String,
    config_loader: CliConfigLoader,
    trajectory_file: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    info!("Executing query: {}", query);

    let config = config_loader.load().await?;
    info!("Using protocol: {}", config.llm.protocol.as_str());
    info!("Using model: {}", config.llm.model);

    let model = create_model_client(&config.llm).context("Failed to create model client")?;
    let catalog = crate::tools::create_cli_tool_catalog()?;

    let mut observers = ObserverSet::new().with(Arc::new(CliOutputHandler::new(
        CliOutputConfig { verbose },
    )));
    let recorder = trajectory_file.as_ref().map(|path| {
        info!("Trajectory file: {}", path.display());
        Arc::new(
            TrajectoryRecorder::with_file(path)
                .with_model(model.provider_name(), model.model_name()),
        )
    });
    if let Some(recorder) = &recorder {
        observers.push(recorder.clone());
    }

    let orchestrator = OrchestratorBuilder::new(model)
        .with_catalog(catalog)
        .with_config(config.orchestrator)
        .with_observer(Arc::new(observers))
        .build()?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run");
                cancel.cancel();
            }
        })
    };

    let result = orchestrator.run_with_cancellation(&query, cancel).await;
    ctrl_c.abort();

    if let Some(recorder) = &recorder {
        save_trajectory(recorder).await;
    }

    match result {
        Ok(outcome) => {
            info!(
                "Completed in {} model turns ({}ms)",
                outcome.model_turns, outcome.duration_ms
            );
            println!("{}", outcome.final_text);
            Ok(())
        }
        Err(Error::Orchestrator(err)) => {
            if let Some(transcript) = err.transcript() {
                eprintln!("{}", format_transcript_summary(transcript));
            }
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// A failed save is reported but never replaces the run's own result
async fn save_trajectory(recorder: &TrajectoryRecorder) {
    match recorder.save().await {
        Ok(()) => debug!("Trajectory saved"),
        Err(err) => warn!(
            path = ?recorder.file_path(),
            error = %err,
            "Failed to save trajectory"
        ),
    }
}

/// One line per turn, for runs that ended without an answer
fn format_transcript_summary(transcript: &ConversationState) -> String {
    let mut lines = vec![format!("Transcript ({} turns):", transcript.len())
        .bold()
        .to_string()];

    for (index, turn) in transcript.turns().iter().enumerate() {
        let line = match turn {
            Turn::User { content } => format!("user: {}", first_line(content)),
            Turn::Model {
                reply: Reply::Text(text),
            } => format!("model: {}", first_line(text)),
            Turn::Model {
                reply: Reply::ToolCalls(calls),
            } => format!(
                "model: calls {}",
                calls
                    .iter()
                    .map(|call| call.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Turn::Tool { results } => {
                let failed = results.iter().filter(|r| r.is_error()).count();
                format!("tool: {} results, {} failed", results.len(), failed)
            }
        };
        lines.push(format!("  {:>3}. {}", index + 1, line));
    }

    lines.join("\n")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
