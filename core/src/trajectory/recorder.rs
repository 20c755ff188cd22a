//! Trajectory recorder implementation

use crate::error::{Result, TrajectoryError};
use crate::output::{LoopEvent, LoopObserver};
use crate::trajectory::TrajectoryEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

/// Records the events of a run for debugging and analysis
pub struct TrajectoryRecorder {
    entries: RwLock<Vec<TrajectoryEntry>>,
    file_path: Option<PathBuf>,
    provider: String,
    model: String,
}

/// Complete trajectory data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub metadata: TrajectoryMetadata,
    pub entries: Vec<TrajectoryEntry>,
}

/// Metadata for a trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryMetadata {
    /// Unique identifier for this trajectory
    pub id: String,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Version of the trajectory format
    pub version: String,

    pub provider: String,

    pub model: String,

    /// Query the run was seeded with
    pub query: Option<String>,

    /// `Some(true)` on a final answer, `Some(false)` on a fatal error
    pub success: Option<bool>,

    pub model_turns: usize,

    pub duration_ms: Option<u64>,
}

impl TrajectoryRecorder {
    /// Create an in-memory recorder
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            file_path: None,
            provider: String::new(),
            model: String::new(),
        }
    }

    /// Create a recorder that [`save`](Self::save)s to `path`
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_path: Some(path.as_ref().to_path_buf()),
            ..Self::new()
        }
    }

    /// Label the trajectory with the model that produced it
    pub fn with_model<P: Into<String>, M: Into<String>>(mut self, provider: P, model: M) -> Self {
        self.provider = provider.into();
        self.model = model.into();
        self
    }

    /// Record a loop event
    pub async fn record(&self, event: LoopEvent) {
        let mut entries = self.entries.write().await;
        let sequence = entries.len();
        entries.push(TrajectoryEntry::new(sequence, event));
    }

    pub async fn get_entries(&self) -> Vec<TrajectoryEntry> {
        self.entries.read().await.clone()
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Save the trajectory to file, if a file was configured
    pub async fn save(&self) -> Result<()> {
        if let Some(path) = &self.file_path {
            let trajectory = self.build_trajectory().await;
            let json = serde_json::to_string_pretty(&trajectory).map_err(|e| {
                TrajectoryError::RecordingFailed {
                    message: format!("Failed to serialize trajectory: {}", e),
                }
            })?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }

            fs::write(path, json).await?;
            tracing::debug!(path = %path.display(), "Saved trajectory");
        }

        Ok(())
    }

    /// Load a trajectory from file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Trajectory> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TrajectoryError::LoadFailed {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(path).await?;
        let trajectory: Trajectory =
            serde_json::from_str(&content).map_err(|_| TrajectoryError::InvalidFormat)?;

        Ok(trajectory)
    }

    /// Build a complete trajectory from recorded entries
    pub async fn build_trajectory(&self) -> Trajectory {
        let entries = self.entries.read().await.clone();

        let started_at = entries
            .first()
            .map(|e| e.timestamp)
            .unwrap_or_else(Utc::now);
        let completed_at = entries.last().map(|e| e.timestamp);

        let mut query = None;
        let mut success = None;
        let mut duration_ms =
            completed_at.map(|end| (end - started_at).num_milliseconds().max(0) as u64);

        for entry in &entries {
            match &entry.event {
                LoopEvent::RunStarted { query: q, .. } => query = Some(q.clone()),
                LoopEvent::RunCompleted {
                    duration_ms: d, ..
                } => {
                    success = Some(true);
                    duration_ms = Some(*d);
                }
                LoopEvent::RunFailed { .. } => success = Some(false),
                _ => {}
            }
        }

        let model_turns = entries
            .iter()
            .filter(|e| matches!(e.event, LoopEvent::ModelReplied { .. }))
            .count();

        let metadata = TrajectoryMetadata {
            id: uuid::Uuid::new_v4().to_string(),
            started_at,
            completed_at,
            version: "1.0".to_string(),
            provider: self.provider.clone(),
            model: self.model.clone(),
            query,
            success,
            model_turns,
            duration_ms,
        };

        Trajectory { metadata, entries }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}

impl Default for TrajectoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoopObserver for TrajectoryRecorder {
    async fn emit(&self, event: &LoopEvent) {
        self.record(event.clone()).await;
    }
}
