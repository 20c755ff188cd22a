//! Trajectory entry structures

use crate::output::LoopEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single recorded loop event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    /// Unique identifier for this entry
    pub id: String,

    /// When the event was observed
    pub timestamp: DateTime<Utc>,

    /// Position of the entry in the trajectory
    pub sequence: usize,

    pub event: LoopEvent,
}

impl TrajectoryEntry {
    pub fn new(sequence: usize, event: LoopEvent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            sequence,
            event,
        }
    }

    /// Model turn the event belongs to, if any
    pub fn turn(&self) -> Option<usize> {
        match &self.event {
            LoopEvent::ModelRequested { turn }
            | LoopEvent::ModelRetry { turn, .. }
            | LoopEvent::ModelReplied { turn, .. }
            | LoopEvent::ToolStarted { turn, .. }
            | LoopEvent::ToolCompleted { turn, .. } => Some(*turn),
            LoopEvent::RunStarted { .. }
            | LoopEvent::RunCompleted { .. }
            | LoopEvent::RunFailed { .. } => None,
        }
    }
}
