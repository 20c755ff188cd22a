//! Run trajectory recording and loading

pub mod entry;
pub mod recorder;

pub use entry::TrajectoryEntry;
pub use recorder::{Trajectory, TrajectoryMetadata, TrajectoryRecorder};
