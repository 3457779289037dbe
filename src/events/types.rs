//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted by the grouping pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A `(current, total, message)` checkpoint
    Progress(ProgressUpdate),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// One progress checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Units completed so far
    pub current: usize,
    /// Total units in the current phase
    pub total: usize,
    /// Human-readable status line
    pub message: String,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Extracting,
    Comparing,
    Clustering,
    Materializing,
    Renaming,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Images discovered in the source tree
    pub total_images: usize,
    /// Images that produced a fingerprint
    pub fingerprinted: usize,
    /// Groups with two or more members
    pub multi_member_groups: usize,
    /// Images that ended up alone
    pub unique_images: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Extracting => write!(f, "Extracting"),
            PipelinePhase::Comparing => write!(f, "Comparing"),
            PipelinePhase::Clustering => write!(f, "Clustering"),
            PipelinePhase::Materializing => write!(f, "Materializing"),
            PipelinePhase::Renaming => write!(f, "Renaming"),
        }
    }
}
