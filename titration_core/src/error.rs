//! Error types for the titration_core library.

use crate::StepId;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for titration_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schedule is not internally consistent
    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),

    /// Date could not be parsed or represented
    #[error("Date error: {0}")]
    Date(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Configuration-validity failures of a schedule.
///
/// Every variant names the offending node by its position in the schedule,
/// so the caller can point at the exact entry of a regimen file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Step identifiers must be positive
    #[error("node {index}: step id must be positive, got {step_id}")]
    InvalidStepId { index: usize, step_id: StepId },

    /// Two steps share an identifier
    #[error("node {index}: step id {step_id} is already used by node {first_index}")]
    DuplicateStepId {
        index: usize,
        step_id: StepId,
        first_index: usize,
    },

    /// Non-positive intended length or negative delay
    #[error(
        "node {index}: step {step_id} has invalid lengths \
         (intended {intended_length}, delay {delay_length})"
    )]
    InvalidStepLength {
        index: usize,
        step_id: StepId,
        intended_length: i32,
        delay_length: i32,
    },

    /// A transition names a step that is not in the schedule
    #[error("node {index}: transition references unknown step {step_id}")]
    DanglingReference { index: usize, step_id: StepId },

    /// A transition names a step id shared by several steps
    #[error("node {index}: transition reference to step {step_id} matches {matches} steps")]
    AmbiguousReference {
        index: usize,
        step_id: StepId,
        matches: usize,
    },

    /// Ramp cannot be walked in whole increments
    #[error(
        "node {index}: transition {from} -> {to} cannot ramp from {start}ml to {end}ml \
         in steps of {increment}ml"
    )]
    InvalidTransitionRange {
        index: usize,
        from: StepId,
        to: StepId,
        start: i32,
        end: i32,
        increment: i32,
    },

    /// Schedule runs past the last representable calendar date
    #[error("schedule of {total_days} days starting {start} runs past the supported date range")]
    DateOutOfRange {
        start: chrono::NaiveDate,
        total_days: u64,
    },
}

impl ScheduleError {
    /// Position of the offending node, when the failure belongs to one node
    pub fn node_index(&self) -> Option<usize> {
        match self {
            ScheduleError::InvalidStepId { index, .. }
            | ScheduleError::DuplicateStepId { index, .. }
            | ScheduleError::InvalidStepLength { index, .. }
            | ScheduleError::DanglingReference { index, .. }
            | ScheduleError::AmbiguousReference { index, .. }
            | ScheduleError::InvalidTransitionRange { index, .. } => Some(*index),
            ScheduleError::DateOutOfRange { .. } => None,
        }
    }
}
