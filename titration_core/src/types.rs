//! Core domain types for the titration schedule.
//!
//! This module defines the fundamental types used throughout the system:
//! - Steps (constant daily doses) and transitions (linear ramps between steps)
//! - Schedules as ordered node lists
//! - Day entries, the output unit handed to export sinks

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier linking transitions to steps
pub type StepId = u32;

// ============================================================================
// Schedule Nodes
// ============================================================================

/// A constant daily dose held for a fixed number of days
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    pub name: String,
    /// Days of normal dosing
    pub intended_length: i32,
    /// Extra days of the same dose appended after the intended length
    #[serde(default)]
    pub delay_length: i32,
}

impl Step {
    pub fn new(id: StepId, name: impl Into<String>, intended_length: i32) -> Self {
        Self {
            id,
            name: name.into(),
            intended_length,
            delay_length: 0,
        }
    }

    /// Same step, held for `delay_length` extra days
    pub fn with_delay(mut self, delay_length: i32) -> Self {
        self.delay_length = delay_length;
        self
    }

    /// Number of day entries this step expands to
    pub fn day_count(&self) -> u64 {
        self.intended_length.max(0) as u64 + self.delay_length.max(0) as u64
    }
}

fn default_ml_increment_per_day() -> i32 {
    5
}

fn default_ml_start_number() -> i32 {
    40
}

fn default_ml_end_number() -> i32 {
    85
}

/// A linear ramp of mixture quantity bridging two steps
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transition {
    pub from: StepId,
    pub to: StepId,
    #[serde(default = "default_ml_increment_per_day")]
    pub ml_increment_per_day: i32,
    #[serde(default = "default_ml_start_number")]
    pub ml_start_number: i32,
    #[serde(default = "default_ml_end_number")]
    pub ml_end_number: i32,
}

impl Transition {
    /// Transition using the default 40ml → 85ml ramp in 5ml increments
    pub fn new(from: StepId, to: StepId) -> Self {
        Self {
            from,
            to,
            ml_increment_per_day: default_ml_increment_per_day(),
            ml_start_number: default_ml_start_number(),
            ml_end_number: default_ml_end_number(),
        }
    }

    /// Replace the ramp with `start..=end` stepping by `increment`
    pub fn with_ramp(mut self, start: i32, end: i32, increment: i32) -> Self {
        self.ml_start_number = start;
        self.ml_end_number = end;
        self.ml_increment_per_day = increment;
        self
    }

    /// Number of days in the ramp, counting both endpoints
    ///
    /// Returns `None` when the end quantity cannot be reached from the start
    /// quantity in whole, positive increments.
    pub fn day_count(&self) -> Option<u64> {
        if self.ml_increment_per_day <= 0 {
            return None;
        }
        let span = i64::from(self.ml_end_number) - i64::from(self.ml_start_number);
        let increment = i64::from(self.ml_increment_per_day);
        if span < 0 || span % increment != 0 {
            return None;
        }
        Some((span / increment) as u64 + 1)
    }
}

/// One entry of a schedule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Step(Step),
    Transition(Transition),
}

impl Node {
    /// Number of day entries this node expands to, or `None` for a
    /// misconfigured transition
    pub fn day_count(&self) -> Option<u64> {
        match self {
            Node::Step(step) => Some(step.day_count()),
            Node::Transition(transition) => transition.day_count(),
        }
    }
}

impl From<Step> for Node {
    fn from(step: Step) -> Self {
        Node::Step(step)
    }
}

impl From<Transition> for Node {
    fn from(transition: Transition) -> Self {
        Node::Transition(transition)
    }
}

/// An ordered regimen of steps and transitions
///
/// Ordering is significant. Alternation between steps and transitions is
/// conventional but not enforced.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Schedule {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

// ============================================================================
// Expansion Output
// ============================================================================

/// What a day entry asks the patient to do
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    /// Normal dose of a step
    Dose,
    /// Extended dose while the following step is delayed
    Delay,
    /// Measured quantity of a mixture during a ramp
    Transition,
}

impl DayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayKind::Dose => "dose",
            DayKind::Delay => "delay",
            DayKind::Transition => "transition",
        }
    }
}

/// One all-day calendar event
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub title: String,
    pub description: String,
    pub kind: DayKind,
    /// Mixture quantity for transition days
    pub quantity_ml: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_day_count_includes_delay() {
        assert_eq!(Step::new(1, "A", 14).day_count(), 14);
        assert_eq!(Step::new(1, "A", 2).with_delay(1).day_count(), 3);
        assert_eq!(Step::new(1, "A", -2).with_delay(1).day_count(), 1);
    }

    #[test]
    fn test_default_transition_spans_ten_days() {
        assert_eq!(Transition::new(1, 2).day_count(), Some(10));
        assert_eq!(Node::from(Transition::new(1, 2).with_ramp(5, 17, 5)).day_count(), None);
    }
}
