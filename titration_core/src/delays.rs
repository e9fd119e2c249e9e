//! Persisted schedule delays with file locking.
//!
//! When a step has to be held longer than planned (the next dose is not
//! tolerated yet, supplies ran out), the slip is recorded here by step id and
//! applied to the regimen on the next export.

use crate::sink::{persist_atomically, read_locked};
use crate::{Error, Node, Result, Schedule, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Extra days per step, as recorded by the user
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DelayState {
    #[serde(default)]
    pub delays: BTreeMap<StepId, i32>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DelayState {
    /// Record `days` of delay for a step, replacing any earlier value
    pub fn set(&mut self, step_id: StepId, days: i32) -> Result<()> {
        if days < 0 {
            return Err(Error::Config(format!(
                "Delay for step {} must not be negative (got {})",
                step_id, days
            )));
        }
        if days == 0 {
            self.delays.remove(&step_id);
        } else {
            self.delays.insert(step_id, days);
        }
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Forget the delay for one step; returns whether one was recorded
    pub fn clear(&mut self, step_id: StepId) -> bool {
        let removed = self.delays.remove(&step_id).is_some();
        if removed {
            self.updated_at = Some(Utc::now());
        }
        removed
    }

    pub fn clear_all(&mut self) {
        self.delays.clear();
        self.updated_at = Some(Utc::now());
    }

    pub fn get(&self, step_id: StepId) -> Option<i32> {
        self.delays.get(&step_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// Load delay state from a file with shared locking
    ///
    /// Returns default state if file doesn't exist.
    /// If file is unreadable or corrupted, logs a warning and returns default state.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match read_locked(path) {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                tracing::info!("No delay file found, assuming no delays");
                return Ok(Self::default());
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read delay file {:?}: {}. Assuming no delays.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        match serde_json::from_str::<DelayState>(&contents) {
            Ok(state) => {
                tracing::debug!("Loaded {} delays from {:?}", state.delays.len(), path);
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse delay file {:?}: {}. Assuming no delays.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save delay state atomically under an exclusive lock
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        persist_atomically(path, |w| {
            w.write_all(contents.as_bytes())?;
            Ok(())
        })?;

        tracing::debug!("Saved {} delays to {:?}", self.delays.len(), path);
        Ok(())
    }

    /// Load state, modify it, and save it back
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut DelayState) -> Result<()>,
    {
        let mut state = Self::load(path)?;
        f(&mut state)?;
        state.save(path)?;
        Ok(state)
    }
}

impl Schedule {
    /// Copy of the schedule with recorded delays applied
    ///
    /// A recorded delay replaces the step's own `delay_length`. Delays for
    /// step ids the schedule does not contain are skipped with a warning.
    pub fn with_delays(&self, delays: &DelayState) -> Schedule {
        for step_id in delays.delays.keys() {
            if self.step(*step_id).is_none() {
                tracing::warn!(
                    "Ignoring delay for step {}: not part of the regimen",
                    step_id
                );
            }
        }

        let nodes = self
            .nodes
            .iter()
            .map(|node| match node {
                Node::Step(step) => match delays.get(step.id) {
                    Some(days) => Node::Step(step.clone().with_delay(days)),
                    None => node.clone(),
                },
                Node::Transition(_) => node.clone(),
            })
            .collect();

        Schedule::new(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Step, Transition};

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("delays.json");

        let mut state = DelayState::default();
        state.set(2, 5).unwrap();
        state.set(4, 1).unwrap();
        state.save(&path).unwrap();

        let loaded = DelayState::load(&path).unwrap();
        assert_eq!(loaded.get(2), Some(5));
        assert_eq!(loaded.get(4), Some(1));
        assert_eq!(loaded.get(3), None);
        assert!(loaded.updated_at.is_some());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = DelayState::load(&temp_dir.path().join("missing.json")).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_corrupted_file_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("delays.json");
        std::fs::write(&path, "{ not json").unwrap();

        let state = DelayState::load(&path).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_unreadable_path_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        // A directory exists at the path but cannot be read as a file
        let path = temp_dir.path().join("delays.json");
        std::fs::create_dir(&path).unwrap();

        let state = DelayState::load(&path).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_save_creates_missing_data_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("delays.json");

        let mut state = DelayState::default();
        state.set(1, 2).unwrap();
        state.save(&path).unwrap();

        assert_eq!(DelayState::load(&path).unwrap().get(1), Some(2));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let mut state = DelayState::default();
        assert!(matches!(state.set(1, -3), Err(Error::Config(_))));
        assert!(state.is_empty());
    }

    #[test]
    fn test_zero_delay_clears() {
        let mut state = DelayState::default();
        state.set(1, 3).unwrap();
        state.set(1, 0).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_update_pattern() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("delays.json");

        DelayState::update(&path, |state| state.set(3, 2)).unwrap();
        DelayState::update(&path, |state| {
            assert!(state.clear(3));
            state.set(5, 7)
        })
        .unwrap();

        let loaded = DelayState::load(&path).unwrap();
        assert_eq!(loaded.get(3), None);
        assert_eq!(loaded.get(5), Some(7));
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("delays.json");

        DelayState::default().save(&path).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "delays.json")
            .collect();
        assert!(extras.is_empty(), "Found extras: {:?}", extras);
    }

    #[test]
    fn test_with_delays_applies_by_id() {
        let schedule = Schedule::new(vec![
            Step::new(1, "A", 2).with_delay(4).into(),
            Transition::new(1, 2).with_ramp(5, 15, 5).into(),
            Step::new(2, "B", 3).into(),
        ]);
        let mut delays = DelayState::default();
        delays.set(2, 2).unwrap();
        delays.set(99, 1).unwrap();

        let delayed = schedule.with_delays(&delays);

        // Step 1 keeps its own delay, step 2 picks up the recorded one
        assert_eq!(delayed.step(1).unwrap().delay_length, 4);
        assert_eq!(delayed.step(2).unwrap().delay_length, 2);
        assert_eq!(delayed.total_days(), 6 + 3 + 5);
        // Original untouched
        assert_eq!(schedule.step(2).unwrap().delay_length, 0);
    }
}
