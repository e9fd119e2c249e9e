//! Default regimen and regimen file loading.
//!
//! A regimen file is TOML with one `[[nodes]]` table per schedule node:
//!
//! ```toml
//! [[nodes]]
//! kind = "step"
//! id = 1
//! name = "1 small scoop"
//! intended_length = 14
//!
//! [[nodes]]
//! kind = "transition"
//! from = 1
//! to = 2
//! ml_start_number = 40
//! ml_end_number = 85
//! ml_increment_per_day = 5
//! ```

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::path::Path;

/// Days each step of the default regimen is held
pub const DEFAULT_DAYS_PER_STEP: i32 = 14;

/// Dose names of the default regimen, in order
pub const DEFAULT_STEP_NAMES: [&str; 7] = [
    "1 small scoop",
    "2 small scoops",
    "1 big scoop",
    "2 big scoops",
    "1/64th tsp",
    "1/32th tsp",
    "1/16th tsp",
];

/// Cached default regimen - built once and reused
static DEFAULT_REGIMEN: Lazy<Schedule> = Lazy::new(build_default_regimen_internal);

/// Get a reference to the cached default regimen
pub fn get_default_regimen() -> &'static Schedule {
    &DEFAULT_REGIMEN
}

/// Builds the default regimen: every step held for two weeks, joined by
/// transitions on the default ramp
pub fn build_default_regimen() -> Schedule {
    build_default_regimen_internal()
}

fn build_default_regimen_internal() -> Schedule {
    let mut nodes = Vec::with_capacity(DEFAULT_STEP_NAMES.len() * 2 - 1);

    for (i, name) in DEFAULT_STEP_NAMES.iter().enumerate() {
        let id = i as StepId + 1;
        if i > 0 {
            nodes.push(Node::Transition(Transition::new(id - 1, id)));
        }
        nodes.push(Node::Step(Step::new(id, *name, DEFAULT_DAYS_PER_STEP)));
    }

    Schedule::new(nodes)
}

/// Load a regimen from a TOML file
///
/// The regimen is validated before it is returned.
pub fn load_regimen(path: &Path) -> Result<Schedule> {
    let contents = std::fs::read_to_string(path)?;
    let schedule: Schedule = toml::from_str(&contents)?;
    if schedule.nodes.is_empty() {
        return Err(Error::Config(format!(
            "Regimen {:?} defines no nodes",
            path
        )));
    }
    schedule.validate()?;
    tracing::info!(
        "Loaded regimen with {} nodes from {:?}",
        schedule.nodes.len(),
        path
    );
    Ok(schedule)
}

/// Load a regimen from `path` if given, otherwise use the default
pub fn load_regimen_or_default(path: Option<&Path>) -> Result<Schedule> {
    match path {
        Some(path) => load_regimen(path),
        None => {
            tracing::debug!("No regimen file configured, using the default regimen");
            Ok(get_default_regimen().clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_regimen_shape() {
        let regimen = build_default_regimen();
        assert_eq!(regimen.steps().count(), 7);
        assert_eq!(regimen.nodes.len(), 13);
        assert!(matches!(regimen.nodes[0], Node::Step(_)));
        assert!(matches!(regimen.nodes[1], Node::Transition(_)));
        assert!(matches!(regimen.nodes[12], Node::Step(_)));
    }

    #[test]
    fn test_default_regimen_validates() {
        let regimen = build_default_regimen();
        assert!(regimen.validate().is_ok());
        // 7 steps of 14 days, 6 transitions of 10 days (40..=85 by 5)
        assert_eq!(regimen.total_days(), 7 * 14 + 6 * 10);
    }

    #[test]
    fn test_default_transitions_link_neighbours() {
        let regimen = build_default_regimen();
        for (i, node) in regimen.nodes.iter().enumerate() {
            if let Node::Transition(t) = node {
                let from = match &regimen.nodes[i - 1] {
                    Node::Step(s) => s.id,
                    _ => panic!("transition not preceded by a step"),
                };
                let to = match &regimen.nodes[i + 1] {
                    Node::Step(s) => s.id,
                    _ => panic!("transition not followed by a step"),
                };
                assert_eq!((t.from, t.to), (from, to));
            }
        }
    }

    #[test]
    fn test_cached_regimen_matches_built() {
        assert_eq!(get_default_regimen(), &build_default_regimen());
    }

    #[test]
    fn test_load_regimen_from_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("regimen.toml");
        std::fs::write(
            &path,
            r#"
[[nodes]]
kind = "step"
id = 1
name = "A"
intended_length = 2
delay_length = 1

[[nodes]]
kind = "transition"
from = 1
to = 2
ml_start_number = 5
ml_end_number = 15
ml_increment_per_day = 5

[[nodes]]
kind = "step"
id = 2
name = "B"
intended_length = 3
"#,
        )
        .unwrap();

        let schedule = load_regimen(&path).unwrap();
        assert_eq!(schedule.nodes.len(), 3);
        assert_eq!(
            schedule.nodes[0],
            Node::Step(Step::new(1, "A", 2).with_delay(1))
        );
        assert_eq!(schedule.total_days(), 9);
    }

    #[test]
    fn test_transition_defaults_in_file() {
        let toml_str = r#"
[[nodes]]
kind = "transition"
from = 1
to = 2
"#;
        let schedule: Schedule = toml::from_str(toml_str).unwrap();
        assert_eq!(schedule.nodes[0], Node::Transition(Transition::new(1, 2)));
    }

    #[test]
    fn test_load_invalid_regimen_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("regimen.toml");
        std::fs::write(
            &path,
            r#"
[[nodes]]
kind = "step"
id = 1
name = "A"
intended_length = 2

[[nodes]]
kind = "transition"
from = 1
to = 3
"#,
        )
        .unwrap();

        let err = load_regimen(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::Schedule(crate::ScheduleError::DanglingReference { step_id: 3, .. })
        ));
    }

    #[test]
    fn test_load_empty_regimen_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("regimen.toml");
        std::fs::write(&path, "").unwrap();

        assert!(matches!(load_regimen(&path), Err(Error::Config(_))));
    }
}
