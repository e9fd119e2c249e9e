//! Schedule validation and step reference resolution.
//!
//! Transitions name their endpoint steps by id. Resolution goes through a
//! [`StepIndex`] built once per pass over the schedule.

use crate::{Node, Schedule, ScheduleError, Step, StepId, Transition};
use std::collections::HashMap;

/// Lookup table from step id to every step carrying that id
#[derive(Debug)]
pub struct StepIndex<'a> {
    by_id: HashMap<StepId, Vec<(usize, &'a Step)>>,
}

impl<'a> StepIndex<'a> {
    /// Index every step of the schedule, keeping duplicates so that lookups
    /// can report ambiguity
    pub fn build(schedule: &'a Schedule) -> Self {
        let mut by_id: HashMap<StepId, Vec<(usize, &'a Step)>> = HashMap::new();
        for (index, node) in schedule.nodes.iter().enumerate() {
            if let Node::Step(step) = node {
                by_id.entry(step.id).or_default().push((index, step));
            }
        }
        Self { by_id }
    }

    /// Resolve one reference made by the node at `index`
    pub fn resolve(&self, index: usize, step_id: StepId) -> Result<&'a Step, ScheduleError> {
        match self.by_id.get(&step_id).map(Vec::as_slice) {
            None | Some([]) => Err(ScheduleError::DanglingReference { index, step_id }),
            Some([(_, step)]) => Ok(*step),
            Some(matches) => Err(ScheduleError::AmbiguousReference {
                index,
                step_id,
                matches: matches.len(),
            }),
        }
    }

    /// Resolve both endpoints of the transition at `index`
    pub fn endpoints(
        &self,
        index: usize,
        transition: &Transition,
    ) -> Result<(&'a Step, &'a Step), ScheduleError> {
        let from = self.resolve(index, transition.from)?;
        let to = self.resolve(index, transition.to)?;
        Ok((from, to))
    }
}

/// Find the unique steps a transition ramps between
///
/// Errors carry the transition's position in the schedule, or the schedule
/// length when the transition is not one of its nodes.
pub fn resolve_endpoints<'a>(
    schedule: &'a Schedule,
    transition: &Transition,
) -> Result<(&'a Step, &'a Step), ScheduleError> {
    let index = schedule
        .nodes
        .iter()
        .position(|node| matches!(node, Node::Transition(t) if t == transition))
        .unwrap_or(schedule.nodes.len());
    StepIndex::build(schedule).endpoints(index, transition)
}

impl Schedule {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Iterate over the steps in schedule order
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Step(step) => Some(step),
            Node::Transition(_) => None,
        })
    }

    /// First step with the given id
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps().find(|step| step.id == id)
    }

    /// Total number of day entries the schedule expands to
    ///
    /// Misconfigured transitions contribute nothing; call [`Schedule::validate`]
    /// first when the count must be exact.
    pub fn total_days(&self) -> u64 {
        self.nodes
            .iter()
            .filter_map(Node::day_count)
            .sum()
    }

    /// Check every node before anything is expanded
    ///
    /// Returns the step index used for validation so callers can reuse it for
    /// resolution. Fails on the first offending node.
    pub fn validate(&self) -> Result<StepIndex<'_>, ScheduleError> {
        let index = StepIndex::build(self);
        let mut first_seen: HashMap<StepId, usize> = HashMap::new();

        for (position, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Step(step) => {
                    if step.id == 0 {
                        return Err(ScheduleError::InvalidStepId {
                            index: position,
                            step_id: step.id,
                        });
                    }
                    if let Some(&first_index) = first_seen.get(&step.id) {
                        return Err(ScheduleError::DuplicateStepId {
                            index: position,
                            step_id: step.id,
                            first_index,
                        });
                    }
                    first_seen.insert(step.id, position);

                    if step.intended_length <= 0 || step.delay_length < 0 {
                        return Err(ScheduleError::InvalidStepLength {
                            index: position,
                            step_id: step.id,
                            intended_length: step.intended_length,
                            delay_length: step.delay_length,
                        });
                    }
                }
                Node::Transition(transition) => {
                    index.endpoints(position, transition)?;
                    if transition.day_count().is_none() {
                        return Err(ScheduleError::InvalidTransitionRange {
                            index: position,
                            from: transition.from,
                            to: transition.to,
                            start: transition.ml_start_number,
                            end: transition.ml_end_number,
                            increment: transition.ml_increment_per_day,
                        });
                    }
                }
            }
        }

        tracing::debug!("Validated schedule of {} nodes", self.nodes.len());
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_schedule() -> Schedule {
        Schedule::new(vec![
            Step::new(1, "A", 2).into(),
            Transition::new(1, 2).with_ramp(5, 15, 5).into(),
            Step::new(2, "B", 3).into(),
        ])
    }

    fn transition_at(schedule: &Schedule, index: usize) -> &Transition {
        match &schedule.nodes[index] {
            Node::Transition(t) => t,
            Node::Step(_) => panic!("node {} is not a transition", index),
        }
    }

    #[test]
    fn test_resolve_endpoints() {
        let schedule = two_step_schedule();
        let (from, to) = resolve_endpoints(&schedule, transition_at(&schedule, 1)).unwrap();
        assert_eq!(from.name, "A");
        assert_eq!(to.name, "B");
    }

    #[test]
    fn test_resolve_endpoints_does_not_depend_on_order() {
        // Backwards ramp: transition names a later step as its source
        let schedule = Schedule::new(vec![
            Step::new(2, "B", 3).into(),
            Transition::new(3, 2).into(),
            Step::new(3, "C", 1).into(),
        ]);
        let (from, to) = resolve_endpoints(&schedule, transition_at(&schedule, 1)).unwrap();
        assert_eq!(from.id, 3);
        assert_eq!(to.id, 2);
    }

    #[test]
    fn test_dangling_reference() {
        let schedule = Schedule::new(vec![
            Step::new(1, "A", 2).into(),
            Transition::new(1, 7).into(),
        ]);
        let err = resolve_endpoints(&schedule, transition_at(&schedule, 1)).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::DanglingReference {
                index: 1,
                step_id: 7
            }
        );
    }

    #[test]
    fn test_ambiguous_reference() {
        let schedule = Schedule::new(vec![
            Step::new(1, "A", 2).into(),
            Transition::new(1, 2).into(),
            Step::new(2, "B", 3).into(),
            Step::new(2, "B again", 3).into(),
        ]);
        let err = resolve_endpoints(&schedule, transition_at(&schedule, 1)).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::AmbiguousReference {
                index: 1,
                step_id: 2,
                matches: 2
            }
        );
    }

    #[test]
    fn test_valid_schedule_passes() {
        assert!(two_step_schedule().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_intended_length() {
        let schedule = Schedule::new(vec![Step::new(1, "A", 0).into()]);
        let err = schedule.validate().unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidStepLength {
                index: 0,
                step_id: 1,
                intended_length: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_negative_delay() {
        let schedule = Schedule::new(vec![Step::new(1, "A", 3).with_delay(-1).into()]);
        let err = schedule.validate().unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidStepLength {
                delay_length: -1,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_fractional_ramp() {
        let schedule = Schedule::new(vec![
            Step::new(1, "A", 2).into(),
            Transition::new(1, 2).with_ramp(5, 17, 5).into(),
            Step::new(2, "B", 3).into(),
        ]);
        let err = schedule.validate().unwrap_err();
        assert_eq!(err.node_index(), Some(1));
        assert!(matches!(err, ScheduleError::InvalidTransitionRange { .. }));
    }

    #[test]
    fn test_validate_rejects_descending_ramp() {
        let schedule = Schedule::new(vec![
            Step::new(1, "A", 2).into(),
            Transition::new(1, 2).with_ramp(20, 10, 5).into(),
            Step::new(2, "B", 3).into(),
        ]);
        assert!(matches!(
            schedule.validate(),
            Err(ScheduleError::InvalidTransitionRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_increment() {
        let schedule = Schedule::new(vec![
            Step::new(1, "A", 2).into(),
            Transition::new(1, 2).with_ramp(10, 10, 0).into(),
            Step::new(2, "B", 3).into(),
        ]);
        assert!(matches!(
            schedule.validate(),
            Err(ScheduleError::InvalidTransitionRange { increment: 0, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let schedule = Schedule::new(vec![
            Step::new(1, "A", 2).into(),
            Step::new(1, "A again", 2).into(),
        ]);
        assert_eq!(
            schedule.validate().unwrap_err(),
            ScheduleError::DuplicateStepId {
                index: 1,
                step_id: 1,
                first_index: 0
            }
        );
    }

    #[test]
    fn test_validate_rejects_zero_id() {
        let schedule = Schedule::new(vec![Step::new(0, "A", 2).into()]);
        assert!(matches!(
            schedule.validate(),
            Err(ScheduleError::InvalidStepId { index: 0, .. })
        ));
    }

    #[test]
    fn test_total_days() {
        let mut schedule = two_step_schedule();
        assert_eq!(schedule.total_days(), 2 + 3 + 3);

        schedule.nodes[0] = Step::new(1, "A", 2).with_delay(4).into();
        assert_eq!(schedule.total_days(), 6 + 3 + 3);
    }

    #[test]
    fn test_single_quantity_ramp_is_one_day() {
        let transition = Transition::new(1, 2).with_ramp(30, 30, 5);
        assert_eq!(transition.day_count(), Some(1));
    }
}
