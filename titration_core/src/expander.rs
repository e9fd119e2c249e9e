//! Schedule expansion into dated day entries.
//!
//! The expander walks the schedule once, keeping a date cursor that starts at
//! the regimen start date and advances by exactly the number of entries each
//! node emits. Consecutive entries are therefore one day apart with no gaps
//! or duplicates across node boundaries.

use crate::{DayEntry, DayKind, Node, Schedule, ScheduleError, Step, Transition};
use chrono::{Days, NaiveDate};

/// Expand a schedule with the default wording
pub fn expand(schedule: &Schedule, start_date: NaiveDate) -> Result<Vec<DayEntry>, ScheduleError> {
    Expander::default().expand(schedule, start_date)
}

/// Expands schedules into day entries
///
/// Holds the wording used in event descriptions. The original regimen mixes
/// transition doses into applesauce, so that is fixed; the volume and the
/// substance name are configurable.
#[derive(Clone, Debug)]
pub struct Expander {
    mixture_volume: String,
    substance: String,
}

impl Default for Expander {
    fn default() -> Self {
        Self {
            mixture_volume: "3 oz".into(),
            substance: "cashew".into(),
        }
    }
}

impl Expander {
    pub fn new(mixture_volume: impl Into<String>, substance: impl Into<String>) -> Self {
        Self {
            mixture_volume: mixture_volume.into(),
            substance: substance.into(),
        }
    }

    /// Expand the whole schedule starting at `start_date`
    ///
    /// The schedule is validated up front; an invalid schedule yields an error
    /// and no entries.
    pub fn expand(
        &self,
        schedule: &Schedule,
        start_date: NaiveDate,
    ) -> Result<Vec<DayEntry>, ScheduleError> {
        let index = schedule.validate()?;
        let total_days = schedule.total_days();

        // Last entry falls on start + total - 1
        if start_date
            .checked_add_days(Days::new(total_days.saturating_sub(1)))
            .is_none()
        {
            return Err(ScheduleError::DateOutOfRange {
                start: start_date,
                total_days,
            });
        }

        let mut entries = Vec::with_capacity(total_days as usize);
        let mut cursor = start_date;

        for (position, node) in schedule.nodes.iter().enumerate() {
            let emitted = match node {
                Node::Step(step) => self.expand_step(step, cursor),
                Node::Transition(transition) => {
                    let (from, to) = index.endpoints(position, transition)?;
                    self.expand_transition(transition, from, to, cursor)
                }
            };

            tracing::debug!(
                "Node {} emitted {} days starting {}",
                position,
                emitted.len(),
                cursor
            );
            // Only the final node can end on the last representable date
            if let Some(next) = cursor.checked_add_days(Days::new(emitted.len() as u64)) {
                cursor = next;
            }
            entries.extend(emitted);
        }

        tracing::info!(
            "Expanded {} nodes into {} days ({} to {})",
            schedule.nodes.len(),
            entries.len(),
            start_date,
            entries.last().map(|e| e.date).unwrap_or(start_date)
        );
        Ok(entries)
    }

    /// Normal days followed by delay days, contiguous from `start`
    fn expand_step(&self, step: &Step, start: NaiveDate) -> Vec<DayEntry> {
        let intended = step.intended_length.max(0) as u64;
        let delay = step.delay_length.max(0) as u64;
        let mut entries = Vec::with_capacity((intended + delay) as usize);

        for day in 1..=intended {
            entries.push(DayEntry {
                date: start + Days::new(day - 1),
                title: format!("Dose: {}", step.name),
                description: format!(
                    "Take {} of {}. (Day {}/{} of Step {})",
                    step.name, self.substance, day, intended, step.id
                ),
                kind: DayKind::Dose,
                quantity_ml: None,
            });
        }

        for day in 1..=delay {
            entries.push(DayEntry {
                date: start + Days::new(intended + day - 1),
                title: format!("Extended Dose: {}", step.name),
                description: format!(
                    "Keep taking {} of {} while the next step is delayed. (Delay Day {}/{})",
                    step.name, self.substance, day, delay
                ),
                kind: DayKind::Delay,
                quantity_ml: None,
            });
        }

        entries
    }

    /// One entry per quantity from the ramp start up to and including its end
    fn expand_transition(
        &self,
        transition: &Transition,
        from: &Step,
        to: &Step,
        start: NaiveDate,
    ) -> Vec<DayEntry> {
        // Validation guarantees the ramp divides evenly
        let total = transition.day_count().unwrap_or(0);
        let mut entries = Vec::with_capacity(total as usize);

        let mut quantity = Some(transition.ml_start_number);
        let mut day: u64 = 1;
        while let Some(ml) = quantity.filter(|ml| *ml <= transition.ml_end_number) {
            entries.push(DayEntry {
                date: start + Days::new(day - 1),
                title: format!("Dose: {}ml from {} mixture", ml, to.name),
                description: format!(
                    "Transition Day {}/{} (from {} to {})\n\
                     Prepare for {}: Mix one dose of '{}' into {} of applesauce. \
                     Take {}ml of this mixture today.",
                    day, total, from.name, to.name, to.name, to.name, self.mixture_volume, ml
                ),
                kind: DayKind::Transition,
                quantity_ml: Some(ml),
            });
            quantity = ml.checked_add(transition.ml_increment_per_day);
            day += 1;
        }

        debug_assert_eq!(entries.len() as u64, total);
        entries
    }
}
