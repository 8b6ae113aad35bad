//! Batch partitioner.
//!
//! Validates a generation request, runs the policy, and normalizes its
//! output into persistable batches. Whatever the policy returns, the
//! resulting plan satisfies:
//! - every batch has between 1 and `max_per_batch` members
//! - batch numbers are exactly `1..=N` in plan order
//! - no student appears twice
//! - no member overlaps one of their existing bookings
//! - every student is either placed or reported
//!
//! The partitioner is pure; loading bookings and committing the plan is
//! the caller's job.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use super::policy::{BatchPolicy, CohortRoundRobin, PlanInput};
use crate::collision::OccupancyIndex;
use crate::error::EngineError;
use crate::models::{
    Exam, NewSchedule, RegNo, RunId, Student, StudentPlacementError, TimeSlot,
};
use crate::validation::validate_generation;

/// Output of one generation run, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    /// Identifier stamped on every batch of the run.
    pub run_id: RunId,
    /// Batches, numbered `1..=N`.
    pub batches: Vec<NewSchedule>,
    /// Students that could not be placed.
    pub errors: Vec<StudentPlacementError>,
}

/// Partitions a population into batches using a [`BatchPolicy`].
#[derive(Debug, Clone)]
pub struct BatchPartitioner {
    policy: Arc<dyn BatchPolicy>,
    max_batch_size_limit: Option<usize>,
}

impl BatchPartitioner {
    /// Creates a partitioner using [`CohortRoundRobin`].
    pub fn new() -> Self {
        Self {
            policy: Arc::new(CohortRoundRobin),
            max_batch_size_limit: None,
        }
    }

    /// Replaces the assignment policy.
    pub fn with_policy<P: BatchPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Rejects requests whose `max_per_batch` exceeds `limit`.
    pub fn with_max_batch_size_limit(mut self, limit: Option<usize>) -> Self {
        self.max_batch_size_limit = limit;
        self
    }

    /// Name of the active policy.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Plans one generation run.
    ///
    /// # Errors
    /// `EngineError::Validation` if the request is malformed; nothing is
    /// planned in that case.
    pub fn partition(
        &self,
        exam: &Exam,
        date: NaiveDate,
        slots: &[TimeSlot],
        max_per_batch: usize,
        students: &[Student],
        occupancy: &OccupancyIndex,
    ) -> Result<GenerationPlan, EngineError> {
        validate_generation(exam, date, slots, max_per_batch, self.max_batch_size_limit)?;

        // One entry per registration number.
        let mut seen = HashSet::new();
        let population: Vec<Student> = students
            .iter()
            .filter(|s| seen.insert(s.reg_no.as_str()))
            .cloned()
            .collect();

        let raw = self.policy.plan(&PlanInput {
            slots,
            max_per_batch,
            students: &population,
            occupancy,
        });

        let run_id = Uuid::new_v4();
        let mut placed: HashSet<RegNo> = HashSet::new();
        let mut errors = raw.unplaced;
        let mut batches = Vec::new();

        for planned in raw.batches {
            let Some(slot) = slots.get(planned.slot_index) else {
                tracing::warn!(
                    policy = self.policy.name(),
                    slot_index = planned.slot_index,
                    "policy referenced an unknown slot; batch dropped"
                );
                continue;
            };

            let mut members: Vec<RegNo> = Vec::with_capacity(planned.members.len());
            for reg_no in planned.members {
                if !seen.contains(reg_no.as_str()) || placed.contains(&reg_no) {
                    continue;
                }
                let blocking = occupancy.conflicting(&reg_no, slot, &[]);
                if !blocking.is_empty() {
                    errors.push(StudentPlacementError::collision(reg_no, blocking));
                    continue;
                }
                placed.insert(reg_no.clone());
                members.push(reg_no);
            }

            for chunk in members.chunks(max_per_batch) {
                batches.push(NewSchedule {
                    exam_id: exam.id,
                    date,
                    time_slot: slot.clone(),
                    batch_number: batches.len() as u32 + 1,
                    group: planned.group.clone(),
                    run_id,
                    capacity: max_per_batch,
                    members: chunk.iter().cloned().collect::<BTreeSet<_>>(),
                });
            }
        }

        // Keep one report per student, and none for students that ended
        // up placed.
        let mut reported: BTreeMap<RegNo, StudentPlacementError> = BTreeMap::new();
        for e in errors {
            if !placed.contains(&e.reg_no) {
                reported.entry(e.reg_no.clone()).or_insert(e);
            }
        }
        for s in &population {
            if !placed.contains(&s.reg_no) && !reported.contains_key(&s.reg_no) {
                reported.insert(s.reg_no.clone(), StudentPlacementError::unassigned(&s.reg_no));
            }
        }

        Ok(GenerationPlan {
            run_id,
            batches,
            errors: reported.into_values().collect(),
        })
    }
}

impl Default for BatchPartitioner {
    fn default() -> Self {
        Self::new()
    }
}
