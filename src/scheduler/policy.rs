//! Batch assignment policies.
//!
//! A policy decides which student goes into which batch on which slot.
//! It sees the run's slots, capacity, population and the students'
//! existing bookings on the run date, and must not place anyone into a
//! slot their bookings overlap.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::collision::OccupancyIndex;
use crate::models::{Cohort, RegNo, Student, StudentPlacementError, TimeSlot};

/// Everything a policy may look at.
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    /// Slots of the run, in request order.
    pub slots: &'a [TimeSlot],
    /// Capacity of every batch.
    pub max_per_batch: usize,
    /// Population, one entry per student.
    pub students: &'a [Student],
    /// Existing bookings on the run date.
    pub occupancy: &'a OccupancyIndex,
}

/// A batch proposed by a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBatch {
    /// Index into [`PlanInput::slots`].
    pub slot_index: usize,
    /// Group label.
    pub group: String,
    /// Members, in placement order.
    pub members: Vec<RegNo>,
}

/// Policy output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    pub batches: Vec<PlannedBatch>,
    pub unplaced: Vec<StudentPlacementError>,
}

/// A student-to-batch assignment heuristic.
pub trait BatchPolicy: Send + Sync + Debug {
    /// Policy name.
    fn name(&self) -> &'static str;

    /// Assigns the population to batches.
    fn plan(&self, input: &PlanInput<'_>) -> BatchPlan;
}

/// Cohort-grouped, slot-balanced batching.
///
/// # Algorithm
/// 1. Group students by (branch, semester); visit cohorts in that order
///    and students within a cohort by registration number.
/// 2. Put each student into the earliest-opened batch of their cohort
///    that still has room and whose slot is free for them.
/// 3. Otherwise open a new batch on the free slot with the fewest
///    batches so far (ties go to the earlier slot).
/// 4. A student with no free slot at all is reported as a collision.
///
/// Batches never mix cohorts.
///
/// # Complexity
/// O(n · s) where n = students, s = slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct CohortRoundRobin;

impl BatchPolicy for CohortRoundRobin {
    fn name(&self) -> &'static str {
        "cohort-round-robin"
    }

    fn plan(&self, input: &PlanInput<'_>) -> BatchPlan {
        let PlanInput {
            slots,
            max_per_batch,
            students,
            occupancy,
        } = *input;

        let mut cohorts: BTreeMap<Cohort, Vec<&Student>> = BTreeMap::new();
        for s in students {
            cohorts.entry(s.cohort()).or_default().push(s);
        }

        let mut plan = BatchPlan::default();
        let mut slot_load = vec![0usize; slots.len()];

        for (cohort, mut members) in cohorts {
            members.sort_by(|a, b| a.reg_no.cmp(&b.reg_no));
            let label = cohort.label();
            // Batches of this cohort that still have room.
            let mut open: Vec<usize> = Vec::new();

            for student in members {
                let reg_no = student.reg_no.as_str();
                let is_free = |slot_index: usize| !occupancy.conflicts(reg_no, &slots[slot_index], None);

                let existing = open
                    .iter()
                    .copied()
                    .find(|&b| is_free(plan.batches[b].slot_index));

                let target = match existing {
                    Some(b) => b,
                    None => {
                        let Some(slot_index) = (0..slots.len())
                            .filter(|&i| is_free(i))
                            .min_by_key(|&i| (slot_load[i], i))
                        else {
                            let mut blocking: Vec<_> = slots
                                .iter()
                                .flat_map(|slot| occupancy.conflicting(reg_no, slot, &[]))
                                .collect();
                            blocking.sort_unstable();
                            blocking.dedup();
                            tracing::debug!(reg_no, ?blocking, "no conflict-free slot");
                            plan.unplaced
                                .push(StudentPlacementError::collision(reg_no, blocking));
                            continue;
                        };
                        slot_load[slot_index] += 1;
                        plan.batches.push(PlannedBatch {
                            slot_index,
                            group: label.clone(),
                            members: Vec::new(),
                        });
                        open.push(plan.batches.len() - 1);
                        plan.batches.len() - 1
                    }
                };

                plan.batches[target].members.push(student.reg_no.clone());
                if plan.batches[target].members.len() >= max_per_batch {
                    open.retain(|&b| b != target);
                }
            }
        }

        plan
    }
}
