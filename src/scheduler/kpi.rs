//! Generation run metrics (KPIs).
//!
//! Summarizes how a run spread its batches over the time slots.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Batch count | Number of batches in the run |
//! | Student count | Seats taken across all batches |
//! | Slot load | Batches and students per slot |
//! | Max slot imbalance | max(batches per slot) - min(batches per slot) |
//! | Fill rate | Seats taken / seats offered |

use serde::{Deserialize, Serialize};

use crate::models::{Schedule, TimeSlot};

/// Load carried by one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLoad {
    pub slot_name: String,
    pub batches: usize,
    pub students: usize,
}

/// Run performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchKpi {
    /// Number of batches.
    pub batch_count: usize,
    /// Total members across batches.
    pub student_count: usize,
    /// Per-slot load, in slot order.
    pub slot_loads: Vec<SlotLoad>,
    /// Difference between the busiest and the idlest slot, in batches.
    pub max_slot_imbalance: usize,
    /// Fraction of offered seats that are taken (0.0..1.0).
    pub fill_rate: f64,
}

impl BatchKpi {
    /// Computes KPIs for `schedules` over `slots`.
    ///
    /// Slots are matched by name; a schedule whose slot is not listed
    /// adds a trailing entry.
    pub fn calculate(slots: &[TimeSlot], schedules: &[Schedule]) -> Self {
        let mut slot_loads: Vec<SlotLoad> = slots
            .iter()
            .map(|s| SlotLoad {
                slot_name: s.name.clone(),
                batches: 0,
                students: 0,
            })
            .collect();

        let mut seats = 0usize;
        let mut student_count = 0usize;

        for schedule in schedules {
            let idx = match slot_loads
                .iter()
                .position(|l| l.slot_name == schedule.time_slot.name)
            {
                Some(i) => i,
                None => {
                    slot_loads.push(SlotLoad {
                        slot_name: schedule.time_slot.name.clone(),
                        batches: 0,
                        students: 0,
                    });
                    slot_loads.len() - 1
                }
            };
            slot_loads[idx].batches += 1;
            slot_loads[idx].students += schedule.total_students();
            seats = seats.saturating_add(schedule.capacity);
            student_count += schedule.total_students();
        }

        let max_slot_imbalance = match (
            slot_loads.iter().map(|l| l.batches).max(),
            slot_loads.iter().map(|l| l.batches).min(),
        ) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        };

        let fill_rate = if seats == 0 {
            0.0
        } else {
            student_count as f64 / seats as f64
        };

        Self {
            batch_count: schedules.len(),
            student_count,
            slot_loads,
            max_slot_imbalance,
            fill_rate,
        }
    }

    /// Whether no slot carries more than `tolerance` extra batches.
    pub fn is_balanced(&self, tolerance: usize) -> bool {
        self.max_slot_imbalance <= tolerance
    }
}
