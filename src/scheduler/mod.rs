//! Batch partitioning and load metrics.
//!
//! Splits a student population into capacity-bounded batches over the
//! time slots of one (exam, date) generation run.
//!
//! # Algorithm
//!
//! The assignment heuristic is a [`BatchPolicy`]. The default,
//! [`CohortRoundRobin`], keeps branch/semester cohorts together, fills
//! each batch before opening the next, and opens batches on the slot
//! with the fewest batches so far. [`BatchPartitioner`] wraps any
//! policy and normalizes its output so the run always has dense batch
//! numbers, bounded batch sizes and no double-booked student.
//!
//! # KPI
//!
//! [`BatchKpi`] summarizes a run: batches and students per slot, slot
//! imbalance and seat fill rate.

mod kpi;
mod partitioner;
mod policy;

pub use kpi::{BatchKpi, SlotLoad};
pub use partitioner::{BatchPartitioner, GenerationPlan};
pub use policy::{BatchPlan, BatchPolicy, CohortRoundRobin, PlanInput, PlannedBatch};
