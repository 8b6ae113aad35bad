//! Exam batch scheduling engine.
//!
//! Partitions students into cohort-homogeneous, capacity-bounded batches
//! across the time slots of an exam day, and keeps those batches
//! collision-free while students are moved, added, or removed.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Student`, `Cohort`, `Exam`, `TimeSlot`,
//!   `Schedule`, and their external DTOs
//! - **`validation`**: Request checks (slot parsing and overlap, capacity,
//!   exam date range, move preconditions)
//! - **`collision`**: Occupancy index and the single collision predicate
//! - **`scheduler`**: Batch policies, the partitioner, and run KPIs
//! - **`coordinator`**: Move / assign / remove / delete with atomic writes
//! - **`locks`**: Per-domain serialization of mutations
//! - **`store`**: Entity and schedule repository traits, plus an
//!   in-memory implementation
//! - **`engine`**: `ExamScheduler`, the public service
//!
//! # Guarantees
//!
//! - A student never holds two batches on one date whose slots overlap
//! - A batch never exceeds its capacity
//! - Generation never mixes `(branch, semester)` cohorts in one batch
//! - Every multi-batch write commits fully or not at all
//!
//! # Logging
//!
//! Events are emitted through `tracing`. The crate installs no
//! subscriber.

pub mod collision;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod locks;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod validation;

pub use config::EngineConfig;
pub use engine::{ExamScheduler, GenerateRequest, GenerateResponse, MoveRequest, StudentPopulation};
pub use error::{EngineError, EngineResult, ErrorKind};
