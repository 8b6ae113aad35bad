//! Storage seams.
//!
//! The engine never touches storage mechanics directly. It reads
//! students and exams through [`EntityStore`] and reads/writes batches
//! through [`ScheduleRepository`], a narrow pass-through facade that is
//! trivial to mock.
//!
//! # Atomicity
//!
//! [`ScheduleRepository::apply`] is the only write primitive. A call
//! either applies every write in the list or none of them; the provided
//! convenience methods are expressed in terms of it.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::StorageError;
use crate::models::{Exam, ExamId, NewSchedule, RegNo, Schedule, ScheduleId, Student};

/// Read access to student and exam records.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Looks up a student by registration number.
    async fn get_student(&self, reg_no: &str) -> Result<Option<Student>, StorageError>;

    /// Returns every student.
    async fn list_students(&self) -> Result<Vec<Student>, StorageError>;

    /// Looks up an exam by id.
    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError>;
}

/// Optional filters for listing schedules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleFilter {
    pub date: Option<NaiveDate>,
    pub exam_id: Option<ExamId>,
}

impl ScheduleFilter {
    /// Matches every schedule.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches schedules on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            exam_id: None,
        }
    }

    /// Additionally restricts to one exam.
    pub fn with_exam(mut self, exam_id: ExamId) -> Self {
        self.exam_id = Some(exam_id);
        self
    }

    /// Whether `schedule` passes this filter.
    pub fn matches(&self, schedule: &Schedule) -> bool {
        self.date.is_none_or(|d| schedule.date == d)
            && self.exam_id.is_none_or(|e| schedule.exam_id == e)
    }
}

/// One write inside an atomic [`ScheduleRepository::apply`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleWrite {
    /// Persist a new batch; the store assigns its id.
    Create(NewSchedule),
    /// Replace a batch's member set.
    SetMembers {
        id: ScheduleId,
        members: BTreeSet<RegNo>,
    },
    /// Change a batch's number.
    SetBatchNumber { id: ScheduleId, batch_number: u32 },
    /// Remove a batch.
    Delete(ScheduleId),
}

/// The engine's only interface to persisted schedules.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Lists schedules passing `filter`.
    async fn list_schedules(&self, filter: &ScheduleFilter) -> Result<Vec<Schedule>, StorageError>;

    /// Looks up one schedule.
    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, StorageError>;

    /// Applies all writes atomically.
    ///
    /// Returns the schedules created by `Create` writes, in order.
    async fn apply(&self, writes: Vec<ScheduleWrite>) -> Result<Vec<Schedule>, StorageError>;

    /// Persists a set of new batches atomically.
    async fn create_schedules(
        &self,
        batch: Vec<NewSchedule>,
    ) -> Result<Vec<Schedule>, StorageError> {
        self.apply(batch.into_iter().map(ScheduleWrite::Create).collect())
            .await
    }

    /// Replaces one batch's member set.
    async fn update_membership(
        &self,
        id: ScheduleId,
        members: BTreeSet<RegNo>,
    ) -> Result<(), StorageError> {
        self.apply(vec![ScheduleWrite::SetMembers { id, members }])
            .await
            .map(|_| ())
    }

    /// Replaces several member sets atomically.
    async fn update_memberships(
        &self,
        updates: Vec<(ScheduleId, BTreeSet<RegNo>)>,
    ) -> Result<(), StorageError> {
        let writes = updates
            .into_iter()
            .map(|(id, members)| ScheduleWrite::SetMembers { id, members })
            .collect();
        self.apply(writes).await.map(|_| ())
    }

    /// Removes one batch.
    async fn delete_schedule(&self, id: ScheduleId) -> Result<(), StorageError> {
        self.apply(vec![ScheduleWrite::Delete(id)]).await.map(|_| ())
    }
}
