//! Schedule (batch) model.
//!
//! A schedule is one batch: a set of students sitting one exam on one
//! date during one time slot. Batches are created in bulk by a
//! generation run and afterwards only change membership.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::{ExamId, ExamSummary, RegNo, Student, StudentDto, TimeSlot};

/// Schedule identifier (store-assigned).
pub type ScheduleId = u64;

/// Identifier of the generation run that created a batch.
pub type RunId = Uuid;

/// A persisted batch.
///
/// `total_students` is always derived from `members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique schedule identifier.
    pub id: ScheduleId,
    /// Owning exam.
    pub exam_id: ExamId,
    /// Calendar date of the batch.
    pub date: NaiveDate,
    /// Slot the batch occupies.
    pub time_slot: TimeSlot,
    /// 1-based batch number, dense within `run_id`.
    pub batch_number: u32,
    /// Cohort descriptor (e.g., "CSE-A-5").
    pub group: String,
    /// Generation run that created this batch.
    pub run_id: RunId,
    /// `max_students_per_batch` of the creating run.
    pub capacity: usize,
    /// Member registration numbers.
    pub members: BTreeSet<RegNo>,
}

/// A batch that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSchedule {
    pub exam_id: ExamId,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub batch_number: u32,
    pub group: String,
    pub run_id: RunId,
    pub capacity: usize,
    pub members: BTreeSet<RegNo>,
}

/// External representation of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDto {
    pub schedule_id: ScheduleId,
    pub exam_id: ExamId,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub batch_number: u32,
    pub group: String,
    pub students: Vec<StudentDto>,
    pub total_students: usize,
    /// Present when the exam record resolves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam: Option<ExamSummary>,
}

/// A student the partitioner could not place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPlacementError {
    /// Student that was left out.
    pub reg_no: RegNo,
    /// Why the student was left out.
    pub kind: PlacementErrorKind,
    /// Existing schedules that blocked every candidate slot.
    pub conflicting_schedules: Vec<ScheduleId>,
    /// Human-readable description.
    pub message: String,
}

/// Classification of placement failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementErrorKind {
    /// Every slot of the run overlaps an existing booking.
    Collision,
    /// The population named a registration number the store does not know.
    UnknownStudent,
    /// The batching policy neither placed nor reported the student.
    Unassigned,
}

impl Schedule {
    /// Number of members.
    #[inline]
    pub fn total_students(&self) -> usize {
        self.members.len()
    }

    /// Whether the batch can take one more student.
    #[inline]
    pub fn has_room(&self) -> bool {
        self.members.len() < self.capacity
    }

    /// Whether `reg_no` is a member.
    pub fn contains(&self, reg_no: &str) -> bool {
        self.members.contains(reg_no)
    }

    /// Builds the external form.
    ///
    /// `students` are the resolved member records; members the store no
    /// longer knows are omitted from `students` but still counted.
    pub fn to_dto(&self, students: &[Student], exam: Option<ExamSummary>) -> ScheduleDto {
        let mut rows: Vec<StudentDto> = students
            .iter()
            .filter(|s| self.contains(&s.reg_no))
            .map(Student::to_dto)
            .collect();
        rows.sort_by(|a, b| a.branch.cmp(&b.branch).then_with(|| a.reg_no.cmp(&b.reg_no)));

        ScheduleDto {
            schedule_id: self.id,
            exam_id: self.exam_id,
            date: self.date,
            time_slot: self.time_slot.clone(),
            batch_number: self.batch_number,
            group: self.group.clone(),
            students: rows,
            total_students: self.total_students(),
            exam,
        }
    }
}

impl NewSchedule {
    /// Attaches a store-assigned id.
    pub fn into_schedule(self, id: ScheduleId) -> Schedule {
        Schedule {
            id,
            exam_id: self.exam_id,
            date: self.date,
            time_slot: self.time_slot,
            batch_number: self.batch_number,
            group: self.group,
            run_id: self.run_id,
            capacity: self.capacity,
            members: self.members,
        }
    }
}

impl StudentPlacementError {
    /// Student blocked by existing bookings in every slot.
    pub fn collision(reg_no: impl Into<RegNo>, conflicting: Vec<ScheduleId>) -> Self {
        let reg_no = reg_no.into();
        let message = format!(
            "Student '{reg_no}' is already booked in an overlapping slot (schedules {conflicting:?})"
        );
        Self {
            reg_no,
            kind: PlacementErrorKind::Collision,
            conflicting_schedules: conflicting,
            message,
        }
    }

    /// Registration number not present in the entity store.
    pub fn unknown_student(reg_no: impl Into<RegNo>) -> Self {
        let reg_no = reg_no.into();
        let message = format!("Student '{reg_no}' does not exist");
        Self {
            reg_no,
            kind: PlacementErrorKind::UnknownStudent,
            conflicting_schedules: Vec::new(),
            message,
        }
    }

    /// Student left out by the batching policy.
    pub fn unassigned(reg_no: impl Into<RegNo>) -> Self {
        let reg_no = reg_no.into();
        let message = format!("Student '{reg_no}' was not assigned to any batch");
        Self {
            reg_no,
            kind: PlacementErrorKind::Unassigned,
            conflicting_schedules: Vec::new(),
            message,
        }
    }
}
