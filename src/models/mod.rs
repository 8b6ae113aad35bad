//! Exam scheduling domain models.
//!
//! Provides the records the engine reads (students, exams), the
//! per-run time slots, and the batches ("schedules") it creates and
//! mutates.
//!
//! # Domain Mappings
//!
//! | u-exam-schedule | Meaning |
//! |-----------------|---------|
//! | Student | Examinee, keyed by registration number |
//! | Exam | Lab/practical exam with a valid date range |
//! | TimeSlot | Named interval within a day |
//! | Schedule | One batch: exam × date × slot × members |
//! | Cohort | Students sharing branch and semester |

mod exam;
mod schedule;
mod student;
mod time_slot;

pub use exam::{Exam, ExamId, ExamSummary};
pub use schedule::{
    NewSchedule, PlacementErrorKind, RunId, Schedule, ScheduleDto, ScheduleId,
    StudentPlacementError,
};
pub use student::{Cohort, RegNo, Student, StudentDto};
pub use time_slot::{TimeSlot, TimeSlotInput};
