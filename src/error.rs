//! Engine error types.
//!
//! Every operation returns a typed result. Validation problems are
//! collected in full before anything is rejected; storage failures are
//! passed through untouched (no retry at this layer).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ExamId, RegNo, ScheduleId};
use crate::validation::ValidationError;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failure of the storage collaborator behind the repository facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A write referenced a record that does not exist.
    #[error("record {0} does not exist")]
    MissingRecord(ScheduleId),
    /// The backend could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A referenced entity that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("student '{0}' not found")]
    Student(RegNo),
    #[error("exam {0} not found")]
    Exam(ExamId),
    #[error("schedule {0} not found")]
    Schedule(ScheduleId),
    #[error("student '{reg_no}' is not a member of schedule {schedule_id}")]
    Membership {
        reg_no: RegNo,
        schedule_id: ScheduleId,
    },
}

/// Errors returned by engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any work.
    #[error("invalid input: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),
    /// The placement would double-book the student.
    #[error("student '{reg_no}' collides with schedules {conflicting:?} when placed in schedule {schedule_id}")]
    Collision {
        reg_no: RegNo,
        schedule_id: ScheduleId,
        conflicting: Vec<ScheduleId>,
    },
    /// The target batch is full.
    #[error("schedule {schedule_id} is full ({capacity} students)")]
    Capacity {
        schedule_id: ScheduleId,
        capacity: usize,
    },
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Serializable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Collision,
    Capacity,
    NotFound,
    Storage,
}

/// `Error{kind, message}` payload returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl EngineError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Collision { .. } => ErrorKind::Collision,
            EngineError::Capacity { .. } => ErrorKind::Capacity,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Builds the external error payload.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<Vec<ValidationError>> for EngineError {
    fn from(errors: Vec<ValidationError>) -> Self {
        EngineError::Validation(errors)
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
