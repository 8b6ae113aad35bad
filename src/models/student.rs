//! Student model.
//!
//! Students are owned by the entity store and only referenced (by
//! registration number) from schedules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Student registration number (primary key, immutable).
pub type RegNo = String;

/// A student who can be placed into exam batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Unique registration number.
    pub reg_no: RegNo,
    /// Full name.
    pub name: String,
    /// Branch code (e.g., "CSE-A").
    pub branch: String,
    /// Semester number.
    pub semester: u8,
}

/// A branch/semester cohort.
///
/// Ordered by branch first, then semester, which is the order the
/// partitioner visits cohorts in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cohort {
    /// Branch code.
    pub branch: String,
    /// Semester number.
    pub semester: u8,
}

/// Student as it appears inside a `ScheduleDto`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDto {
    pub reg_no: RegNo,
    pub name: String,
    pub branch: String,
    pub semester: u8,
}

impl Student {
    /// Creates a new student.
    pub fn new(
        reg_no: impl Into<RegNo>,
        name: impl Into<String>,
        branch: impl Into<String>,
        semester: u8,
    ) -> Self {
        Self {
            reg_no: reg_no.into(),
            name: name.into(),
            branch: branch.into(),
            semester,
        }
    }

    /// The cohort this student belongs to.
    pub fn cohort(&self) -> Cohort {
        Cohort::new(self.branch.clone(), self.semester)
    }

    /// Whether this student belongs to the given cohort.
    pub fn is_in(&self, cohort: &Cohort) -> bool {
        self.branch == cohort.branch && self.semester == cohort.semester
    }

    /// Converts into the DTO form.
    pub fn to_dto(&self) -> StudentDto {
        StudentDto {
            reg_no: self.reg_no.clone(),
            name: self.name.clone(),
            branch: self.branch.clone(),
            semester: self.semester,
        }
    }
}

impl Cohort {
    /// Creates a new cohort descriptor.
    pub fn new(branch: impl Into<String>, semester: u8) -> Self {
        Self {
            branch: branch.into(),
            semester,
        }
    }

    /// Group label stamped on batches built from this cohort.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.branch, self.semester)
    }
}
