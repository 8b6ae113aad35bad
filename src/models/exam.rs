//! Exam model.
//!
//! An exam runs in one lab over an inclusive date range. Batches may
//! only be generated for dates inside that range.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Exam identifier (store-assigned).
pub type ExamId = u64;

/// A lab exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    /// Unique exam identifier.
    pub id: ExamId,
    /// Subject code (e.g., "CS501").
    pub subject_code: String,
    /// Subject name.
    pub subject_name: String,
    /// Lab where the exam takes place.
    pub lab_no: String,
    /// First valid exam date (inclusive).
    pub date_start: NaiveDate,
    /// Last valid exam date (inclusive).
    pub date_end: NaiveDate,
    /// Internal examiner.
    pub examiner_internal: String,
    /// External examiner.
    pub examiner_external: String,
}

/// Exam fields carried alongside a listed schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSummary {
    pub subject_code: String,
    pub subject_name: String,
    pub lab_no: String,
}

impl Exam {
    /// Creates an exam valid on `[date_start, date_end]`.
    pub fn new(
        id: ExamId,
        subject_code: impl Into<String>,
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> Self {
        Self {
            id,
            subject_code: subject_code.into(),
            subject_name: String::new(),
            lab_no: String::new(),
            date_start,
            date_end,
            examiner_internal: String::new(),
            examiner_external: String::new(),
        }
    }

    /// Sets the subject name.
    pub fn with_subject_name(mut self, name: impl Into<String>) -> Self {
        self.subject_name = name.into();
        self
    }

    /// Sets the lab identifier.
    pub fn with_lab(mut self, lab_no: impl Into<String>) -> Self {
        self.lab_no = lab_no.into();
        self
    }

    /// Sets both examiners.
    pub fn with_examiners(
        mut self,
        internal: impl Into<String>,
        external: impl Into<String>,
    ) -> Self {
        self.examiner_internal = internal.into();
        self.examiner_external = external.into();
        self
    }

    /// Whether `date_start <= date_end`.
    pub fn has_valid_range(&self) -> bool {
        self.date_start <= self.date_end
    }

    /// Whether `date` falls inside the exam's date range.
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }

    /// Summary for listings.
    pub fn summary(&self) -> ExamSummary {
        ExamSummary {
            subject_code: self.subject_code.clone(),
            subject_name: self.subject_name.clone(),
            lab_no: self.lab_no.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    #[test]
    fn test_exam_builder() {
        let e = Exam::new(1, "CS501", d(10), d(14))
            .with_subject_name("Compiler Lab")
            .with_lab("L2")
            .with_examiners("Dr. Rao", "Dr. Iyer");

        assert_eq!(e.subject_name, "Compiler Lab");
        assert_eq!(e.summary().lab_no, "L2");
        assert_eq!(e.examiner_external, "Dr. Iyer");
    }

    #[test]
    fn test_exam_date_range() {
        let e = Exam::new(1, "CS501", d(10), d(14));
        assert!(e.has_valid_range());
        assert!(e.runs_on(d(10)));
        assert!(e.runs_on(d(14)));
        assert!(!e.runs_on(d(15)));

        let inverted = Exam::new(2, "CS502", d(14), d(10));
        assert!(!inverted.has_valid_range());
    }
}
