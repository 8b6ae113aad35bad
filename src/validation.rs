//! Input validation for generation and mutation requests.
//!
//! Checks run before any work begins and collect every problem found,
//! so a caller can fix a request in one round trip. Detects:
//! - Empty or unparsable time slots
//! - Inverted or mutually overlapping slots within one run
//! - Duplicate slot names
//! - Non-positive (or over-limit) batch capacity
//! - Exam date ranges that are inverted or do not cover the run date
//! - Moves across dates or onto the same batch

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::models::{Exam, Schedule, TimeSlot, TimeSlotInput};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The request carries no time slots.
    NoTimeSlots,
    /// `max_students_per_batch` is zero.
    InvalidCapacity,
    /// `max_students_per_batch` exceeds the configured limit.
    CapacityAboveLimit,
    /// A slot bound is not a valid time of day.
    UnparsableTime,
    /// A slot does not satisfy `start < end`.
    InvertedTimeSlot,
    /// Two slots of the same run overlap.
    OverlappingTimeSlots,
    /// Two slots of the same run share a name.
    DuplicateSlotName,
    /// The exam's `date_start` is after its `date_end`.
    InvertedExamDateRange,
    /// The run date lies outside the exam's date range.
    DateOutsideExam,
    /// Source and target schedules are on different dates.
    CrossDateMove,
    /// Source and target schedules are the same batch.
    SameSchedule,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Parses raw client slots.
///
/// Every unparsable bound is reported; nothing is returned unless all
/// slots parse.
pub fn parse_time_slots(inputs: &[TimeSlotInput]) -> Result<Vec<TimeSlot>, Vec<ValidationError>> {
    let mut slots = Vec::with_capacity(inputs.len());
    let mut errors = Vec::new();

    for input in inputs {
        match TimeSlot::parse(&input.slot_name, &input.start_time, &input.end_time) {
            Ok(slot) => slots.push(slot),
            Err(e) => errors.push(ValidationError::new(
                ValidationErrorKind::UnparsableTime,
                format!(
                    "Time slot '{}' has unparsable bounds '{}'..'{}': {e}",
                    input.slot_name, input.start_time, input.end_time
                ),
            )),
        }
    }

    if errors.is_empty() {
        Ok(slots)
    } else {
        Err(errors)
    }
}

/// Validates a generation request.
///
/// Checks:
/// 1. At least one time slot
/// 2. `max_per_batch >= 1` (and within `limit`, if set)
/// 3. Every slot has `start < end`
/// 4. No two slots share a name
/// 5. No two slots overlap each other
/// 6. The exam's date range is not inverted
/// 7. `date` lies inside the exam's date range
pub fn validate_generation(
    exam: &Exam,
    date: NaiveDate,
    slots: &[TimeSlot],
    max_per_batch: usize,
    limit: Option<usize>,
) -> ValidationResult {
    let mut errors = Vec::new();

    if slots.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoTimeSlots,
            "At least one time slot is required",
        ));
    }

    if max_per_batch == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidCapacity,
            "max_students_per_batch must be at least 1",
        ));
    } else if let Some(limit) = limit.filter(|&l| max_per_batch > l) {
        errors.push(ValidationError::new(
            ValidationErrorKind::CapacityAboveLimit,
            format!("max_students_per_batch {max_per_batch} exceeds the limit of {limit}"),
        ));
    }

    let mut names = HashSet::new();
    for slot in slots {
        if !slot.is_valid() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvertedTimeSlot,
                format!("Time slot '{}' ({slot}) must start before it ends", slot.name),
            ));
        }
        if !names.insert(slot.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateSlotName,
                format!("Duplicate time slot name: {}", slot.name),
            ));
        }
    }

    for (i, a) in slots.iter().enumerate() {
        for b in &slots[i + 1..] {
            if a.is_valid() && b.is_valid() && a.overlaps(b) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::OverlappingTimeSlots,
                    format!(
                        "Time slots '{}' ({a}) and '{}' ({b}) overlap",
                        a.name, b.name
                    ),
                ));
            }
        }
    }

    if !exam.has_valid_range() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvertedExamDateRange,
            format!(
                "Exam {} ends ({}) before it starts ({})",
                exam.id, exam.date_end, exam.date_start
            ),
        ));
    } else if !exam.runs_on(date) {
        errors.push(ValidationError::new(
            ValidationErrorKind::DateOutsideExam,
            format!(
                "Date {date} is outside exam {} range {}..={}",
                exam.id, exam.date_start, exam.date_end
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates that a student may move from `from` to `to`.
///
/// Cross-date moves are rejected unless `allow_cross_date` is set.
pub fn validate_move(from: &Schedule, to: &Schedule, allow_cross_date: bool) -> ValidationResult {
    let mut errors = Vec::new();

    if from.id == to.id {
        errors.push(ValidationError::new(
            ValidationErrorKind::SameSchedule,
            format!("Source and target are the same schedule ({})", from.id),
        ));
    }

    if from.date != to.date && !allow_cross_date {
        errors.push(ValidationError::new(
            ValidationErrorKind::CrossDateMove,
            format!(
                "Schedule {} is on {} but schedule {} is on {}; moves must stay on one date",
                from.id, from.date, to.id, to.date
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSchedule;
    use uuid::Uuid;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    fn exam() -> Exam {
        Exam::new(1, "CS501", d(10), d(14))
    }

    fn slot(name: &str, start: &str, end: &str) -> TimeSlot {
        TimeSlot::parse(name, start, end).unwrap()
    }

    fn sample_slots() -> Vec<TimeSlot> {
        vec![
            slot("Slot 1", "09:30", "12:30"),
            slot("Slot 2", "13:30", "16:30"),
        ]
    }

    fn schedule(id: u64, day: u32) -> Schedule {
        NewSchedule {
            exam_id: 1,
            date: d(day),
            time_slot: slot("Slot 1", "09:30", "12:30"),
            batch_number: 1,
            group: "CSE-A-5".into(),
            run_id: Uuid::nil(),
            capacity: 3,
            members: Default::default(),
        }
        .into_schedule(id)
    }

    fn kinds(errors: &[ValidationError]) -> Vec<ValidationErrorKind> {
        errors.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_valid_generation() {
        assert!(validate_generation(&exam(), d(12), &sample_slots(), 3, None).is_ok());
    }

    #[test]
    fn test_no_slots() {
        let errors = validate_generation(&exam(), d(12), &[], 3, None).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::NoTimeSlots]);
    }

    #[test]
    fn test_zero_capacity() {
        let errors = validate_generation(&exam(), d(12), &sample_slots(), 0, None).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::InvalidCapacity]);
    }

    #[test]
    fn test_capacity_limit() {
        assert!(validate_generation(&exam(), d(12), &sample_slots(), 20, Some(20)).is_ok());
        let errors =
            validate_generation(&exam(), d(12), &sample_slots(), 21, Some(20)).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::CapacityAboveLimit]);
    }

    #[test]
    fn test_inverted_slot() {
        let slots = vec![slot("Slot 1", "12:30", "09:30")];
        let errors = validate_generation(&exam(), d(12), &slots, 3, None).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::InvertedTimeSlot]);
    }

    #[test]
    fn test_overlapping_slots() {
        let slots = vec![
            slot("Slot 1", "09:00", "11:00"),
            slot("Slot 2", "10:00", "12:00"),
        ];
        let errors = validate_generation(&exam(), d(12), &slots, 3, None).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::OverlappingTimeSlots]);
    }

    #[test]
    fn test_touching_slots_are_fine() {
        let slots = vec![
            slot("Slot 1", "09:00", "11:00"),
            slot("Slot 2", "11:00", "13:00"),
        ];
        assert!(validate_generation(&exam(), d(12), &slots, 3, None).is_ok());
    }

    #[test]
    fn test_duplicate_slot_name() {
        let slots = vec![
            slot("Slot 1", "09:00", "10:00"),
            slot("Slot 1", "11:00", "12:00"),
        ];
        let errors = validate_generation(&exam(), d(12), &slots, 3, None).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::DuplicateSlotName]);
    }

    #[test]
    fn test_exam_date_checks() {
        let errors = validate_generation(&exam(), d(20), &sample_slots(), 3, None).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::DateOutsideExam]);

        let inverted = Exam::new(2, "CS502", d(14), d(10));
        let errors = validate_generation(&inverted, d(12), &sample_slots(), 3, None).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::InvertedExamDateRange]);
    }

    #[test]
    fn test_multiple_errors() {
        let slots = vec![slot("A", "10:00", "09:00")];
        let errors = validate_generation(&exam(), d(30), &slots, 0, None).unwrap_err();
        assert!(errors.len() >= 3);
    }

    #[test]
    fn test_parse_time_slots() {
        let ok = parse_time_slots(&[TimeSlotInput::new("Slot 1", "09:30", "12:30")]).unwrap();
        assert_eq!(ok[0].to_string(), "09:30–12:30");

        let errors = parse_time_slots(&[
            TimeSlotInput::new("Slot 1", "09:30", "12:30"),
            TimeSlotInput::new("Slot 2", "", "16:30"),
            TimeSlotInput::new("Slot 3", "25:00", "26:00"),
        ])
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.kind == ValidationErrorKind::UnparsableTime));
    }

    #[test]
    fn test_validate_move() {
        assert!(validate_move(&schedule(1, 12), &schedule(2, 12), false).is_ok());

        let errors = validate_move(&schedule(1, 12), &schedule(2, 13), false).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::CrossDateMove]);
        assert!(validate_move(&schedule(1, 12), &schedule(2, 13), true).is_ok());

        let errors = validate_move(&schedule(1, 12), &schedule(1, 12), false).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::SameSchedule]);
    }
}
