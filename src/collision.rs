//! Collision detection.
//!
//! A collision is the same student holding two batches on one date
//! whose slots overlap. [`OccupancyIndex::conflicting`] is the single
//! place that decision is made; the partitioner, the mutation paths and
//! the audit all go through it.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::error::StorageError;
use crate::models::{ExamId, RegNo, Schedule, ScheduleId, TimeSlot};
use crate::store::{ScheduleFilter, ScheduleRepository};

/// One existing placement of a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub schedule_id: ScheduleId,
    pub exam_id: ExamId,
    pub time_slot: TimeSlot,
}

/// A pair of batches that double-book one student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleBooking {
    pub reg_no: RegNo,
    pub date: NaiveDate,
    pub first: ScheduleId,
    pub second: ScheduleId,
}

/// Per-student bookings on one date.
#[derive(Debug, Clone, Default)]
pub struct OccupancyIndex {
    bookings: HashMap<RegNo, Vec<Booking>>,
}

impl OccupancyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes the members of `schedules`.
    ///
    /// Callers pass schedules of a single date.
    pub fn from_schedules<'a>(schedules: impl IntoIterator<Item = &'a Schedule>) -> Self {
        let mut index = Self::new();
        for s in schedules {
            for reg_no in &s.members {
                index.book(reg_no, s.id, s.exam_id, s.time_slot.clone());
            }
        }
        index
    }

    /// Records a booking.
    pub fn book(
        &mut self,
        reg_no: impl Into<RegNo>,
        schedule_id: ScheduleId,
        exam_id: ExamId,
        time_slot: TimeSlot,
    ) {
        self.bookings.entry(reg_no.into()).or_default().push(Booking {
            schedule_id,
            exam_id,
            time_slot,
        });
    }

    /// Existing bookings of a student.
    pub fn bookings(&self, reg_no: &str) -> &[Booking] {
        self.bookings.get(reg_no).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Schedules whose slot overlaps `slot` for this student, ignoring
    /// `exclude`.
    pub fn conflicting(&self, reg_no: &str, slot: &TimeSlot, exclude: &[ScheduleId]) -> Vec<ScheduleId> {
        self.bookings(reg_no)
            .iter()
            .filter(|b| !exclude.contains(&b.schedule_id) && b.time_slot.overlaps(slot))
            .map(|b| b.schedule_id)
            .collect()
    }

    /// Whether placing the student in `slot` would double-book them.
    pub fn conflicts(&self, reg_no: &str, slot: &TimeSlot, exclude: Option<ScheduleId>) -> bool {
        !self
            .conflicting(reg_no, slot, exclude.as_slice())
            .is_empty()
    }

    /// Number of students with at least one booking.
    pub fn student_count(&self) -> usize {
        self.bookings.len()
    }
}

/// Repository-backed collision detector.
pub struct CollisionDetector<'a, R: ScheduleRepository + ?Sized> {
    repo: &'a R,
}

impl<'a, R: ScheduleRepository + ?Sized> CollisionDetector<'a, R> {
    /// Creates a detector reading through `repo`.
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Loads every booking on `date`, skipping the `exclude` schedules.
    pub async fn occupancy(
        &self,
        date: NaiveDate,
        exclude: &[ScheduleId],
    ) -> Result<OccupancyIndex, StorageError> {
        let schedules = self.repo.list_schedules(&ScheduleFilter::on(date)).await?;
        Ok(OccupancyIndex::from_schedules(
            schedules.iter().filter(|s| !exclude.contains(&s.id)),
        ))
    }

    /// Schedules on `date` that would collide with placing `reg_no` in `slot`.
    pub async fn conflicting_schedules(
        &self,
        reg_no: &str,
        date: NaiveDate,
        slot: &TimeSlot,
        exclude: &[ScheduleId],
    ) -> Result<Vec<ScheduleId>, StorageError> {
        Ok(self
            .occupancy(date, exclude)
            .await?
            .conflicting(reg_no, slot, exclude))
    }

    /// `conflicts(student, date, timeSlot, excludeScheduleId?)`.
    pub async fn conflicts(
        &self,
        reg_no: &str,
        date: NaiveDate,
        slot: &TimeSlot,
        exclude: Option<ScheduleId>,
    ) -> Result<bool, StorageError> {
        Ok(!self
            .conflicting_schedules(reg_no, date, slot, exclude.as_slice())
            .await?
            .is_empty())
    }
}

/// Finds every double-booked student among `schedules`.
///
/// Schedules may span several dates; only same-date pairs are compared.
pub fn find_double_bookings(schedules: &[Schedule]) -> Vec<DoubleBooking> {
    let mut by_date: HashMap<NaiveDate, Vec<&Schedule>> = HashMap::new();
    for s in schedules {
        by_date.entry(s.date).or_default().push(s);
    }

    let mut found = Vec::new();
    for (date, day) in by_date {
        let index = OccupancyIndex::from_schedules(day.iter().copied());
        for s in &day {
            for reg_no in &s.members {
                for other in index.conflicting(reg_no, &s.time_slot, &[s.id]) {
                    // Report each unordered pair once.
                    if s.id < other {
                        found.push(DoubleBooking {
                            reg_no: reg_no.clone(),
                            date,
                            first: s.id,
                            second: other,
                        });
                    }
                }
            }
        }
    }
    found.sort_by(|a, b| (a.date, a.first, a.second).cmp(&(b.date, b.first, b.second)));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSchedule;
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    fn slot(start: &str, end: &str) -> TimeSlot {
        TimeSlot::parse("S", start, end).unwrap()
    }

    fn batch(exam_id: ExamId, day: u32, start: &str, end: &str, members: &[&str]) -> NewSchedule {
        NewSchedule {
            exam_id,
            date: d(day),
            time_slot: slot(start, end),
            batch_number: 1,
            group: "CSE-A-5".into(),
            run_id: Uuid::nil(),
            capacity: 5,
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_index_conflicts() {
        let mut index = OccupancyIndex::new();
        index.book("X", 1, 10, slot("09:00", "11:00"));

        assert!(index.conflicts("X", &slot("10:00", "12:00"), None));
        assert!(!index.conflicts("X", &slot("11:00", "12:00"), None));
        assert!(!index.conflicts("Y", &slot("10:00", "12:00"), None));
        assert!(!index.conflicts("X", &slot("10:00", "12:00"), Some(1)));
    }

    #[tokio::test]
    async fn test_detector_reads_only_same_date() {
        let store = MemoryStore::new();
        store
            .create_schedules(vec![
                batch(1, 12, "09:00", "11:00", &["X"]),
                batch(2, 13, "10:00", "12:00", &["X"]),
            ])
            .await
            .unwrap();
        let detector = CollisionDetector::new(&store);

        assert!(detector
            .conflicts("X", d(12), &slot("10:00", "12:00"), None)
            .await
            .unwrap());
        assert!(!detector
            .conflicts("X", d(14), &slot("10:00", "12:00"), None)
            .await
            .unwrap());
        assert!(!detector
            .conflicts("X", d(12), &slot("10:00", "12:00"), Some(1))
            .await
            .unwrap());
        assert_eq!(
            detector
                .conflicting_schedules("X", d(13), &slot("09:00", "10:30"), &[])
                .await
                .unwrap(),
            vec![2]
        );
    }

    #[test]
    fn test_find_double_bookings() {
        let schedules = vec![
            batch(1, 12, "09:00", "11:00", &["X", "Y"]).into_schedule(1),
            batch(2, 12, "10:00", "12:00", &["X"]).into_schedule(2),
            batch(3, 12, "11:00", "13:00", &["Y"]).into_schedule(3),
            batch(4, 13, "09:00", "11:00", &["X"]).into_schedule(4),
        ];
        let found = find_double_bookings(&schedules);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reg_no, "X");
        assert_eq!((found[0].first, found[0].second), (1, 2));
    }
}
