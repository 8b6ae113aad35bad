//! In-process store.
//!
//! Implements both [`EntityStore`] and [`ScheduleRepository`] over
//! ordered maps behind a single `tokio::sync::RwLock`. Writes are staged
//! on a copy and swapped in only when every write succeeded.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{EntityStore, ScheduleFilter, ScheduleRepository, ScheduleWrite};
use crate::error::StorageError;
use crate::models::{Exam, ExamId, RegNo, Schedule, ScheduleId, Student};

#[derive(Debug, Default)]
struct Tables {
    students: BTreeMap<RegNo, Student>,
    exams: BTreeMap<ExamId, Exam>,
    schedules: BTreeMap<ScheduleId, Schedule>,
    next_schedule_id: ScheduleId,
}

/// In-memory entity store and schedule repository.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_exam_schedule::models::{Exam, Student};
/// use u_exam_schedule::store::MemoryStore;
///
/// let day = NaiveDate::from_ymd_opt(2025, 11, 12).unwrap();
/// let store = MemoryStore::new()
///     .with_exam(Exam::new(1, "CS501", day, day))
///     .with_student(Student::new("21CS001", "Asha", "CSE-A", 5));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a student record.
    pub fn with_student(mut self, student: Student) -> Self {
        self.tables
            .get_mut()
            .students
            .insert(student.reg_no.clone(), student);
        self
    }

    /// Adds several student records.
    pub fn with_students(mut self, students: impl IntoIterator<Item = Student>) -> Self {
        let tables = self.tables.get_mut();
        for s in students {
            tables.students.insert(s.reg_no.clone(), s);
        }
        self
    }

    /// Adds (or replaces) an exam record.
    pub fn with_exam(mut self, exam: Exam) -> Self {
        self.tables.get_mut().exams.insert(exam.id, exam);
        self
    }

    /// Adds (or replaces) a student record on a shared store.
    pub async fn insert_student(&self, student: Student) {
        self.tables
            .write()
            .await
            .students
            .insert(student.reg_no.clone(), student);
    }

    /// Adds (or replaces) an exam record on a shared store.
    pub async fn insert_exam(&self, exam: Exam) {
        self.tables.write().await.exams.insert(exam.id, exam);
    }

    /// Number of persisted schedules.
    pub async fn schedule_count(&self) -> usize {
        self.tables.read().await.schedules.len()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_student(&self, reg_no: &str) -> Result<Option<Student>, StorageError> {
        Ok(self.tables.read().await.students.get(reg_no).cloned())
    }

    async fn list_students(&self) -> Result<Vec<Student>, StorageError> {
        Ok(self.tables.read().await.students.values().cloned().collect())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        Ok(self.tables.read().await.exams.get(&id).cloned())
    }
}

#[async_trait]
impl ScheduleRepository for MemoryStore {
    async fn list_schedules(&self, filter: &ScheduleFilter) -> Result<Vec<Schedule>, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .schedules
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, StorageError> {
        Ok(self.tables.read().await.schedules.get(&id).cloned())
    }

    async fn apply(&self, writes: Vec<ScheduleWrite>) -> Result<Vec<Schedule>, StorageError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.schedules.clone();
        let mut next_id = tables.next_schedule_id;
        let mut created = Vec::new();

        for write in writes {
            match write {
                ScheduleWrite::Create(new) => {
                    next_id += 1;
                    let schedule = new.into_schedule(next_id);
                    staged.insert(next_id, schedule.clone());
                    created.push(schedule);
                }
                ScheduleWrite::SetMembers { id, members } => {
                    staged
                        .get_mut(&id)
                        .ok_or(StorageError::MissingRecord(id))?
                        .members = members;
                }
                ScheduleWrite::SetBatchNumber { id, batch_number } => {
                    staged
                        .get_mut(&id)
                        .ok_or(StorageError::MissingRecord(id))?
                        .batch_number = batch_number;
                }
                ScheduleWrite::Delete(id) => {
                    staged.remove(&id).ok_or(StorageError::MissingRecord(id))?;
                }
            }
        }

        tables.schedules = staged;
        tables.next_schedule_id = next_id;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewSchedule, TimeSlot};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn new_schedule(batch_number: u32, members: &[&str]) -> NewSchedule {
        NewSchedule {
            exam_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 11, 12).unwrap(),
            time_slot: TimeSlot::parse("Slot 1", "09:30", "12:30").unwrap(),
            batch_number,
            group: "CSE-A-5".into(),
            run_id: Uuid::nil(),
            capacity: 3,
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let created = store
            .create_schedules(vec![new_schedule(1, &["A"]), new_schedule(2, &["B"])])
            .await
            .unwrap();
        assert_eq!(created[0].id, 1);
        assert_eq!(created[1].id, 2);

        let more = store.create_schedules(vec![new_schedule(1, &[])]).await.unwrap();
        assert_eq!(more[0].id, 3);
        assert_eq!(store.schedule_count().await, 3);
    }

    #[tokio::test]
    async fn test_failed_apply_changes_nothing() {
        let store = MemoryStore::new();
        store
            .create_schedules(vec![new_schedule(1, &["A"])])
            .await
            .unwrap();
        let before = store.list_schedules(&ScheduleFilter::all()).await.unwrap();

        let err = store
            .apply(vec![
                ScheduleWrite::SetMembers {
                    id: 1,
                    members: BTreeSet::new(),
                },
                ScheduleWrite::Create(new_schedule(2, &["B"])),
                ScheduleWrite::Delete(99),
            ])
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::MissingRecord(99));

        let after = store.list_schedules(&ScheduleFilter::all()).await.unwrap();
        assert_eq!(before, after);

        // The id counter did not advance either.
        let created = store.create_schedules(vec![new_schedule(2, &[])]).await.unwrap();
        assert_eq!(created[0].id, 2);
    }

    #[tokio::test]
    async fn test_membership_and_delete() {
        let store = MemoryStore::new();
        store
            .create_schedules(vec![new_schedule(1, &["A", "B"]), new_schedule(2, &["C"])])
            .await
            .unwrap();

        store
            .update_memberships(vec![
                (1, ["A"].iter().map(|s| s.to_string()).collect()),
                (2, ["B", "C"].iter().map(|s| s.to_string()).collect()),
            ])
            .await
            .unwrap();
        assert_eq!(store.get_schedule(2).await.unwrap().unwrap().total_students(), 2);

        store.delete_schedule(1).await.unwrap();
        assert!(store.get_schedule(1).await.unwrap().is_none());
        assert_eq!(
            store.delete_schedule(1).await.unwrap_err(),
            StorageError::MissingRecord(1)
        );
    }

    #[tokio::test]
    async fn test_entity_reads() {
        let day = NaiveDate::from_ymd_opt(2025, 11, 12).unwrap();
        let store = MemoryStore::new()
            .with_students(vec![
                Student::new("S1", "A", "CSE-A", 5),
                Student::new("S2", "B", "CSE-A", 5),
            ])
            .with_exam(Exam::new(4, "CS501", day, day));
        store.insert_student(Student::new("S3", "C", "ECE", 3)).await;
        store.insert_exam(Exam::new(5, "CS502", day, day)).await;

        assert_eq!(store.list_students().await.unwrap().len(), 3);
        assert!(store.get_student("S2").await.unwrap().is_some());
        assert!(store.get_student("S9").await.unwrap().is_none());
        assert!(store.get_exam(4).await.unwrap().is_some());
        assert_eq!(store.get_exam(5).await.unwrap().unwrap().subject_code, "CS502");
    }
}
