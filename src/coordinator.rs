//! Membership mutations on existing batches.
//!
//! Each operation resolves its schedules, runs every check, and only
//! then issues a single atomic repository write. A rejected call leaves
//! every schedule exactly as it was.
//!
//! Callers must hold the serialization domains of the schedules they
//! touch (see [`crate::locks`]); the coordinator reads and writes
//! assuming nobody else mutates those batches meanwhile.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::collision::CollisionDetector;
use crate::error::{EngineError, EngineResult, NotFound};
use crate::models::{RegNo, Schedule, ScheduleId, Student};
use crate::store::{ScheduleFilter, ScheduleRepository, ScheduleWrite};
use crate::validation::validate_move;

/// Both sides of a completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Source batch after the move.
    pub from: Schedule,
    /// Target batch after the move.
    pub to: Schedule,
}

/// Applies membership changes through a [`ScheduleRepository`].
pub struct MutationCoordinator<'a, R: ScheduleRepository + ?Sized> {
    repo: &'a R,
    allow_cross_date: bool,
}

impl<'a, R: ScheduleRepository + ?Sized> MutationCoordinator<'a, R> {
    /// Creates a coordinator; cross-date moves are rejected.
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            allow_cross_date: false,
        }
    }

    /// Allows moves between batches on different dates.
    pub fn with_cross_date_moves(mut self, allow: bool) -> Self {
        self.allow_cross_date = allow;
        self
    }

    /// Resolves a schedule or fails with `NotFound`.
    pub async fn resolve(&self, id: ScheduleId) -> EngineResult<Schedule> {
        self.repo
            .get_schedule(id)
            .await?
            .ok_or_else(|| NotFound::Schedule(id).into())
    }

    /// Moves `reg_no` from one batch to another.
    ///
    /// # Errors
    /// - `NotFound` if either schedule is missing or the student is not
    ///   in `from_id`
    /// - `Validation` for same-schedule or (unless allowed) cross-date moves
    /// - `Capacity` if the target is full
    /// - `Collision` if the target slot overlaps another of the
    ///   student's batches on the target date
    pub async fn move_student(
        &self,
        reg_no: &str,
        from_id: ScheduleId,
        to_id: ScheduleId,
    ) -> EngineResult<MoveOutcome> {
        let from = self.resolve(from_id).await?;
        let to = self.resolve(to_id).await?;

        if !from.contains(reg_no) {
            return Err(NotFound::Membership {
                reg_no: reg_no.to_string(),
                schedule_id: from_id,
            }
            .into());
        }

        validate_move(&from, &to, self.allow_cross_date)?;

        if !to.has_room() {
            warn!(reg_no, from_id, to_id, capacity = to.capacity, "move rejected: target full");
            return Err(EngineError::Capacity {
                schedule_id: to_id,
                capacity: to.capacity,
            });
        }

        let conflicting = CollisionDetector::new(self.repo)
            .conflicting_schedules(reg_no, to.date, &to.time_slot, &[from_id])
            .await?;
        if !conflicting.is_empty() {
            warn!(reg_no, from_id, to_id, ?conflicting, "move rejected: collision");
            return Err(EngineError::Collision {
                reg_no: reg_no.to_string(),
                schedule_id: to_id,
                conflicting,
            });
        }

        let mut from_members = from.members.clone();
        from_members.remove(reg_no);
        let mut to_members = to.members.clone();
        to_members.insert(reg_no.to_string());

        self.repo
            .update_memberships(vec![
                (from_id, from_members.clone()),
                (to_id, to_members.clone()),
            ])
            .await?;

        info!(
            reg_no,
            from_id,
            to_id,
            from_total = from_members.len(),
            to_total = to_members.len(),
            "student moved"
        );

        Ok(MoveOutcome {
            from: Schedule {
                members: from_members,
                ..from
            },
            to: Schedule {
                members: to_members,
                ..to
            },
        })
    }

    /// Adds a student who is in no batch of this slot to `schedule_id`.
    ///
    /// # Errors
    /// `NotFound`, `Capacity` or `Collision`, checked in that order.
    pub async fn assign_student(
        &self,
        student: &Student,
        schedule_id: ScheduleId,
    ) -> EngineResult<Schedule> {
        let target = self.resolve(schedule_id).await?;
        let reg_no = student.reg_no.as_str();

        if !target.has_room() {
            warn!(reg_no, schedule_id, "assignment rejected: batch full");
            return Err(EngineError::Capacity {
                schedule_id,
                capacity: target.capacity,
            });
        }

        let conflicting = CollisionDetector::new(self.repo)
            .conflicting_schedules(reg_no, target.date, &target.time_slot, &[])
            .await?;
        if !conflicting.is_empty() {
            warn!(reg_no, schedule_id, ?conflicting, "assignment rejected: collision");
            return Err(EngineError::Collision {
                reg_no: reg_no.to_string(),
                schedule_id,
                conflicting,
            });
        }

        let mut members = target.members.clone();
        members.insert(student.reg_no.clone());
        self.repo
            .update_membership(schedule_id, members.clone())
            .await?;

        info!(reg_no, schedule_id, total = members.len(), "student assigned");
        Ok(Schedule { members, ..target })
    }

    /// Removes `reg_no` from `schedule_id`.
    pub async fn remove_student(
        &self,
        reg_no: &str,
        schedule_id: ScheduleId,
    ) -> EngineResult<Schedule> {
        let target = self.resolve(schedule_id).await?;
        if !target.contains(reg_no) {
            return Err(NotFound::Membership {
                reg_no: reg_no.to_string(),
                schedule_id,
            }
            .into());
        }

        let mut members: BTreeSet<RegNo> = target.members.clone();
        members.remove(reg_no);
        self.repo
            .update_membership(schedule_id, members.clone())
            .await?;

        info!(reg_no, schedule_id, total = members.len(), "student removed");
        Ok(Schedule { members, ..target })
    }

    /// Deletes a batch, closing the gap it leaves in its run's numbering.
    ///
    /// Returns the deleted schedule.
    pub async fn delete_schedule(&self, id: ScheduleId) -> EngineResult<Schedule> {
        let doomed = self.resolve(id).await?;

        let siblings = self
            .repo
            .list_schedules(&ScheduleFilter::on(doomed.date).with_exam(doomed.exam_id))
            .await?;

        let mut writes = vec![ScheduleWrite::Delete(id)];
        writes.extend(
            siblings
                .iter()
                .filter(|s| s.run_id == doomed.run_id && s.batch_number > doomed.batch_number)
                .map(|s| ScheduleWrite::SetBatchNumber {
                    id: s.id,
                    batch_number: s.batch_number - 1,
                }),
        );
        let renumbered = writes.len() - 1;
        self.repo.apply(writes).await?;

        info!(
            schedule_id = id,
            exam_id = doomed.exam_id,
            date = %doomed.date,
            renumbered,
            "schedule deleted"
        );
        Ok(doomed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewSchedule, TimeSlot};
    use crate::store::MemoryStore;
    use crate::validation::ValidationErrorKind;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    fn batch(
        exam_id: u64,
        day: u32,
        slot: (&str, &str),
        number: u32,
        capacity: usize,
        members: &[&str],
    ) -> NewSchedule {
        NewSchedule {
            exam_id,
            date: d(day),
            time_slot: TimeSlot::parse(format!("{}-{}", slot.0, slot.1), slot.0, slot.1).unwrap(),
            batch_number: number,
            group: "CSE-A-5".into(),
            run_id: Uuid::nil(),
            capacity,
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    async fn store_with(batches: Vec<NewSchedule>) -> MemoryStore {
        let store = MemoryStore::new();
        store.create_schedules(batches).await.unwrap();
        store
    }

    async fn snapshot(store: &MemoryStore) -> Vec<Schedule> {
        store.list_schedules(&ScheduleFilter::all()).await.unwrap()
    }

    #[tokio::test]
    async fn test_move_success() {
        let store = store_with(vec![
            batch(1, 12, ("09:30", "12:30"), 1, 3, &["X", "A"]),
            batch(1, 12, ("13:30", "16:30"), 2, 3, &["B"]),
            batch(1, 12, ("13:30", "16:30"), 3, 3, &["C"]),
        ])
        .await;

        let outcome = MutationCoordinator::new(&store)
            .move_student("X", 1, 2)
            .await
            .unwrap();
        assert!(!outcome.from.contains("X"));
        assert!(outcome.to.contains("X"));

        let after = snapshot(&store).await;
        assert_eq!(after[0].total_students(), 1);
        assert_eq!(after[1].total_students(), 2);
        assert_eq!(after[2].members.len(), 1);
    }

    #[tokio::test]
    async fn test_move_within_same_slot_is_allowed() {
        // Leaving batch 1 frees the slot, so batch 2 on the same slot is fine.
        let store = store_with(vec![
            batch(1, 12, ("09:30", "12:30"), 1, 3, &["X"]),
            batch(1, 12, ("09:30", "12:30"), 2, 3, &[]),
        ])
        .await;
        assert!(MutationCoordinator::new(&store)
            .move_student("X", 1, 2)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_move_collision_leaves_state_unchanged() {
        let store = store_with(vec![
            batch(1, 12, ("09:30", "12:30"), 1, 3, &["X"]),
            batch(1, 12, ("13:30", "16:30"), 2, 3, &[]),
            batch(2, 12, ("14:00", "15:00"), 1, 3, &["X"]),
        ])
        .await;
        let before = snapshot(&store).await;

        let err = MutationCoordinator::new(&store)
            .move_student("X", 1, 2)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Collision {
                reg_no: "X".into(),
                schedule_id: 2,
                conflicting: vec![3],
            }
        );
        assert_eq!(before, snapshot(&store).await);
    }

    #[tokio::test]
    async fn test_move_capacity() {
        let store = store_with(vec![
            batch(1, 12, ("09:30", "12:30"), 1, 2, &["X"]),
            batch(1, 12, ("13:30", "16:30"), 2, 2, &["A", "B"]),
        ])
        .await;
        let before = snapshot(&store).await;

        let err = MutationCoordinator::new(&store)
            .move_student("X", 1, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Capacity { schedule_id: 2, capacity: 2 }));
        assert_eq!(before, snapshot(&store).await);
    }

    #[tokio::test]
    async fn test_move_not_found() {
        let store = store_with(vec![
            batch(1, 12, ("09:30", "12:30"), 1, 3, &["X"]),
            batch(1, 12, ("13:30", "16:30"), 2, 3, &[]),
        ])
        .await;
        let coordinator = MutationCoordinator::new(&store);

        assert_eq!(
            coordinator.move_student("X", 1, 9).await.unwrap_err(),
            EngineError::NotFound(NotFound::Schedule(9))
        );
        assert!(matches!(
            coordinator.move_student("Y", 1, 2).await.unwrap_err(),
            EngineError::NotFound(NotFound::Membership { .. })
        ));
    }

    #[tokio::test]
    async fn test_cross_date_move() {
        let store = store_with(vec![
            batch(1, 12, ("09:30", "12:30"), 1, 3, &["X"]),
            batch(1, 13, ("09:30", "12:30"), 1, 3, &[]),
        ])
        .await;

        match MutationCoordinator::new(&store)
            .move_student("X", 1, 2)
            .await
            .unwrap_err()
        {
            EngineError::Validation(errors) => {
                assert_eq!(errors[0].kind, ValidationErrorKind::CrossDateMove)
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(MutationCoordinator::new(&store)
            .with_cross_date_moves(true)
            .move_student("X", 1, 2)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_assign_and_remove() {
        let store = store_with(vec![
            batch(1, 12, ("09:30", "12:30"), 1, 2, &["A"]),
            batch(2, 12, ("10:00", "11:00"), 1, 2, &["Y"]),
        ])
        .await;
        let coordinator = MutationCoordinator::new(&store);

        let x = Student::new("X", "X", "CSE-A", 5);
        let updated = coordinator.assign_student(&x, 1).await.unwrap();
        assert_eq!(updated.total_students(), 2);

        let z = Student::new("Z", "Z", "CSE-A", 5);
        assert!(matches!(
            coordinator.assign_student(&z, 1).await.unwrap_err(),
            EngineError::Capacity { .. }
        ));

        let y = Student::new("Y", "Y", "CSE-A", 5);
        coordinator.remove_student("A", 1).await.unwrap();
        assert!(matches!(
            coordinator.assign_student(&y, 1).await.unwrap_err(),
            EngineError::Collision { .. }
        ));
        assert!(matches!(
            coordinator.remove_student("A", 1).await.unwrap_err(),
            EngineError::NotFound(NotFound::Membership { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_renumbers_run() {
        let store = store_with(vec![
            batch(1, 12, ("09:30", "12:30"), 1, 3, &["A"]),
            batch(1, 12, ("13:30", "16:30"), 2, 3, &["B"]),
            batch(1, 12, ("09:30", "12:30"), 3, 3, &["C"]),
        ])
        .await;

        let deleted = MutationCoordinator::new(&store)
            .delete_schedule(2)
            .await
            .unwrap();
        assert_eq!(deleted.batch_number, 2);

        let numbers: Vec<u32> = snapshot(&store)
            .await
            .iter()
            .map(|s| s.batch_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);

        assert_eq!(
            MutationCoordinator::new(&store)
                .delete_schedule(2)
                .await
                .unwrap_err(),
            EngineError::NotFound(NotFound::Schedule(2))
        );
    }
}
