//! Engine entry point.
//!
//! [`ExamScheduler`] exposes the transport-independent API: generate,
//! regenerate, list, get, move, assign, remove, delete and audit. Every
//! mutation runs inside the serialization domain(s) of the batches it
//! touches, and every write goes through one atomic repository call.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::collision::{find_double_bookings, CollisionDetector, DoubleBooking};
use crate::config::EngineConfig;
use crate::coordinator::{MoveOutcome, MutationCoordinator};
use crate::error::{EngineResult, NotFound};
use crate::locks::LockTable;
use crate::models::{
    Cohort, Exam, ExamId, ExamSummary, RegNo, RunId, Schedule, ScheduleDto, ScheduleId, Student,
    StudentPlacementError, TimeSlotInput,
};
use crate::scheduler::{BatchKpi, BatchPartitioner, BatchPolicy};
use crate::store::{EntityStore, ScheduleFilter, ScheduleRepository, ScheduleWrite};
use crate::validation::{parse_time_slots, validate_generation};

/// Who must be scheduled in a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "members", rename_all = "snake_case")]
pub enum StudentPopulation {
    /// Every student in the entity store.
    All,
    /// Students of the listed cohorts.
    Cohorts(Vec<Cohort>),
    /// Exactly the listed registration numbers.
    Students(Vec<RegNo>),
}

/// `GenerateSchedule` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub exam_id: ExamId,
    pub date: NaiveDate,
    pub time_slots: Vec<TimeSlotInput>,
    pub max_students_per_batch: usize,
    pub population: StudentPopulation,
}

/// `GenerateSchedule` result.
///
/// A non-empty `errors` list is a partial success, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub exam_id: ExamId,
    pub date: NaiveDate,
    pub run_id: RunId,
    pub schedules: Vec<ScheduleDto>,
    pub errors: Vec<StudentPlacementError>,
    pub kpi: BatchKpi,
}

/// `MoveStudent` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub student_reg_no: RegNo,
    pub from_schedule_id: ScheduleId,
    pub to_schedule_id: ScheduleId,
}

/// Exam batch scheduling service.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::NaiveDate;
/// use u_exam_schedule::engine::{ExamScheduler, GenerateRequest, StudentPopulation};
/// use u_exam_schedule::models::{Exam, Student, TimeSlotInput};
/// use u_exam_schedule::store::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let day = NaiveDate::from_ymd_opt(2025, 11, 12).unwrap();
/// let store = Arc::new(
///     MemoryStore::new()
///         .with_exam(Exam::new(1, "CS501", day, day))
///         .with_student(Student::new("21CS001", "Asha", "CSE-A", 5)),
/// );
/// let scheduler = ExamScheduler::with_store(store);
///
/// let response = scheduler
///     .generate_schedule(&GenerateRequest {
///         exam_id: 1,
///         date: day,
///         time_slots: vec![TimeSlotInput::new("Slot 1", "09:30", "12:30")],
///         max_students_per_batch: 3,
///         population: StudentPopulation::All,
///     })
///     .await
///     .unwrap();
/// assert_eq!(response.schedules.len(), 1);
/// # });
/// ```
pub struct ExamScheduler {
    entities: Arc<dyn EntityStore>,
    schedules: Arc<dyn ScheduleRepository>,
    partitioner: BatchPartitioner,
    locks: LockTable,
    config: EngineConfig,
}

impl ExamScheduler {
    /// Creates a scheduler over separate entity and schedule stores.
    pub fn new(
        entities: Arc<dyn EntityStore>,
        schedules: Arc<dyn ScheduleRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            entities,
            schedules,
            partitioner: BatchPartitioner::new()
                .with_max_batch_size_limit(config.max_batch_size_limit),
            locks: LockTable::new(config.lock_scope),
            config,
        }
    }

    /// Creates a scheduler with default config over one store serving both roles.
    pub fn with_store<S>(store: Arc<S>) -> Self
    where
        S: EntityStore + ScheduleRepository + 'static,
    {
        Self::new(store.clone(), store, EngineConfig::default())
    }

    /// Replaces the batching policy.
    pub fn with_policy<P: BatchPolicy + 'static>(mut self, policy: P) -> Self {
        self.partitioner = self.partitioner.with_policy(policy);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Partitions the requested population into new batches.
    ///
    /// Existing batches on the date (of any exam) count as bookings.
    pub async fn generate_schedule(&self, request: &GenerateRequest) -> EngineResult<GenerateResponse> {
        self.run_generation(request, false).await
    }

    /// Replaces every batch of `(exam_id, date)` with a fresh run.
    ///
    /// The old batches are ignored for collision purposes and deleted in
    /// the same atomic write that creates the new ones.
    pub async fn regenerate_schedule(
        &self,
        request: &GenerateRequest,
    ) -> EngineResult<GenerateResponse> {
        self.run_generation(request, true).await
    }

    async fn run_generation(
        &self,
        request: &GenerateRequest,
        replace: bool,
    ) -> EngineResult<GenerateResponse> {
        let slots = parse_time_slots(&request.time_slots)?;
        let exam = self.require_exam(request.exam_id).await?;
        validate_generation(
            &exam,
            request.date,
            &slots,
            request.max_students_per_batch,
            self.config.max_batch_size_limit,
        )?;

        let guard = self.locks.acquire([(exam.id, request.date)]).await;

        let (students, mut errors) = self.resolve_population(&request.population).await?;

        let replaced: Vec<ScheduleId> = if replace {
            self.schedules
                .list_schedules(&ScheduleFilter::on(request.date).with_exam(exam.id))
                .await?
                .iter()
                .map(|s| s.id)
                .collect()
        } else {
            Vec::new()
        };

        let occupancy = CollisionDetector::new(self.schedules.as_ref())
            .occupancy(request.date, &replaced)
            .await?;
        debug!(
            exam_id = exam.id,
            date = %request.date,
            population = students.len(),
            booked = occupancy.student_count(),
            policy = self.partitioner.policy_name(),
            lock_scope = ?self.locks.scope(),
            "planning generation run"
        );

        let plan = self.partitioner.partition(
            &exam,
            request.date,
            &slots,
            request.max_students_per_batch,
            &students,
            &occupancy,
        )?;

        let mut writes: Vec<ScheduleWrite> =
            replaced.iter().copied().map(ScheduleWrite::Delete).collect();
        writes.extend(plan.batches.into_iter().map(ScheduleWrite::Create));
        let created = self.schedules.apply(writes).await?;

        drop(guard);
        self.locks.prune_idle();

        errors.extend(plan.errors);
        info!(
            exam_id = exam.id,
            date = %request.date,
            run_id = %plan.run_id,
            batches = created.len(),
            replaced = replaced.len(),
            errors = errors.len(),
            "generation run committed"
        );

        let kpi = BatchKpi::calculate(&slots, &created);
        let by_reg: HashMap<&str, &Student> =
            students.iter().map(|s| (s.reg_no.as_str(), s)).collect();
        let summary = exam.summary();
        let schedules = created
            .iter()
            .map(|s| s.to_dto(&members_of(s, &by_reg), Some(summary.clone())))
            .collect();

        Ok(GenerateResponse {
            exam_id: exam.id,
            date: request.date,
            run_id: plan.run_id,
            schedules,
            errors,
            kpi,
        })
    }

    /// Lists batches, ordered by date, slot start and batch number.
    pub async fn list_schedules(&self, filter: &ScheduleFilter) -> EngineResult<Vec<ScheduleDto>> {
        let mut schedules = self.schedules.list_schedules(filter).await?;
        schedules.sort_by(|a, b| {
            (a.date, a.time_slot.start, a.batch_number, a.id).cmp(&(
                b.date,
                b.time_slot.start,
                b.batch_number,
                b.id,
            ))
        });
        self.to_dtos(&schedules).await
    }

    /// Fetches one batch.
    pub async fn get_schedule(&self, id: ScheduleId) -> EngineResult<ScheduleDto> {
        let schedule = self
            .schedules
            .get_schedule(id)
            .await?
            .ok_or(NotFound::Schedule(id))?;
        let mut dtos = self.to_dtos(std::slice::from_ref(&schedule)).await?;
        dtos.pop().ok_or_else(|| NotFound::Schedule(id).into())
    }

    /// Moves a student between two batches.
    pub async fn move_student(&self, request: &MoveRequest) -> EngineResult<MoveOutcome> {
        let from = self.require_schedule(request.from_schedule_id).await?;
        let to = self.require_schedule(request.to_schedule_id).await?;

        let guard = self
            .locks
            .acquire([(from.exam_id, from.date), (to.exam_id, to.date)])
            .await;
        let result = self
            .coordinator()
            .move_student(
                &request.student_reg_no,
                request.from_schedule_id,
                request.to_schedule_id,
            )
            .await;
        drop(guard);
        self.locks.prune_idle();
        result
    }

    /// Places a student into an existing batch.
    pub async fn assign_student(
        &self,
        reg_no: &str,
        schedule_id: ScheduleId,
    ) -> EngineResult<ScheduleDto> {
        let student = self
            .entities
            .get_student(reg_no)
            .await?
            .ok_or_else(|| NotFound::Student(reg_no.to_string()))?;
        let target = self.require_schedule(schedule_id).await?;

        let guard = self.locks.acquire([(target.exam_id, target.date)]).await;
        let result = self.coordinator().assign_student(&student, schedule_id).await;
        drop(guard);
        self.locks.prune_idle();

        let updated = result?;
        let mut dtos = self.to_dtos(std::slice::from_ref(&updated)).await?;
        dtos.pop().ok_or_else(|| NotFound::Schedule(schedule_id).into())
    }

    /// Removes a student from a batch.
    pub async fn remove_student(&self, reg_no: &str, schedule_id: ScheduleId) -> EngineResult<()> {
        let target = self.require_schedule(schedule_id).await?;

        let guard = self.locks.acquire([(target.exam_id, target.date)]).await;
        let result = self.coordinator().remove_student(reg_no, schedule_id).await;
        drop(guard);
        self.locks.prune_idle();
        result.map(|_| ())
    }

    /// Deletes a batch and closes the numbering gap in its run.
    pub async fn delete_schedule(&self, id: ScheduleId) -> EngineResult<()> {
        let target = self.require_schedule(id).await?;

        let guard = self.locks.acquire([(target.exam_id, target.date)]).await;
        let result = self.coordinator().delete_schedule(id).await;
        drop(guard);
        self.locks.prune_idle();
        result.map(|_| ())
    }

    /// Reports every double-booked student among the filtered batches.
    pub async fn audit(&self, filter: &ScheduleFilter) -> EngineResult<Vec<DoubleBooking>> {
        let schedules = self.schedules.list_schedules(filter).await?;
        Ok(find_double_bookings(&schedules))
    }

    fn coordinator(&self) -> MutationCoordinator<'_, dyn ScheduleRepository> {
        MutationCoordinator::new(self.schedules.as_ref())
            .with_cross_date_moves(self.config.allow_cross_date_moves)
    }

    async fn require_exam(&self, id: ExamId) -> EngineResult<Exam> {
        Ok(self
            .entities
            .get_exam(id)
            .await?
            .ok_or(NotFound::Exam(id))?)
    }

    async fn require_schedule(&self, id: ScheduleId) -> EngineResult<Schedule> {
        Ok(self
            .schedules
            .get_schedule(id)
            .await?
            .ok_or(NotFound::Schedule(id))?)
    }

    /// Resolves a population into student records plus reports for
    /// registration numbers the store does not know.
    async fn resolve_population(
        &self,
        population: &StudentPopulation,
    ) -> EngineResult<(Vec<Student>, Vec<StudentPlacementError>)> {
        match population {
            StudentPopulation::All => Ok((self.entities.list_students().await?, Vec::new())),
            StudentPopulation::Cohorts(cohorts) => {
                let students = self
                    .entities
                    .list_students()
                    .await?
                    .into_iter()
                    .filter(|s| cohorts.iter().any(|c| s.is_in(c)))
                    .collect();
                Ok((students, Vec::new()))
            }
            StudentPopulation::Students(reg_nos) => {
                let mut students = Vec::with_capacity(reg_nos.len());
                let mut unknown = Vec::new();
                for reg_no in reg_nos {
                    match self.entities.get_student(reg_no).await? {
                        Some(s) => students.push(s),
                        None => unknown.push(StudentPlacementError::unknown_student(reg_no)),
                    }
                }
                Ok((students, unknown))
            }
        }
    }

    async fn to_dtos(&self, schedules: &[Schedule]) -> EngineResult<Vec<ScheduleDto>> {
        if schedules.is_empty() {
            return Ok(Vec::new());
        }

        let students = self.entities.list_students().await?;
        let by_reg: HashMap<&str, &Student> =
            students.iter().map(|s| (s.reg_no.as_str(), s)).collect();

        let mut exams: HashMap<ExamId, Option<ExamSummary>> = HashMap::new();
        for s in schedules {
            if !exams.contains_key(&s.exam_id) {
                let summary = self.entities.get_exam(s.exam_id).await?.map(|e| e.summary());
                exams.insert(s.exam_id, summary);
            }
        }

        Ok(schedules
            .iter()
            .map(|s| {
                let exam = exams.get(&s.exam_id).cloned().flatten();
                s.to_dto(&members_of(s, &by_reg), exam)
            })
            .collect())
    }
}

fn members_of(schedule: &Schedule, by_reg: &HashMap<&str, &Student>) -> Vec<Student> {
    schedule
        .members
        .iter()
        .filter_map(|r| by_reg.get(r.as_str()).map(|s| (*s).clone()))
        .collect()
}
