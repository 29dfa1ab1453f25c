use async_trait::async_trait;
use attendance_core::model::{CourseId, ScheduleId, ScheduleRow, StudentId, TopicId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a scheduled class, independent of any student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub schedule_id: ScheduleId,
    pub topic_id: TopicId,
    pub course_id: CourseId,
    pub title: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

impl ScheduleRecord {
    #[must_use]
    pub fn from_row(row: &ScheduleRow) -> Self {
        Self {
            schedule_id: row.schedule_id,
            topic_id: row.topic_id,
            course_id: row.course_id,
            title: row.title.clone(),
            start_at: row.start_date_time,
            end_at: row.end_date_time,
        }
    }

    /// Build the per-student row. Time-derived flags are left unset.
    #[must_use]
    pub fn into_row(self, attended: bool) -> ScheduleRow {
        let row = ScheduleRow::new(self.topic_id, self.schedule_id, self.start_at, self.end_at)
            .with_course(self.course_id)
            .with_attendance(attended);
        match self.title {
            Some(title) => row.with_title(title),
            None => row,
        }
    }
}

/// A student's recorded attendance for one scheduled class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub student_id: StudentId,
    pub schedule_id: ScheduleId,
    pub marked_at: DateTime<Utc>,
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Persist or update a scheduled class.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the schedule cannot be stored.
    async fn upsert_schedule(&self, schedule: &ScheduleRecord) -> Result<(), StorageError>;

    /// Fetch a scheduled class by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_schedule(&self, id: ScheduleId) -> Result<ScheduleRecord, StorageError>;

    /// All scheduled classes of a course, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_course_schedules(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ScheduleRecord>, StorageError>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Record attendance. Returns `false` when it was already recorded; the
    /// original `marked_at` is kept in that case.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the schedule does not exist.
    async fn mark_attended(&self, record: &AttendanceRecord) -> Result<bool, StorageError>;

    /// IDs of the classes of a course the student attended.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn attended_schedule_ids(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<HashSet<ScheduleId>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    schedules: Arc<Mutex<HashMap<ScheduleId, ScheduleRecord>>>,
    attendance: Arc<Mutex<HashMap<(StudentId, ScheduleId), DateTime<Utc>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ScheduleRepository for InMemoryRepository {
    async fn upsert_schedule(&self, schedule: &ScheduleRecord) -> Result<(), StorageError> {
        let mut guard = self.schedules.lock().map_err(poisoned)?;
        guard.insert(schedule.schedule_id, schedule.clone());
        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<ScheduleRecord, StorageError> {
        let guard = self.schedules.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_course_schedules(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ScheduleRecord>, StorageError> {
        let guard = self.schedules.lock().map_err(poisoned)?;
        let mut found: Vec<ScheduleRecord> = guard
            .values()
            .filter(|s| s.course_id == course_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.schedule_id);
        Ok(found)
    }
}

#[async_trait]
impl AttendanceRepository for InMemoryRepository {
    async fn mark_attended(&self, record: &AttendanceRecord) -> Result<bool, StorageError> {
        {
            let schedules = self.schedules.lock().map_err(poisoned)?;
            if !schedules.contains_key(&record.schedule_id) {
                return Err(StorageError::NotFound);
            }
        }
        let mut guard = self.attendance.lock().map_err(poisoned)?;
        let key = (record.student_id, record.schedule_id);
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(key, record.marked_at);
        Ok(true)
    }

    async fn attended_schedule_ids(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<HashSet<ScheduleId>, StorageError> {
        let in_course: HashSet<ScheduleId> = {
            let schedules = self.schedules.lock().map_err(poisoned)?;
            schedules
                .values()
                .filter(|s| s.course_id == course_id)
                .map(|s| s.schedule_id)
                .collect()
        };
        let guard = self.attendance.lock().map_err(poisoned)?;
        Ok(guard
            .keys()
            .filter(|(student, schedule)| *student == student_id && in_course.contains(schedule))
            .map(|(_, schedule)| *schedule)
            .collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub schedules: Arc<dyn ScheduleRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let schedules: Arc<dyn ScheduleRepository> = Arc::new(repo.clone());
        let attendance: Arc<dyn AttendanceRepository> = Arc::new(repo);
        Self {
            schedules,
            attendance,
        }
    }
}
