use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use attendance_core::SchedulePartitions;
use attendance_core::model::{
    CourseId, SchedulePhase, ScheduleId, ScheduleRow, SchedulesResponse, StudentId,
};
use storage::repository::{
    AttendanceRecord, AttendanceRepository, ScheduleRecord, ScheduleRepository,
};

use crate::Clock;
use crate::error::ScheduleError;

/// Result of a "mark seen" action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkSeen {
    pub schedule_id: ScheduleId,
    /// Phase of the class when it was marked.
    pub phase: SchedulePhase,
    /// `false` when attendance had already been recorded.
    pub newly_marked: bool,
}

/// Course schedule facade: per-student schedule views and attendance marking.
///
/// Owns the time source so every view is derived against the same "now".
#[derive(Clone)]
pub struct ScheduleService {
    clock: Clock,
    schedules: Arc<dyn ScheduleRepository>,
    attendance: Arc<dyn AttendanceRepository>,
}

impl ScheduleService {
    #[must_use]
    pub fn new(
        clock: Clock,
        schedules: Arc<dyn ScheduleRepository>,
        attendance: Arc<dyn AttendanceRepository>,
    ) -> Self {
        Self {
            clock,
            schedules,
            attendance,
        }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        let repo = storage::repository::InMemoryRepository::new();
        Self::new(clock, Arc::new(repo.clone()), Arc::new(repo))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Add or update a scheduled class.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::Storage` on repository failures.
    pub async fn upsert_schedule(&self, row: &ScheduleRow) -> Result<(), ScheduleError> {
        self.schedules
            .upsert_schedule(&ScheduleRecord::from_row(row))
            .await?;
        Ok(())
    }

    /// Load the course schedule for a student, split at the current time.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::Storage` on repository failures.
    pub async fn partitions(
        &self,
        course_id: CourseId,
        student_id: StudentId,
    ) -> Result<SchedulePartitions, ScheduleError> {
        let records = self.schedules.list_course_schedules(course_id).await?;
        let attended = self
            .attendance
            .attended_schedule_ids(student_id, course_id)
            .await?;

        let rows = records.into_iter().map(|record| {
            let seen = attended.contains(&record.schedule_id);
            record.into_row(seen)
        });
        let parts = SchedulePartitions::from_rows(rows, self.clock.now());

        debug!(
            course = %course_id,
            student = %student_id,
            upcoming = parts.upcoming.len(),
            completed = parts.completed.len(),
            live = parts.live_now().count(),
            "loaded course schedule"
        );
        Ok(parts)
    }

    /// Same as [`Self::partitions`], in the schedules endpoint response shape.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::Storage` on repository failures.
    pub async fn list_schedules(
        &self,
        course_id: CourseId,
        student_id: StudentId,
    ) -> Result<SchedulesResponse, ScheduleError> {
        Ok(self
            .partitions(course_id, student_id)
            .await?
            .into_response())
    }

    /// Record that a student joined a live class or watched its recording.
    ///
    /// Repeated calls are harmless.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::NotStarted` for a class that has not started,
    /// `ScheduleError::Storage` (`NotFound`) for an unknown schedule.
    pub async fn mark_seen(
        &self,
        student_id: StudentId,
        schedule_id: ScheduleId,
    ) -> Result<MarkSeen, ScheduleError> {
        let schedule = self.schedules.get_schedule(schedule_id).await?;
        let now = self.clock.now();
        let phase = SchedulePhase::at(schedule.start_at, schedule.end_at, now);
        if phase == SchedulePhase::Upcoming {
            return Err(ScheduleError::NotStarted { schedule_id });
        }

        let newly_marked = self
            .attendance
            .mark_attended(&AttendanceRecord {
                student_id,
                schedule_id,
                marked_at: now,
            })
            .await?;

        info!(
            student = %student_id,
            schedule = %schedule_id,
            ?phase,
            newly_marked,
            "marked schedule seen"
        );
        Ok(MarkSeen {
            schedule_id,
            phase,
            newly_marked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::model::TopicId;
    use attendance_core::time::fixed_now;
    use chrono::Duration;
    use storage::repository::StorageError;

    fn row(id: u64, start_h: i64, end_h: i64) -> ScheduleRow {
        let now = fixed_now();
        ScheduleRow::new(
            TopicId::new(1),
            ScheduleId::new(id),
            Some(now + Duration::hours(start_h)),
            Some(now + Duration::hours(end_h)),
        )
        .with_course(CourseId::new(1))
    }

    async fn seeded() -> ScheduleService {
        let svc = ScheduleService::in_memory(Clock::fixed(fixed_now()));
        svc.upsert_schedule(&row(1, -48, -47)).await.unwrap();
        svc.upsert_schedule(&row(2, -1, 1)).await.unwrap();
        svc.upsert_schedule(&row(3, 24, 25)).await.unwrap();
        svc
    }

    #[tokio::test]
    async fn list_schedules_splits_by_time_and_applies_attendance() {
        let svc = seeded().await;
        let student = StudentId::new(5);
        svc.mark_seen(student, ScheduleId::new(1)).await.unwrap();

        let resp = svc.list_schedules(CourseId::new(1), student).await.unwrap();

        assert_eq!(resp.completed_schedules.len(), 1);
        assert!(resp.completed_schedules[0].is_marked_completed);
        assert!(resp.completed_schedules[0].is_time_completed);
        assert_eq!(resp.upcoming_schedules.len(), 2);
        assert!(resp.upcoming_schedules[0].is_live_now);
        assert!(resp.upcoming_schedules[1].is_upcoming);
    }

    #[tokio::test]
    async fn mark_seen_is_idempotent() {
        let svc = seeded().await;
        let student = StudentId::new(5);

        let first = svc.mark_seen(student, ScheduleId::new(2)).await.unwrap();
        let second = svc.mark_seen(student, ScheduleId::new(2)).await.unwrap();

        assert_eq!(first.phase, SchedulePhase::Live);
        assert!(first.newly_marked);
        assert!(!second.newly_marked);
    }

    #[tokio::test]
    async fn mark_seen_rejects_classes_that_have_not_started() {
        let svc = seeded().await;
        let err = svc
            .mark_seen(StudentId::new(5), ScheduleId::new(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::NotStarted { schedule_id } if schedule_id == ScheduleId::new(3)));
    }

    #[tokio::test]
    async fn mark_seen_unknown_schedule_is_not_found() {
        let svc = seeded().await;
        let err = svc
            .mark_seen(StudentId::new(5), ScheduleId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Storage(StorageError::NotFound)));
    }
}
