use attendance_core::model::{CourseId, ScheduleId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_schedule_row};
use crate::repository::{ScheduleRecord, ScheduleRepository, StorageError};

#[async_trait::async_trait]
impl ScheduleRepository for SqliteRepository {
    async fn upsert_schedule(&self, schedule: &ScheduleRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO schedules (id, topic_id, course_id, title, start_at, end_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                topic_id = excluded.topic_id,
                course_id = excluded.course_id,
                title = excluded.title,
                start_at = excluded.start_at,
                end_at = excluded.end_at
            ",
        )
        .bind(id_to_i64("schedule_id", schedule.schedule_id.value())?)
        .bind(id_to_i64("topic_id", schedule.topic_id.value())?)
        .bind(id_to_i64("course_id", schedule.course_id.value())?)
        .bind(schedule.title.as_deref())
        .bind(schedule.start_at)
        .bind(schedule.end_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<ScheduleRecord, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, topic_id, course_id, title, start_at, end_at
            FROM schedules
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("schedule_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_schedule_row(&row)
    }

    async fn list_course_schedules(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ScheduleRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, topic_id, course_id, title, start_at, end_at
            FROM schedules
            WHERE course_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_schedule_row).collect()
    }
}
