use std::collections::HashSet;

use attendance_core::model::{CourseId, ScheduleId, StudentId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, schedule_id_from_i64, ser, student_id_to_i64};
use crate::repository::{AttendanceRecord, AttendanceRepository, StorageError};

#[async_trait::async_trait]
impl AttendanceRepository for SqliteRepository {
    async fn mark_attended(&self, record: &AttendanceRecord) -> Result<bool, StorageError> {
        let schedule_id = id_to_i64("schedule_id", record.schedule_id.value())?;

        let exists = sqlx::query("SELECT 1 FROM schedules WHERE id = ?1")
            .bind(schedule_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
            INSERT INTO attendance (student_id, schedule_id, marked_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(student_id, schedule_id) DO NOTHING
            ",
        )
        .bind(student_id_to_i64(record.student_id)?)
        .bind(schedule_id)
        .bind(record.marked_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }

    async fn attended_schedule_ids(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<HashSet<ScheduleId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT a.schedule_id
            FROM attendance a
            JOIN schedules s ON s.id = a.schedule_id
            WHERE a.student_id = ?1 AND s.course_id = ?2
            ",
        )
        .bind(student_id_to_i64(student_id)?)
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = HashSet::with_capacity(rows.len());
        for row in rows {
            out.insert(schedule_id_from_i64(
                row.try_get::<i64, _>("schedule_id").map_err(ser)?,
            )?);
        }
        Ok(out)
    }
}
