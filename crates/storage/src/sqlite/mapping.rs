use attendance_core::model::{CourseId, ScheduleId, StudentId, TopicId};
use sqlx::Row;

use crate::repository::{ScheduleRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn schedule_id_from_i64(v: i64) -> Result<ScheduleId, StorageError> {
    Ok(ScheduleId::new(i64_to_u64("schedule_id", v)?))
}

pub(crate) fn map_schedule_row(row: &sqlx::sqlite::SqliteRow) -> Result<ScheduleRecord, StorageError> {
    Ok(ScheduleRecord {
        schedule_id: schedule_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        topic_id: TopicId::new(i64_to_u64(
            "topic_id",
            row.try_get::<i64, _>("topic_id").map_err(ser)?,
        )?),
        course_id: CourseId::new(i64_to_u64(
            "course_id",
            row.try_get::<i64, _>("course_id").map_err(ser)?,
        )?),
        title: row.try_get("title").map_err(ser)?,
        start_at: row.try_get("start_at").map_err(ser)?,
        end_at: row.try_get("end_at").map_err(ser)?,
    })
}

pub(crate) fn student_id_to_i64(id: StudentId) -> Result<i64, StorageError> {
    id_to_i64("student_id", id.value())
}
