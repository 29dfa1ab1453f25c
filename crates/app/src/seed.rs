use chrono::{DateTime, Duration, Utc};

use attendance_core::model::{CourseId, ScheduleId, ScheduleRow, StudentId, TopicId};
use services::{ScheduleError, ScheduleService};

pub const DEMO_COURSE: CourseId = CourseId::new(1);
pub const DEMO_STUDENT: StudentId = StudentId::new(1);

/// Weekly classes around `now`: (id, days from now, attended by the demo student).
const DEMO_CLASSES: [(u64, i64, bool); 8] = [
    (1, -35, true),
    (2, -28, true),
    (3, -21, false),
    (4, -14, false),
    (5, -7, true),
    (6, 0, false),
    (7, 7, false),
    (8, 14, false),
];

fn demo_class(id: u64, days: i64, now: DateTime<Utc>) -> ScheduleRow {
    // Class 6 is running right now.
    let start = now + Duration::days(days) - Duration::minutes(30);
    ScheduleRow::new(
        TopicId::new(id),
        ScheduleId::new(id),
        Some(start),
        Some(start + Duration::hours(1)),
    )
    .with_course(DEMO_COURSE)
    .with_title(format!("Lesson {id}"))
}

/// Insert the demo course and the demo student's attendance.
///
/// Returns the number of classes written.
pub async fn seed_demo_course(schedules: &ScheduleService) -> Result<usize, ScheduleError> {
    let now = schedules.now();
    for (id, days, attended) in DEMO_CLASSES {
        schedules.upsert_schedule(&demo_class(id, days, now)).await?;
        if attended {
            schedules
                .mark_seen(DEMO_STUDENT, ScheduleId::new(id))
                .await?;
        }
    }
    Ok(DEMO_CLASSES.len())
}
