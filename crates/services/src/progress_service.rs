use std::sync::Arc;

use tracing::{debug, warn};

use attendance_core::model::{CourseId, SchedulesResponse, StudentId};
use attendance_core::{AttendanceProgress, SchedulePartitions};

use crate::progress_memo::{MemoStats, ProgressMemo};
use crate::schedule_service::ScheduleService;

/// Course-schedule progress bar backend.
///
/// Never fails: when the schedule cannot be loaded it reports progress over
/// empty partitions, which reads as `0%` and `not-started`.
#[derive(Clone)]
pub struct ProgressService {
    schedules: Arc<ScheduleService>,
    memo: Arc<ProgressMemo>,
}

impl ProgressService {
    #[must_use]
    pub fn new(schedules: Arc<ScheduleService>) -> Self {
        Self {
            schedules,
            memo: Arc::new(ProgressMemo::new()),
        }
    }

    /// Progress of a student in a course, computed against the current time.
    pub async fn course_progress(
        &self,
        course_id: CourseId,
        student_id: StudentId,
    ) -> AttendanceProgress {
        let parts = match self.schedules.partitions(course_id, student_id).await {
            Ok(parts) => parts,
            Err(err) => {
                warn!(
                    course = %course_id,
                    student = %student_id,
                    error = %err,
                    "schedule load failed; reporting empty progress"
                );
                SchedulePartitions::default()
            }
        };
        self.memo
            .get_or_compute(course_id, student_id, &parts.completed, &parts.upcoming)
    }

    /// Progress over an already-fetched schedules response, trusting its
    /// partitioning as given.
    #[must_use]
    pub fn progress_from_response(resp: &SchedulesResponse) -> AttendanceProgress {
        AttendanceProgress::calculate(&resp.completed_schedules, &resp.upcoming_schedules)
    }

    /// Progress over a raw response body. A body that is not a JSON object
    /// degrades to empty partitions.
    #[must_use]
    pub fn progress_from_json(body: &str) -> AttendanceProgress {
        match SchedulesResponse::from_json_str(body) {
            Ok(resp) => {
                if resp.is_empty() {
                    debug!("schedules response carries no rows");
                }
                Self::progress_from_response(&resp)
            }
            Err(err) => {
                warn!(error = %err, "malformed schedules response; reporting empty progress");
                AttendanceProgress::empty()
            }
        }
    }

    #[must_use]
    pub fn memo_stats(&self) -> MemoStats {
        self.memo.stats()
    }
}
