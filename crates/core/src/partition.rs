use chrono::{DateTime, Utc};
use std::cmp::Reverse;

use crate::model::{SchedulePhase, ScheduleRow, SchedulesResponse};
use crate::progress::AttendanceProgress;

/// Schedule rows split into the two partitions the progress bar works from.
///
/// Live classes stay in the upcoming partition until their end time passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulePartitions {
    pub upcoming: Vec<ScheduleRow>,
    pub completed: Vec<ScheduleRow>,
}

impl SchedulePartitions {
    /// Split rows by their window at `now`, refreshing the derived flags.
    ///
    /// Upcoming rows are ordered by start time (undated last), completed rows
    /// by end time with the most recent first (undated last).
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = ScheduleRow>, now: DateTime<Utc>) -> Self {
        let mut upcoming = Vec::new();
        let mut completed = Vec::new();

        for mut row in rows {
            match row.refresh_flags(now) {
                SchedulePhase::Completed => completed.push(row),
                SchedulePhase::Upcoming | SchedulePhase::Live => {
                    // Attendance is not meaningful before the window closes.
                    upcoming.push(row);
                }
            }
        }

        upcoming.sort_by_key(|row| (row.start_date_time.is_none(), row.start_date_time));
        completed.sort_by_key(|row| Reverse(row.end_timestamp_millis()));

        Self {
            upcoming,
            completed,
        }
    }

    /// Rows currently in session.
    pub fn live_now(&self) -> impl Iterator<Item = &ScheduleRow> {
        self.upcoming.iter().filter(|row| row.is_live_now)
    }

    #[must_use]
    pub fn progress(&self) -> AttendanceProgress {
        AttendanceProgress::calculate(&self.completed, &self.upcoming)
    }

    #[must_use]
    pub fn into_response(self) -> SchedulesResponse {
        SchedulesResponse::new(self.upcoming, self.completed)
    }
}

impl From<SchedulesResponse> for SchedulePartitions {
    /// Take the partitions exactly as the response shaped them.
    fn from(resp: SchedulesResponse) -> Self {
        Self {
            upcoming: resp.upcoming_schedules,
            completed: resp.completed_schedules,
        }
    }
}
