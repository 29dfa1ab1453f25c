use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, ScheduleId, TopicId};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where a scheduled class sits relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePhase {
    /// The class has not started yet.
    Upcoming,
    /// The class window is open.
    Live,
    /// The class end time has passed.
    Completed,
}

impl SchedulePhase {
    /// Classifies a session window against `now`.
    ///
    /// A passed end time wins over everything else. A started class without an
    /// end time stays live; a class without a start time is upcoming until its
    /// end passes.
    #[must_use]
    pub fn at(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if end.is_some_and(|end| end <= now) {
            return Self::Completed;
        }
        match start {
            Some(start) if start <= now => Self::Live,
            _ => Self::Upcoming,
        }
    }

    #[must_use]
    pub fn is_time_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

//
// ─── SCHEDULE ROW ──────────────────────────────────────────────────────────────
//

/// One scheduled class session as seen by a single student.
///
/// `is_time_completed`, `is_upcoming` and `is_live_now` are derived from the
/// session window; call [`ScheduleRow::refresh_flags`] with the current time to
/// recompute them. `is_marked_completed` is the stored attendance flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub topic_id: TopicId,
    pub schedule_id: ScheduleId,
    pub course_id: CourseId,
    pub title: Option<String>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub is_marked_completed: bool,
    pub is_time_completed: bool,
    pub is_upcoming: bool,
    pub is_live_now: bool,
}

impl ScheduleRow {
    #[must_use]
    pub fn new(
        topic_id: TopicId,
        schedule_id: ScheduleId,
        start_date_time: Option<DateTime<Utc>>,
        end_date_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            topic_id,
            schedule_id,
            start_date_time,
            end_date_time,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_course(mut self, course_id: CourseId) -> Self {
        self.course_id = course_id;
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_attendance(mut self, attended: bool) -> Self {
        self.is_marked_completed = attended;
        self
    }

    /// Phase of this row at `now`, without touching the stored flags.
    #[must_use]
    pub fn phase_at(&self, now: DateTime<Utc>) -> SchedulePhase {
        SchedulePhase::at(self.start_date_time, self.end_date_time, now)
    }

    /// Recompute the time-derived flags and return the phase they encode.
    pub fn refresh_flags(&mut self, now: DateTime<Utc>) -> SchedulePhase {
        let phase = self.phase_at(now);
        self.is_time_completed = phase.is_time_completed();
        self.is_live_now = phase == SchedulePhase::Live;
        self.is_upcoming = phase == SchedulePhase::Upcoming;
        phase
    }

    /// End time in epoch milliseconds, `0` when unknown.
    #[must_use]
    pub fn end_timestamp_millis(&self) -> i64 {
        self.end_date_time.map_or(0, |end| end.timestamp_millis())
    }
}
