use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;

use crate::model::ScheduleRow;

/// A streak of this many consecutive misses puts a student behind schedule.
pub const BEHIND_SCHEDULE_STREAK: usize = 3;

/// A streak of exactly this many consecutive misses is a minor delay.
pub const MINOR_DELAY_STREAK: usize = 2;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Qualitative attendance status for a course schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    /// No completed class has been attended yet.
    NotStarted,
    /// At most one miss in a row.
    OnTrack,
    /// Two misses in a row somewhere in the history.
    MinorDelay,
    /// Three or more misses in a row somewhere in the history.
    BehindSchedule,
}

impl ProgressStatus {
    /// Classify the longest run of consecutive misses.
    #[must_use]
    pub fn from_streak(max_continuous_missed: usize) -> Self {
        if max_continuous_missed >= BEHIND_SCHEDULE_STREAK {
            Self::BehindSchedule
        } else if max_continuous_missed == MINOR_DELAY_STREAK {
            Self::MinorDelay
        } else {
            Self::OnTrack
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::OnTrack => "on-track",
            Self::MinorDelay => "minor-delay",
            Self::BehindSchedule => "behind-schedule",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Derived attendance progress for one student in one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceProgress {
    /// Attended share of all classes, in `0..=100`.
    pub percentage: u8,
    pub status: ProgressStatus,
    /// Longest run of consecutive missed completed classes.
    pub continuous_missed_count: usize,
    pub attended_count: usize,
    pub total_classes: usize,
}

impl AttendanceProgress {
    /// Progress for a course with no classes at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            percentage: 0,
            status: ProgressStatus::NotStarted,
            continuous_missed_count: 0,
            attended_count: 0,
            total_classes: 0,
        }
    }

    /// Compute progress from the completed and upcoming partitions.
    ///
    /// Never panics. Rows without an end time sort as the oldest entries.
    #[must_use]
    pub fn calculate(completed: &[ScheduleRow], upcoming: &[ScheduleRow]) -> Self {
        let attended_count = completed.iter().filter(|r| r.is_marked_completed).count();
        let total_classes = completed.len().saturating_add(upcoming.len());
        let percentage = percentage_of(attended_count, total_classes);

        let streak = longest_missed_streak(completed);
        let status = if attended_count == 0 {
            ProgressStatus::NotStarted
        } else {
            ProgressStatus::from_streak(streak)
        };
        Self {
            percentage,
            status,
            continuous_missed_count: streak,
            attended_count,
            total_classes,
        }
    }
}

impl Default for AttendanceProgress {
    fn default() -> Self {
        Self::empty()
    }
}

/// `round(part / whole * 100)` clamped to `0..=100`; `0` for an empty whole.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn percentage_of(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let ratio = part as f64 / whole as f64 * 100.0;
    ratio.round().clamp(0.0, 100.0) as u8
}

/// Longest run of missed classes, scanning from the most recent end time.
#[must_use]
pub fn longest_missed_streak(completed: &[ScheduleRow]) -> usize {
    let mut ordered: Vec<&ScheduleRow> = completed.iter().collect();
    // Stable sort keeps input order among equal end times.
    ordered.sort_by_key(|row| Reverse(row.end_timestamp_millis()));

    let mut current = 0_usize;
    let mut longest = 0_usize;
    for row in ordered {
        if row.is_marked_completed {
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScheduleId, TopicId};
    use crate::time::fixed_now;
    use chrono::Duration;

    /// Completed rows from a pattern listed oldest to newest.
    fn completed_pattern(attended: &[bool]) -> Vec<ScheduleRow> {
        let now = fixed_now();
        let len = attended.len();
        attended
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                let days_ago = i64::try_from(len - i).unwrap();
                let end = now - Duration::days(days_ago);
                ScheduleRow::new(
                    TopicId::new(1),
                    ScheduleId::new(i as u64 + 1),
                    Some(end - Duration::hours(1)),
                    Some(end),
                )
                .with_attendance(*hit)
            })
            .collect()
    }

    fn upcoming(count: u64) -> Vec<ScheduleRow> {
        let now = fixed_now();
        (0..count)
            .map(|i| {
                ScheduleRow::new(
                    TopicId::new(2),
                    ScheduleId::new(100 + i),
                    Some(now + Duration::days(1)),
                    Some(now + Duration::days(1) + Duration::hours(1)),
                )
            })
            .collect()
    }

    #[test]
    fn empty_inputs_are_not_started() {
        let progress = AttendanceProgress::calculate(&[], &[]);
        assert_eq!(progress.percentage, 0);
        assert_eq!(progress.status, ProgressStatus::NotStarted);
        assert_eq!(progress, AttendanceProgress::empty());
    }

    #[test]
    fn no_attendance_is_not_started_regardless_of_streaks() {
        let completed = completed_pattern(&[false, false, false, false, false]);
        let progress = AttendanceProgress::calculate(&completed, &upcoming(3));
        assert_eq!(progress.status, ProgressStatus::NotStarted);
        assert_eq!(progress.continuous_missed_count, 5);
        assert_eq!(progress.percentage, 0);
        assert_eq!(progress.total_classes, 8);
    }

    #[test]
    fn three_misses_in_a_row_is_behind_schedule() {
        let completed = completed_pattern(&[false, false, false, true]);
        let progress = AttendanceProgress::calculate(&completed, &[]);
        assert_eq!(progress.status, ProgressStatus::BehindSchedule);
        assert_eq!(progress.continuous_missed_count, 3);
        assert_eq!(progress.percentage, 25);
    }

    #[test]
    fn two_misses_in_a_row_is_minor_delay() {
        let completed = completed_pattern(&[true, false, false, true]);
        let progress = AttendanceProgress::calculate(&completed, &[]);
        assert_eq!(progress.status, ProgressStatus::MinorDelay);
        assert_eq!(progress.continuous_missed_count, 2);
    }

    #[test]
    fn isolated_misses_are_on_track() {
        let completed = completed_pattern(&[false, true, false, true]);
        let progress = AttendanceProgress::calculate(&completed, &[]);
        assert_eq!(progress.status, ProgressStatus::OnTrack);
        assert_eq!(progress.continuous_missed_count, 1);
    }

    #[test]
    fn percentage_counts_upcoming_classes() {
        let completed = completed_pattern(&[true, false, true, true]);
        let progress = AttendanceProgress::calculate(&completed, &upcoming(2));
        assert_eq!(progress.attended_count, 3);
        assert_eq!(progress.total_classes, 6);
        assert_eq!(progress.percentage, 50);
    }

    #[test]
    fn streak_uses_end_time_order_not_input_order() {
        // Newest first in the input, then shuffled: misses stay adjacent by time.
        let mut completed = completed_pattern(&[true, false, false, false, true]);
        completed.swap(0, 3);
        completed.swap(1, 4);
        let progress = AttendanceProgress::calculate(&completed, &[]);
        assert_eq!(progress.status, ProgressStatus::BehindSchedule);
    }

    #[test]
    fn missing_end_time_does_not_panic_and_sinks_to_oldest() {
        let mut completed = completed_pattern(&[false, true, false]);
        let mut undated = completed_pattern(&[false]).remove(0);
        undated.end_date_time = None;
        completed.push(undated);

        // Undated miss sorts after the oldest miss, forming a streak of two.
        let progress = AttendanceProgress::calculate(&completed, &[]);
        assert_eq!(progress.status, ProgressStatus::MinorDelay);
        assert_eq!(progress.attended_count, 1);
    }

    #[test]
    fn undated_attended_row_is_counted() {
        let mut row = completed_pattern(&[true]).remove(0);
        row.end_date_time = None;
        let progress = AttendanceProgress::calculate(&[row], &[]);
        assert_eq!(progress.status, ProgressStatus::OnTrack);
        assert_eq!(progress.percentage, 100);
    }

    #[test]
    fn upcoming_attendance_flags_are_ignored() {
        let completed = completed_pattern(&[true]);
        let upcoming: Vec<_> = upcoming(1).into_iter().map(|r| r.with_attendance(true)).collect();
        let progress = AttendanceProgress::calculate(&completed, &upcoming);
        assert_eq!(progress.attended_count, 1);
        assert_eq!(progress.percentage, 50);
    }

    #[test]
    fn percentage_stays_in_bounds() {
        for whole in 0..40 {
            for part in 0..=whole + 5 {
                assert!(percentage_of(part, whole) <= 100);
            }
        }
        assert_eq!(percentage_of(1, 3), 33);
        assert_eq!(percentage_of(2, 3), 67);
        assert_eq!(percentage_of(9, 4), 100);
    }

    #[test]
    fn status_serializes_as_kebab_case() {
        let json = serde_json::to_string(&ProgressStatus::BehindSchedule).unwrap();
        assert_eq!(json, "\"behind-schedule\"");
        assert_eq!(ProgressStatus::NotStarted.to_string(), "not-started");
    }
}
