use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use attendance_core::AttendanceProgress;
use attendance_core::model::{CourseId, ScheduleRow, StudentId};

/// Hit/miss counters of a [`ProgressMemo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
}

type Slot = (u64, AttendanceProgress);

/// Slot limit of [`ProgressMemo::new`].
pub const DEFAULT_MEMO_SLOTS: usize = 4096;

/// Remembers the last progress computed per course and student.
///
/// A slot is reused only while the content of both partitions is unchanged.
/// At most `capacity` (course, student) slots are held; inserting past the
/// limit drops every slot and starts over. A poisoned lock falls back to
/// computing without caching.
#[derive(Debug)]
pub struct ProgressMemo {
    slots: Mutex<HashMap<(CourseId, StudentId), Slot>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ProgressMemo {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMO_SLOTS)
    }
}

impl ProgressMemo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Memo holding at most `capacity` slots (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get_or_compute(
        &self,
        course_id: CourseId,
        student_id: StudentId,
        completed: &[ScheduleRow],
        upcoming: &[ScheduleRow],
    ) -> AttendanceProgress {
        let key = content_key(completed, upcoming);
        let scope = (course_id, student_id);

        if let Ok(slots) = self.slots.lock() {
            if let Some((cached_key, progress)) = slots.get(&scope) {
                if *cached_key == key {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(course = %course_id, student = %student_id, "progress memo hit");
                    return *progress;
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let progress = AttendanceProgress::calculate(completed, upcoming);
        debug!(
            course = %course_id,
            student = %student_id,
            percentage = progress.percentage,
            status = %progress.status,
            "progress recomputed"
        );

        if let Ok(mut slots) = self.slots.lock() {
            if slots.len() >= self.capacity && !slots.contains_key(&scope) {
                debug!(slots = slots.len(), "progress memo full; clearing");
                slots.clear();
            }
            slots.insert(scope, (key, progress));
        }
        progress
    }

    #[cfg(test)]
    fn clear(&self) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.clear();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().map_or(0, |slots| slots.len())
    }

    #[must_use]
    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Content hash of both partitions; slice hashing includes lengths.
fn content_key(completed: &[ScheduleRow], upcoming: &[ScheduleRow]) -> u64 {
    let mut hasher = DefaultHasher::new();
    completed.hash(&mut hasher);
    upcoming.hash(&mut hasher);
    hasher.finish()
}
