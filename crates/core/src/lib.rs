#![forbid(unsafe_code)]

pub mod model;
pub mod partition;
pub mod progress;
pub mod time;

pub use partition::SchedulePartitions;
pub use progress::{AttendanceProgress, ProgressStatus};
pub use time::Clock;
