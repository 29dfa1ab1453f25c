mod ids;
mod schedule;
pub mod wire;

pub use ids::{CourseId, ParseIdError, ScheduleId, StudentId, TopicId};
pub use schedule::{SchedulePhase, ScheduleRow};
pub use wire::SchedulesResponse;
