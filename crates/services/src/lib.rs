#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress_memo;
pub mod progress_service;
pub mod schedule_service;

pub use attendance_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ScheduleError};
pub use progress_memo::{MemoStats, ProgressMemo};
pub use progress_service::ProgressService;
pub use schedule_service::{MarkSeen, ScheduleService};
