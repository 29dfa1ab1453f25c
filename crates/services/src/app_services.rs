use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::schedule_service::ScheduleService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    schedules: Arc<ScheduleService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let schedules = Arc::new(ScheduleService::new(
            clock,
            Arc::clone(&storage.schedules),
            Arc::clone(&storage.attendance),
        ));
        let progress = Arc::new(ProgressService::new(Arc::clone(&schedules)));
        Self {
            schedules,
            progress,
        }
    }

    #[must_use]
    pub fn schedules(&self) -> Arc<ScheduleService> {
        Arc::clone(&self.schedules)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
