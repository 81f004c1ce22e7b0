//! Cron scheduler for hook `schedule` handlers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, info};
use uuid::Uuid;

use exthost_core::{AppError, AppResult};

/// Callback fired on every tick of a scheduled job.
pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Handle to a running scheduled job.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Synchronization key the job was created with.
    fn key(&self) -> &str;

    /// Removes the job from the schedule and waits for an in-flight run to finish.
    async fn stop(&self) -> AppResult<()>;
}

/// Scheduler collaborator used by the hook registrar.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Returns whether `expression` is a valid cron expression.
    fn validate_cron(&self, expression: &str) -> bool {
        validate_cron(expression)
    }

    /// Schedules `callback` on `expression`.
    ///
    /// Runs sharing a `key` never overlap: a tick that finds the previous run
    /// still in progress is skipped.
    async fn schedule_synchronized_job(
        &self,
        key: &str,
        expression: &str,
        callback: JobCallback,
    ) -> AppResult<Box<dyn ScheduledJob>>;
}

/// Expands a 5-field expression with a leading seconds field.
///
/// Returns `None` for anything that is not 5 or 6 whitespace-separated fields.
pub fn normalize_cron(expression: &str) -> Option<String> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.len() {
        5 => Some(format!("0 {}", fields.join(" "))),
        6 => Some(fields.join(" ")),
        _ => None,
    }
}

/// Returns whether `expression` parses as a 5- or 6-field cron expression.
pub fn validate_cron(expression: &str) -> bool {
    normalize_cron(expression)
        .map(|normalized| cron::Schedule::from_str(&normalized).is_ok())
        .unwrap_or(false)
}

/// Cron scheduler backed by `tokio-cron-scheduler`.
pub struct CronScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
    /// Key → run lock shared by every job created with that key.
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronScheduler")
            .field("keys", &self.locks.len())
            .finish()
    }
}

impl CronScheduler {
    /// Creates a new cron scheduler.
    pub async fn new() -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::scheduler(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            locks: Arc::new(DashMap::new()),
        })
    }

    /// Starts ticking.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::scheduler(format!("Failed to start scheduler: {e}")))?;

        info!("Cron scheduler started");
        Ok(())
    }

    /// Shuts the scheduler down.
    pub async fn shutdown(&self) -> AppResult<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::scheduler(format!("Failed to shutdown scheduler: {e}")))?;

        info!("Cron scheduler shut down");
        Ok(())
    }
}

#[async_trait]
impl Scheduler for CronScheduler {
    async fn schedule_synchronized_job(
        &self,
        key: &str,
        expression: &str,
        callback: JobCallback,
    ) -> AppResult<Box<dyn ScheduledJob>> {
        let normalized = normalize_cron(expression)
            .ok_or_else(|| AppError::validation(format!("Invalid cron expression: {expression}")))?;

        let lock = Arc::clone(
            self.locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        let run_lock = Arc::clone(&lock);
        let job_key = key.to_string();
        let job = CronJob::new_async(normalized.as_str(), move |_uuid, _scheduler| {
            let run_lock = Arc::clone(&run_lock);
            let callback = Arc::clone(&callback);
            let job_key = job_key.clone();
            Box::pin(async move {
                let Ok(_guard) = run_lock.try_lock() else {
                    debug!(job = %job_key, "Previous run still in progress, skipping tick");
                    return;
                };
                callback().await;
            })
        })
        .map_err(|e| AppError::scheduler(format!("Failed to create job '{key}': {e}")))?;

        let id = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| AppError::scheduler(format!("Failed to add job '{key}': {e}")))?;

        debug!(job = %key, cron = %normalized, "Scheduled job added");

        Ok(Box::new(CronJobHandle {
            key: key.to_string(),
            id,
            scheduler: self.scheduler.clone(),
            lock,
            locks: Arc::clone(&self.locks),
        }))
    }
}

/// Handle returned by [`CronScheduler`].
struct CronJobHandle {
    key: String,
    id: Uuid,
    scheduler: JobScheduler,
    lock: Arc<Mutex<()>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

#[async_trait]
impl ScheduledJob for CronJobHandle {
    fn key(&self) -> &str {
        &self.key
    }

    async fn stop(&self) -> AppResult<()> {
        self.scheduler
            .remove(&self.id)
            .await
            .map_err(|e| AppError::scheduler(format!("Failed to remove job '{}': {e}", self.key)))?;

        let _in_flight = self.lock.lock().await;
        self.locks
            .remove_if(&self.key, |_, lock| Arc::ptr_eq(lock, &self.lock));

        debug!(job = %self.key, "Scheduled job stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cron() {
        assert!(validate_cron("*/5 * * * *"));
        assert!(validate_cron("0 0 3 * * *"));
        assert!(validate_cron("0 15 10 ? * MON-FRI"));
        assert!(!validate_cron("not a cron"));
        assert!(!validate_cron(""));
        assert!(!validate_cron("* * *"));
        assert!(!validate_cron("99 * * * *"));
    }

    #[test]
    fn test_normalize_adds_seconds() {
        assert_eq!(normalize_cron("*/5 * * * *").as_deref(), Some("0 */5 * * * *"));
        assert_eq!(normalize_cron("1 2 3 * * *").as_deref(), Some("1 2 3 * * *"));
        assert_eq!(normalize_cron("1 2 3 4 5 6 7"), None);
    }

    #[tokio::test]
    async fn test_schedule_and_stop() {
        let scheduler = CronScheduler::new().await.unwrap();
        let callback: JobCallback = Arc::new(|| -> BoxFuture<'static, ()> { Box::pin(async {}) });

        let job = scheduler
            .schedule_synchronized_job("audit:0", "0 0 * * *", callback)
            .await
            .unwrap();
        assert_eq!(job.key(), "audit:0");

        job.stop().await.unwrap();
        assert!(scheduler.locks.get("audit:0").is_none());
    }

    #[tokio::test]
    async fn test_schedule_rejects_wrong_field_count() {
        let scheduler = CronScheduler::new().await.unwrap();
        let callback: JobCallback = Arc::new(|| -> BoxFuture<'static, ()> { Box::pin(async {}) });

        let result = scheduler
            .schedule_synchronized_job("audit:0", "* *", callback)
            .await;
        assert!(result.is_err());
    }
}
