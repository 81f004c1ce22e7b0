//! Hook registrar: the capability object handed to hook register functions.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, error, warn};

use exthost_core::{AppError, AppResult};

use crate::embeds::{EmbedContent, EmbedPosition, HookEmbeds};
use crate::emitter::handlers::{ActionHandler, FilterHandler, InitHandler, ScheduleHandler};
use crate::emitter::EventBus;
use crate::ledger::{Ledger, LedgerEntry};
use crate::module::{HookCapabilities, HookRegister};
use crate::scheduler::{JobCallback, Scheduler};

use super::Collaborators;

/// Capability object for one hook registration.
///
/// Every subscription and job it creates is recorded in the ledger.
pub struct HookRegistrar<'a> {
    extension: &'a str,
    bus: &'a dyn EventBus,
    scheduler: &'a dyn Scheduler,
    embeds: &'a HookEmbeds,
    schedule_enabled: &'a Arc<AtomicBool>,
    ledger: &'a mut Ledger,
    schedule_index: usize,
}

impl<'a> HookRegistrar<'a> {
    /// Creates the capability object for the named hook.
    pub fn new(extension: &'a str, collaborators: &'a Collaborators, ledger: &'a mut Ledger) -> Self {
        Self {
            extension,
            bus: collaborators.bus.as_ref(),
            scheduler: collaborators.scheduler.as_ref(),
            embeds: collaborators.embeds.as_ref(),
            schedule_enabled: &collaborators.schedule_enabled,
            ledger,
            schedule_index: 0,
        }
    }

    /// Number of jobs this registrar created.
    pub fn scheduled_jobs(&self) -> usize {
        self.schedule_index
    }

    fn job_callback(&self, key: &str, handler: Arc<dyn ScheduleHandler>) -> JobCallback {
        let enabled = Arc::clone(self.schedule_enabled);
        let key = key.to_string();
        Arc::new(move || -> BoxFuture<'static, ()> {
            let enabled = Arc::clone(&enabled);
            let handler = Arc::clone(&handler);
            let key = key.clone();
            Box::pin(async move {
                if !enabled.load(Ordering::Relaxed) {
                    return;
                }
                match AssertUnwindSafe(handler.run()).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(job = %key, error = %e, "Scheduled hook failed"),
                    Err(_) => error!(job = %key, "Scheduled hook panicked"),
                }
            })
        })
    }
}

#[async_trait]
impl HookCapabilities for HookRegistrar<'_> {
    async fn filter(&mut self, event: &str, handler: Arc<dyn FilterHandler>) {
        self.bus.on_filter(event, Arc::clone(&handler)).await;
        self.ledger.record(LedgerEntry::Filter {
            event: event.to_string(),
            handler,
        });
    }

    async fn action(&mut self, event: &str, handler: Arc<dyn ActionHandler>) {
        self.bus.on_action(event, Arc::clone(&handler)).await;
        self.ledger.record(LedgerEntry::Action {
            event: event.to_string(),
            handler,
        });
    }

    async fn init(&mut self, event: &str, handler: Arc<dyn InitHandler>) {
        self.bus.on_init(event, Arc::clone(&handler)).await;
        self.ledger.record(LedgerEntry::Init {
            event: event.to_string(),
            handler,
        });
    }

    async fn schedule(&mut self, cron: &str, handler: Arc<dyn ScheduleHandler>) {
        if !self.scheduler.validate_cron(cron) {
            warn!(extension = %self.extension, cron = %cron, "Couldn't register cron hook, provided cron is invalid");
            return;
        }

        let key = format!("{}:{}", self.extension, self.schedule_index);
        let callback = self.job_callback(&key, handler);

        match self.scheduler.schedule_synchronized_job(&key, cron, callback).await {
            Ok(job) => {
                self.schedule_index += 1;
                self.ledger.record(LedgerEntry::Schedule { job });
                debug!(extension = %self.extension, job = %key, cron = %cron, "Cron hook scheduled");
            }
            Err(e) => {
                warn!(extension = %self.extension, cron = %cron, error = %e, "Couldn't register cron hook");
            }
        }
    }

    async fn embed(&mut self, position: EmbedPosition, content: EmbedContent) {
        let markup = content.resolve();
        if markup.trim().is_empty() {
            warn!(extension = %self.extension, position = %position, "Couldn't add embed, content is empty");
            return;
        }
        self.embeds.push(position, markup).await;
    }
}

/// Runs a hook's register function exactly once against a fresh capability object.
///
/// Side effects made before a failing register function returns stay recorded
/// and are reversed at the next teardown. A panic counts as a failure.
pub async fn register_hook(
    collaborators: &Collaborators,
    ledger: &mut Ledger,
    register: &dyn HookRegister,
    name: &str,
) -> AppResult<()> {
    let ctx = collaborators.resources.context_for(name);
    let before = ledger.len();

    let mut registrar = HookRegistrar::new(name, collaborators, ledger);
    AssertUnwindSafe(register.register(&mut registrar, &ctx))
        .catch_unwind()
        .await
        .map_err(|_| AppError::extension(format!("Hook '{name}' panicked while registering")))??;
    let jobs = registrar.scheduled_jobs();

    debug!(
        extension = %name,
        recorded = ledger.len() - before,
        jobs,
        "Hook registered"
    );
    Ok(())
}
