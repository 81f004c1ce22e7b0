//! Shared test helpers for registration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::Level;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::SubscriberExt;

use exthost_core::AppResult;
use exthost_core::traits::StaticExtensionSource;
use exthost_core::types::extension::{Entrypoint, Extension, ExtensionKind};
use exthost_extensions::api::services::Env;
use exthost_extensions::scheduler::{JobCallback, ScheduledJob};
use exthost_extensions::{
    Collaborators, Emitter, EndpointRouter, FlowManager, HookEmbeds, HostResources, RegistrationManager, Sandbox,
    Scheduler, StaticModuleLoader,
};

/// Scheduler double that keeps jobs in memory and fires them on demand.
#[derive(Default)]
pub struct RecordingScheduler {
    jobs: Arc<Mutex<Vec<(String, JobCallback)>>>,
}

impl RecordingScheduler {
    /// Keys of jobs not yet stopped, in creation order.
    pub fn active(&self) -> Vec<String> {
        self.jobs.lock().unwrap().iter().map(|(key, _)| key.clone()).collect()
    }

    /// Runs one tick of the job with `key`. Returns whether it exists.
    pub async fn fire(&self, key: &str) -> bool {
        let callback = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, callback)| Arc::clone(callback));
        match callback {
            Some(callback) => {
                callback().await;
                true
            }
            None => false,
        }
    }
}

struct RecordingJob {
    key: String,
    jobs: Arc<Mutex<Vec<(String, JobCallback)>>>,
}

#[async_trait]
impl ScheduledJob for RecordingJob {
    fn key(&self) -> &str {
        &self.key
    }

    async fn stop(&self) -> AppResult<()> {
        self.jobs.lock().unwrap().retain(|(key, _)| key != &self.key);
        Ok(())
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn schedule_synchronized_job(
        &self,
        key: &str,
        _expression: &str,
        callback: JobCallback,
    ) -> AppResult<Box<dyn ScheduledJob>> {
        self.jobs.lock().unwrap().push((key.to_string(), callback));
        Ok(Box::new(RecordingJob {
            key: key.to_string(),
            jobs: Arc::clone(&self.jobs),
        }))
    }
}

/// Sandbox double that accepts every extension and records its name.
#[derive(Default)]
pub struct RecordingSandbox {
    started: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingSandbox {
    pub fn started(&self) -> Vec<(String, PathBuf)> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sandbox for RecordingSandbox {
    async fn run_extension(&self, extension: &Extension, entrypoint: &Path) -> AppResult<()> {
        self.started
            .lock()
            .unwrap()
            .push((extension.name.clone(), entrypoint.to_path_buf()));
        Ok(())
    }
}

/// A registration manager wired to in-memory collaborators.
pub struct TestHost {
    pub manager: RegistrationManager,
    pub emitter: Arc<Emitter>,
    pub scheduler: Arc<RecordingScheduler>,
    pub sandbox: Arc<RecordingSandbox>,
    pub flows: Arc<FlowManager>,
    pub router: Arc<EndpointRouter>,
    pub embeds: Arc<HookEmbeds>,
    pub loader: Arc<StaticModuleLoader>,
    pub source: Arc<StaticExtensionSource>,
}

impl TestHost {
    pub fn new(extensions: Vec<Extension>, loader: StaticModuleLoader) -> Self {
        let emitter = Arc::new(Emitter::new());
        let resources = HostResources::new(Arc::clone(&emitter), Env::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let sandbox = Arc::new(RecordingSandbox::default());
        let flows = Arc::new(FlowManager::new(resources.clone()));
        let router = Arc::new(EndpointRouter::new());
        let embeds = Arc::new(HookEmbeds::new());
        let loader = Arc::new(loader);
        let source = Arc::new(StaticExtensionSource::new(extensions));

        let collaborators = Collaborators {
            source: source.clone(),
            loader: loader.clone(),
            sandbox: sandbox.clone(),
            bus: emitter.clone(),
            scheduler: scheduler.clone(),
            flows: flows.clone(),
            router: Arc::clone(&router),
            embeds: Arc::clone(&embeds),
            resources,
            schedule_enabled: Arc::new(AtomicBool::new(true)),
        };

        Self {
            manager: RegistrationManager::new(collaborators),
            emitter,
            scheduler,
            sandbox,
            flows,
            router,
            embeds,
            loader,
            source,
        }
    }
}

/// Module path of a trusted test extension.
pub fn module_path(name: &str) -> String {
    format!("/ext/{name}/index.js")
}

/// A trusted extension installed at `/ext/<name>` with entrypoint `index.js`.
pub fn trusted(name: &str, kind: ExtensionKind) -> Extension {
    Extension::new(name, kind, format!("/ext/{name}"), Entrypoint::Single("index.js".into())).trusted()
}

/// An untrusted extension installed at `/ext/<name>`.
pub fn untrusted(name: &str, kind: ExtensionKind) -> Extension {
    Extension::new(name, kind, format!("/ext/{name}"), Entrypoint::Single("index.js".into()))
}

/// One event seen by [`LogCapture`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

struct FieldVisitor<'a> {
    fields: &'a mut BTreeMap<String, String>,
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields.insert(field.name().to_string(), format!("{value:?}"));
    }
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor { fields: &mut fields });
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}

/// Collects tracing events emitted on the current thread while alive.
pub struct LogCapture {
    layer: CaptureLayer,
    _guard: tracing::subscriber::DefaultGuard,
}

impl LogCapture {
    pub fn start() -> Self {
        let layer = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(layer.clone());
        Self {
            layer,
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }

    /// Events at `level` whose `message` contains `needle`.
    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.layer
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .filter(|e| e.fields.get("message").is_some_and(|m| m.contains(needle)))
            .count()
    }

    /// All events at `level`.
    pub fn at(&self, level: Level) -> Vec<CapturedEvent> {
        self.layer
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }
}
