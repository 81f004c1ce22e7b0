//! Handler traits for the four kinds of hook callbacks, and event metadata.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use exthost_core::AppResult;

/// Metadata describing the event a handler is invoked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMeta {
    /// Name of the emitted event, e.g. `items.create`.
    pub event: String,
    /// Arbitrary data keyed by string.
    pub data: HashMap<String, Value>,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    /// Creates metadata for the named event.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Inserts a data value.
    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, Value::from(value))
    }

    /// Gets a data value by key.
    pub fn get_data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Gets a string data value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

/// Runs before an event completes and may transform its payload.
#[async_trait]
pub trait FilterHandler: Send + Sync {
    /// Returns the (possibly modified) payload.
    async fn handle(&self, payload: Value, meta: &EventMeta) -> AppResult<Value>;
}

/// Runs after an event completed. Side effects only.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Handles the event.
    async fn handle(&self, meta: &EventMeta) -> AppResult<()>;
}

/// Runs on a process-lifecycle event such as `app.before`.
#[async_trait]
pub trait InitHandler: Send + Sync {
    /// Handles the lifecycle event.
    async fn handle(&self, meta: &EventMeta) -> AppResult<()>;
}

/// Body of a cron-scheduled hook.
#[async_trait]
pub trait ScheduleHandler: Send + Sync {
    /// Runs one scheduled tick.
    async fn run(&self) -> AppResult<()>;
}
