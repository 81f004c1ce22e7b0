//! Event dispatch: fires subscribed handlers in subscription order.
//!
//! For filters:
//! - Handlers run one after another, each receiving the previous handler's output.
//! - The first error aborts the chain and is returned to the emitting code.
//!
//! For actions and init events:
//! - All handlers run regardless of individual failures.
//! - Failures and timeouts are logged, never returned.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, warn};

use exthost_core::{AppError, AppResult};

use super::handlers::EventMeta;
use super::registry::{Emitter, EventKind};

/// Upper bound for a single handler invocation.
const HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

impl Emitter {
    /// Runs every filter subscribed to `event` over `payload`.
    pub async fn emit_filter(&self, event: &str, payload: Value, meta: &EventMeta) -> AppResult<Value> {
        let handlers = {
            let listeners = self.listeners.read().await;
            listeners.filters.get(event).cloned().unwrap_or_default()
        };

        if handlers.is_empty() {
            return Ok(payload);
        }

        debug!(event = %event, handler_count = handlers.len(), "Emitting filter");

        let mut payload = payload;
        for handler in &handlers {
            payload = tokio::time::timeout(HANDLER_TIMEOUT, handler.handle(payload, meta))
                .await
                .map_err(|_| {
                    AppError::service_unavailable(format!(
                        "Filter handler for \"{event}\" timed out after {} seconds",
                        HANDLER_TIMEOUT.as_secs()
                    ))
                })??;
        }

        Ok(payload)
    }

    /// Fires every action subscribed to `event`.
    pub async fn emit_action(&self, event: &str, meta: &EventMeta) {
        let handlers = {
            let listeners = self.listeners.read().await;
            listeners.actions.get(event).cloned().unwrap_or_default()
        };

        for handler in &handlers {
            let outcome = tokio::time::timeout(HANDLER_TIMEOUT, handler.handle(meta)).await;
            report(EventKind::Action, event, outcome);
        }
    }

    /// Fires every init handler subscribed to `event`.
    pub async fn emit_init(&self, event: &str, meta: &EventMeta) {
        let handlers = {
            let listeners = self.listeners.read().await;
            listeners.inits.get(event).cloned().unwrap_or_default()
        };

        for handler in &handlers {
            let outcome = tokio::time::timeout(HANDLER_TIMEOUT, handler.handle(meta)).await;
            report(EventKind::Init, event, outcome);
        }
    }
}

fn report(
    kind: EventKind,
    event: &str,
    outcome: Result<AppResult<()>, tokio::time::error::Elapsed>,
) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(event = %event, kind = %kind, error = %e, "Event handler failed");
        }
        Err(_) => {
            error!(
                event = %event,
                kind = %kind,
                "Event handler timed out after {} seconds",
                HANDLER_TIMEOUT.as_secs()
            );
        }
    }
}
