//! `sleep`: pauses the flow.

use std::time::Duration;

use serde_json::Value;

use exthost_core::AppError;

use crate::module::{OperationConfig, operation_fn};

pub fn operation() -> OperationConfig {
    OperationConfig::new(
        "sleep",
        operation_fn(|options, _ctx| async move {
            let milliseconds = match options.get("milliseconds") {
                Some(Value::Number(n)) => n.as_u64(),
                Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
                _ => None,
            }
            .ok_or_else(|| AppError::validation("sleep: \"milliseconds\" must be a non-negative integer"))?;

            tokio::time::sleep(Duration::from_millis(milliseconds)).await;
            Ok::<_, AppError>(Value::Null)
        }),
    )
}
