//! `throw-error`: fails the flow with a configured error.

use serde_json::Value;

use exthost_core::AppError;

use crate::module::{OperationConfig, operation_fn};

pub fn operation() -> OperationConfig {
    OperationConfig::new(
        "throw-error",
        operation_fn(|options, _ctx| async move {
            let code = options
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or("FLOW_ERROR");
            let message = options
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("An error was thrown by a flow");
            Err::<Value, _>(AppError::extension(format!("{code}: {message}")))
        }),
    )
}
