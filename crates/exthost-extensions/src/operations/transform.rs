//! `transform`: returns the configured JSON as the operation result.

use serde_json::Value;

use exthost_core::{AppError, AppResult};

use crate::module::{OperationConfig, operation_fn};

pub fn operation() -> OperationConfig {
    OperationConfig::new(
        "transform",
        operation_fn(|options, _ctx| async move {
            let result: AppResult<Value> = match options.get("json") {
                Some(Value::String(raw)) => serde_json::from_str(raw).map_err(AppError::from),
                Some(value) => Ok(value.clone()),
                None => Ok(Value::Null),
            };
            result
        }),
    )
}
