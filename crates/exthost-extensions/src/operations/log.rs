//! `log`: writes a message to the host log.

use serde_json::Value;

use crate::module::{OperationConfig, operation_fn};

pub fn operation() -> OperationConfig {
    OperationConfig::new(
        "log",
        operation_fn(|options, ctx| async move {
            let message = match options.get("message") {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            ctx.extension.logger.info(&message);
            Ok(Value::Null)
        }),
    )
}
