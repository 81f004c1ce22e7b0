//! Built-in workflow operations, registered before any extension operation.

pub mod log;
pub mod sleep;
pub mod throw_error;
pub mod transform;

use crate::module::OperationConfig;

/// Every built-in operation.
pub fn builtin_operations() -> Vec<OperationConfig> {
    vec![
        log::operation(),
        sleep::operation(),
        transform::operation(),
        throw_error::operation(),
    ]
}
