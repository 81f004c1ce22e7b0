//! # exthost-core
//!
//! Core crate for the exthost extension runtime. Contains configuration
//! schemas, extension records, the collaborator traits shared between
//! the registration runtime and the app bundler, and the unified error system.
//!
//! This crate has **no** internal dependencies on other exthost crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
