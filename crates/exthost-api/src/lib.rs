//! # exthost-api
//!
//! HTTP layer for exthost built on Axum.
//!
//! Serves the routes API extensions mount, the compiled app extension
//! bundle and its chunks, hook embeds, health, and a reload trigger that
//! tears every extension down and registers it again.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{HostParts, build_app, run_server, run_server_with_loader};
pub use state::AppState;
