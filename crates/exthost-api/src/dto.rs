//! Response bodies.

use serde::{Deserialize, Serialize};

use exthost_extensions::RegistrationSummary;

/// Standard success envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Prefixes currently mounted by endpoint extensions.
    pub endpoints: usize,
    /// Registered workflow operation ids.
    pub operations: usize,
    /// Subscriptions, jobs and modules awaiting teardown.
    pub ledger: usize,
}

/// Outcome of one registration pass over a kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationReport {
    pub kind: String,
    pub loaded: usize,
    pub sandboxed: usize,
    pub failed: usize,
}

impl From<RegistrationSummary> for RegistrationReport {
    fn from(summary: RegistrationSummary) -> Self {
        Self {
            kind: summary.kind.to_string(),
            loaded: summary.loaded,
            sandboxed: summary.sandboxed,
            failed: summary.failed,
        }
    }
}

/// Reload response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub registrations: Vec<RegistrationReport>,
    /// Whether the app bundle compiled.
    pub bundled: bool,
}
