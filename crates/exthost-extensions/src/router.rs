//! Shared router that extension endpoints are mounted on.

use axum::Router;
use axum::routing::MethodRouter;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use exthost_core::{AppError, AppResult};

/// Fresh router handed to an endpoint's register function.
///
/// Paths are relative to the endpoint's mount path.
#[derive(Debug, Default)]
pub struct ScopedRouter {
    router: Router,
    routes: usize,
}

impl ScopedRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        self.router = std::mem::take(&mut self.router).route(path, method_router);
        self.routes += 1;
        self
    }

    /// Merges a prebuilt router.
    pub fn merge(&mut self, other: Router) -> &mut Self {
        self.router = std::mem::take(&mut self.router).merge(other);
        self.routes += 1;
        self
    }

    /// Number of `route`/`merge` calls made.
    pub fn route_count(&self) -> usize {
        self.routes
    }

    /// Consumes the builder.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// One mounted endpoint.
#[derive(Debug, Clone)]
struct Mount {
    prefix: String,
    extension: String,
    router: Router,
}

impl Mount {
    fn matches(&self, path: &str) -> bool {
        path == self.prefix
            || path
                .strip_prefix(self.prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Summary of a mount, for logging and inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Route prefix, with leading slash.
    pub prefix: String,
    /// Extension that mounted it.
    pub extension: String,
}

/// Stack of prefix mounts, in mount order.
///
/// A request goes to the mount with the longest matching prefix; among mounts
/// sharing a prefix the first one wins.
#[derive(Debug, Default)]
pub struct EndpointRouter {
    mounts: RwLock<Vec<Mount>>,
}

impl EndpointRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes a mount path to `/<path>`.
    ///
    /// Rejects empty paths, empty segments and route-pattern characters.
    pub fn normalize_mount_path(path: &str) -> AppResult<String> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(AppError::validation("Endpoint mount path is empty"));
        }
        if trimmed.contains(['{', '}', '*']) {
            return Err(AppError::validation(format!(
                "Endpoint mount path '{path}' contains route pattern characters"
            )));
        }
        if trimmed.split('/').any(str::is_empty) {
            return Err(AppError::validation(format!(
                "Endpoint mount path '{path}' contains an empty segment"
            )));
        }
        Ok(format!("/{trimmed}"))
    }

    /// Mounts `router` under `mount_path`.
    pub async fn mount(&self, extension: &str, mount_path: &str, router: Router) -> AppResult<String> {
        let prefix = Self::normalize_mount_path(mount_path)?;
        let mut mounts = self.mounts.write().await;

        if let Some(existing) = mounts.iter().find(|m| m.prefix == prefix) {
            warn!(
                extension = %extension,
                prefix = %prefix,
                shadowed_by = %existing.extension,
                "Endpoint prefix already mounted, new routes are shadowed"
            );
        }

        mounts.push(Mount {
            prefix: prefix.clone(),
            extension: extension.to_string(),
            router: Router::new().nest(&prefix, router),
        });

        debug!(extension = %extension, prefix = %prefix, "Endpoint mounted");
        Ok(prefix)
    }

    /// Removes every mount. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let mut mounts = self.mounts.write().await;
        let removed = mounts.len();
        mounts.clear();
        removed
    }

    /// Lists mounts in mount order.
    pub async fn mounts(&self) -> Vec<MountInfo> {
        self.mounts
            .read()
            .await
            .iter()
            .map(|m| MountInfo {
                prefix: m.prefix.clone(),
                extension: m.extension.clone(),
            })
            .collect()
    }

    /// Number of mounts.
    pub async fn len(&self) -> usize {
        self.mounts.read().await.len()
    }

    /// Returns whether nothing is mounted.
    pub async fn is_empty(&self) -> bool {
        self.mounts.read().await.is_empty()
    }

    /// Router that should serve `path`, if any mount matches.
    pub async fn route_for(&self, path: &str) -> Option<Router> {
        let mounts = self.mounts.read().await;
        let mut best: Option<&Mount> = None;
        for mount in mounts.iter().filter(|m| m.matches(path)) {
            if best.is_none_or(|b| mount.prefix.len() > b.prefix.len()) {
                best = Some(mount);
            }
        }
        best.map(|m| m.router.clone())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    fn text_router(body: &'static str) -> Router {
        let mut scoped = ScopedRouter::new();
        scoped.route("/", get(move || async move { body }));
        scoped.route("/ping", get(|| async { "pong" }));
        scoped.into_router()
    }

    async fn call(router: Router, path: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_normalize_mount_path() {
        assert_eq!(EndpointRouter::normalize_mount_path("reports").unwrap(), "/reports");
        assert_eq!(EndpointRouter::normalize_mount_path("/a/b/").unwrap(), "/a/b");
        assert!(EndpointRouter::normalize_mount_path("").is_err());
        assert!(EndpointRouter::normalize_mount_path("/").is_err());
        assert!(EndpointRouter::normalize_mount_path("{id}").is_err());
        assert!(EndpointRouter::normalize_mount_path("a//b").is_err());
    }

    #[tokio::test]
    async fn test_mount_and_dispatch() {
        let endpoints = EndpointRouter::new();
        endpoints.mount("reports", "reports", text_router("reports")).await.unwrap();

        let router = endpoints.route_for("/reports/ping").await.unwrap();
        assert_eq!(call(router, "/reports/ping").await, (StatusCode::OK, "pong".into()));

        assert!(endpoints.route_for("/reportsx").await.is_none());
        assert!(endpoints.route_for("/other").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_prefix_first_wins() {
        let endpoints = EndpointRouter::new();
        endpoints.mount("first", "shared", text_router("first")).await.unwrap();
        endpoints.mount("second", "shared", text_router("second")).await.unwrap();
        assert_eq!(endpoints.len().await, 2);

        let router = endpoints.route_for("/shared").await.unwrap();
        assert_eq!(call(router, "/shared").await.1, "first");
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let endpoints = EndpointRouter::new();
        endpoints.mount("outer", "a", text_router("outer")).await.unwrap();
        endpoints.mount("inner", "a/b", text_router("inner")).await.unwrap();

        let router = endpoints.route_for("/a/b").await.unwrap();
        assert_eq!(call(router, "/a/b").await.1, "inner");
    }

    #[tokio::test]
    async fn test_clear() {
        let endpoints = EndpointRouter::new();
        endpoints.mount("x", "x", text_router("x")).await.unwrap();
        assert_eq!(endpoints.clear().await, 1);
        assert!(endpoints.is_empty().await);
        assert!(endpoints.route_for("/x").await.is_none());
    }
}
