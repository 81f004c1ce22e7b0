//! Markup contributed by hooks to the app's `<head>` and `<body>`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Where embedded markup is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedPosition {
    Head,
    Body,
}

impl fmt::Display for EmbedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "head"),
            Self::Body => write!(f, "body"),
        }
    }
}

/// Markup, or a function producing it.
#[derive(Clone)]
pub enum EmbedContent {
    Text(String),
    Lazy(Arc<dyn Fn() -> String + Send + Sync>),
}

impl EmbedContent {
    /// Wraps a function evaluated once at embed time.
    pub fn lazy<F>(render: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(render))
    }

    /// Evaluates the content.
    pub fn resolve(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Lazy(render) => render(),
        }
    }
}

impl fmt::Debug for EmbedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Lazy(_) => f.write_str("Lazy(<closure>)"),
        }
    }
}

impl From<&str> for EmbedContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for EmbedContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Snapshot of every embed, in contribution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedSnapshot {
    pub head: Vec<String>,
    pub body: Vec<String>,
}

/// Collected head and body embeds.
///
/// Embeds live for the lifetime of the process; teardown does not remove them.
#[derive(Debug, Default)]
pub struct HookEmbeds {
    inner: RwLock<EmbedSnapshot>,
}

impl HookEmbeds {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends markup at `position`.
    pub async fn push(&self, position: EmbedPosition, markup: String) {
        let mut inner = self.inner.write().await;
        match position {
            EmbedPosition::Head => inner.head.push(markup),
            EmbedPosition::Body => inner.body.push(markup),
        }
    }

    /// Returns a copy of the collected embeds.
    pub async fn snapshot(&self) -> EmbedSnapshot {
        self.inner.read().await.clone()
    }

    /// Joined markup for one position.
    pub async fn render(&self, position: EmbedPosition) -> String {
        let inner = self.inner.read().await;
        match position {
            EmbedPosition::Head => inner.head.join("\n"),
            EmbedPosition::Body => inner.body.join("\n"),
        }
    }
}
