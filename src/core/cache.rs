use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Name to resolved page URL, shared by all workers for the lifetime of the process.
/// Only successful resolutions are stored.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub async fn get(&self, name: &str) -> Option<String> {
        self.inner.read().await.get(&Self::key(name)).cloned()
    }

    pub async fn insert(&self, name: &str, url: String) {
        self.inner.write().await.insert(Self::key(name), url);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
