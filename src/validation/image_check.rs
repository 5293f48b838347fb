use crate::api::client::WikiClient;
use crate::api::fetchers::head_image;
use crate::api::transport::HttpResponse;
use crate::config;
use crate::error::AppError;
use crate::logging::{log, LogLevel};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCheck {
    Reachable,
    /// The server answered 404.
    Missing,
    /// Reachable, but something about the response looks wrong.
    Anomaly(String),
    /// No usable answer after retries.
    Unreachable(String),
}

/// Process-lifetime cache of image URL checks, shared between validators.
#[derive(Debug, Clone, Default)]
pub struct ImageCheckCache {
    inner: Arc<RwLock<HashMap<String, ImageCheck>>>,
}

impl ImageCheckCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, url: &str) -> Option<ImageCheck> {
        self.inner.read().await.get(url).cloned()
    }

    pub async fn insert(&self, url: &str, check: ImageCheck) {
        self.inner.write().await.insert(url.to_string(), check);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

pub fn classify_response(resp: &HttpResponse) -> ImageCheck {
    if let Some(content_type) = resp.content_type.as_deref() {
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return ImageCheck::Anomaly(format!("unexpected content type '{}'", content_type));
        }
    }
    match resp.content_length {
        Some(len) if len < config::REMOTE_IMAGE_MIN_BYTES => {
            ImageCheck::Anomaly(format!("suspiciously small image ({} bytes)", len))
        }
        Some(len) if len > config::REMOTE_IMAGE_MAX_BYTES => {
            ImageCheck::Anomaly(format!("unusually large image ({} bytes)", len))
        }
        _ => ImageCheck::Reachable,
    }
}

fn classify_error(error: &AppError) -> ImageCheck {
    match error {
        AppError::PageNotFound(_) => ImageCheck::Missing,
        AppError::HttpStatus { status: 403, .. } => {
            ImageCheck::Anomaly("access forbidden (403)".to_string())
        }
        AppError::HttpStatus { status, .. } => ImageCheck::Anomaly(format!("HTTP {}", status)),
        other => ImageCheck::Unreachable(other.to_string()),
    }
}

#[derive(Clone)]
pub struct ImageUrlChecker {
    client: WikiClient,
    cache: ImageCheckCache,
}

impl ImageUrlChecker {
    pub fn new(client: WikiClient, cache: ImageCheckCache) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &ImageCheckCache {
        &self.cache
    }

    /// HEAD check through the shared client. Each URL hits the network at most once per cache;
    /// a cancelled check is not remembered.
    pub async fn check(&self, url: &str) -> ImageCheck {
        if let Some(hit) = self.cache.get(url).await {
            return hit;
        }
        let result = match head_image(&self.client, url).await {
            Ok(resp) => classify_response(&resp),
            Err(AppError::Cancelled(_)) => {
                return ImageCheck::Unreachable("check cancelled".to_string());
            }
            Err(e) => classify_error(&e),
        };
        if result != ImageCheck::Reachable {
            log(
                LogLevel::Debug,
                &format!("Image URL check for '{}': {:?}", url, result),
            );
        }
        self.cache.insert(url, result.clone()).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::StatusCode;

    fn head(content_type: Option<&str>, len: Option<u64>) -> HttpResponse {
        HttpResponse {
            status: StatusCode::OK,
            final_url: "https://img.test/a.png".into(),
            content_type: content_type.map(str::to_string),
            content_length: len,
            body: Bytes::new(),
        }
    }

    #[test]
    fn response_classification() {
        assert_eq!(classify_response(&head(Some("image/png"), Some(40_000))), ImageCheck::Reachable);
        assert_eq!(classify_response(&head(None, None)), ImageCheck::Reachable);
        assert!(matches!(
            classify_response(&head(Some("text/html; charset=utf-8"), Some(40_000))),
            ImageCheck::Anomaly(_)
        ));
        assert!(matches!(
            classify_response(&head(Some("image/png"), Some(200))),
            ImageCheck::Anomaly(_)
        ));
        assert!(matches!(
            classify_response(&head(Some("image/webp"), Some(11 * 1024 * 1024))),
            ImageCheck::Anomaly(_)
        ));
    }

    #[test]
    fn error_classification() {
        assert_eq!(classify_error(&AppError::PageNotFound("u".into())), ImageCheck::Missing);
        assert!(matches!(
            classify_error(&AppError::HttpStatus { status: 403, url: "u".into() }),
            ImageCheck::Anomaly(_)
        ));
        assert!(matches!(
            classify_error(&AppError::transient("u", 3, "reset")),
            ImageCheck::Unreachable(_)
        ));
    }

    #[tokio::test]
    async fn cache_round_trip() {
        let cache = ImageCheckCache::new();
        assert!(cache.is_empty().await);
        cache.insert("https://img.test/a.png", ImageCheck::Missing).await;
        assert_eq!(cache.get("https://img.test/a.png").await, Some(ImageCheck::Missing));
        assert_eq!(cache.len().await, 1);
    }
}
