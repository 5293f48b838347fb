use crate::config::{self, BuilderConfig};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// URL after redirects.
    pub final_url: String,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A single HTTP exchange with no pacing or retries. Connection failures map to
/// `TransientNetwork`, timeouts to `Timeout`; any status code is returned as a response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, method: Method, url: &str) -> AppResult<HttpResponse>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &BuilderConfig) -> AppResult<Self> {
        let client = Client::builder()
            .default_headers(config::BASE_HEADERS.clone())
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(config::HTTP_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(AppError::from)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, method: Method, url: &str) -> AppResult<HttpResponse> {
        let is_head = method == Method::HEAD;
        let resp = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| classify_send_error(url, e))?;

        let status = resp.status();
        let final_url = resp.url().to_string();
        let headers = resp.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase());
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());

        let body = if is_head {
            Bytes::new()
        } else {
            resp.bytes()
                .await
                .map_err(|e| classify_send_error(url, e))?
        };

        Ok(HttpResponse {
            status,
            final_url,
            content_type,
            content_length,
            body,
        })
    }
}

fn classify_send_error(url: &str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(format!("{}: {}", url, e))
    } else if e.is_connect() || e.is_request() || e.is_body() {
        AppError::transient(url, 1, e.to_string())
    } else {
        AppError::from(e)
    }
}
