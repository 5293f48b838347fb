use crate::api::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use crate::config::BuilderConfig;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Global pacing gate. Every outbound request takes a turn here, so the minimum
/// interval holds across all workers sharing one client.
#[derive(Debug)]
pub struct PacingGate {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl PacingGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Clone)]
pub struct WikiClient {
    transport: Arc<dyn HttpTransport>,
    gate: Arc<PacingGate>,
    config: Arc<BuilderConfig>,
    cancel: CancellationToken,
}

impl WikiClient {
    pub fn new(config: Arc<BuilderConfig>, cancel: CancellationToken) -> AppResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, transport, cancel))
    }

    pub fn with_transport(
        config: Arc<BuilderConfig>,
        transport: Arc<dyn HttpTransport>,
        cancel: CancellationToken,
    ) -> Self {
        let gate = Arc::new(PacingGate::new(config.min_request_interval()));
        Self {
            transport,
            gate,
            config,
            cancel,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn get(&self, url: &str) -> AppResult<HttpResponse> {
        self.request(Method::GET, url).await
    }

    pub async fn head(&self, url: &str) -> AppResult<HttpResponse> {
        self.request(Method::HEAD, url).await
    }

    pub async fn get_text(&self, url: &str) -> AppResult<String> {
        self.get(url).await.map(|resp| resp.text())
    }

    /// Paced request with bounded retries. `max_retries` is the total number of attempts.
    /// 404 ends immediately with `PageNotFound`; other non-retryable statuses end with `HttpStatus`.
    pub async fn request(&self, method: Method, url: &str) -> AppResult<HttpResponse> {
        let max_attempts = self.config.max_retries.max(1);
        let mut last_error: Option<AppError> = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                self.pause(self.config.retry_delay(attempt - 1), url).await?;
            }
            self.ensure_active(url)?;
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(AppError::Cancelled(url.to_string())),
                _ = self.gate.wait_turn() => {}
            }

            let log_prefix = format!("{} {} (Try {}/{})", method, url, attempt + 1, max_attempts);

            match self.transport.execute(method.clone(), url).await {
                Ok(resp) if resp.status.is_success() => return Ok(resp),
                Ok(resp) if resp.status == StatusCode::NOT_FOUND => {
                    log(LogLevel::Debug, &format!("{} - 404", log_prefix));
                    return Err(AppError::PageNotFound(url.to_string()));
                }
                Ok(resp) => {
                    let error = AppError::HttpStatus {
                        status: resp.status.as_u16(),
                        url: url.to_string(),
                    };
                    if !error.is_retryable() {
                        log(LogLevel::Debug, &format!("{} - {}", log_prefix, resp.status));
                        return Err(error);
                    }
                    if resp.status == StatusCode::TOO_MANY_REQUESTS {
                        log(
                            LogLevel::Warning,
                            &format!("{} - Rate limited (429), backing off", log_prefix),
                        );
                    } else {
                        log(
                            LogLevel::Warning,
                            &format!("{} Failed: {}", log_prefix, resp.status),
                        );
                    }
                    last_error = Some(error);
                }
                Err(e) if e.is_retryable() => {
                    log(LogLevel::Warning, &format!("{} {}", log_prefix, e));
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());
        Err(AppError::transient(url, max_attempts, message))
    }

    fn ensure_active(&self, url: &str) -> AppResult<()> {
        if self.cancel.is_cancelled() {
            Err(AppError::Cancelled(url.to_string()))
        } else {
            Ok(())
        }
    }

    async fn pause(&self, delay: Duration, url: &str) -> AppResult<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AppError::Cancelled(url.to_string())),
            _ = sleep(delay) => Ok(()),
        }
    }
}
