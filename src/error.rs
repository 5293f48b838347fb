use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Page not found: {0}")]
    PageNotFound(String),
    #[error("Transient network failure for {url} after {attempts} attempt(s): {message}")]
    TransientNetwork {
        url: String,
        attempts: u32,
        message: String,
    },
    #[error("HTTP {status} returned for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("HTTP request failed: {0}")]
    Reqwest(String),
    #[error("{0} not found or could not be parsed")]
    ExtractionFieldMissing(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Duplicate records in batch: {0}")]
    Duplicate(String),
    #[error("Persistence error at '{path}': {message}")]
    Persistence { path: String, message: String },
    #[error("Filesystem I/O error: {0}")]
    Io(String),
    #[error("JSON parsing error: {0}")]
    SerdeParse(String),
    #[error("JSON serialization error: {0}")]
    SerdeSerialize(String),
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("Image error: {0}")]
    Image(String),
    #[error("HTML parsing error: {0}")]
    HtmlParseError(String),
    #[error("Invalid argument provided: {0}")]
    Argument(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Tokio task join error: {0}")]
    JoinError(String),
    #[error("Timeout during operation: {0}")]
    Timeout(String),
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
    #[error("Unexpected internal error: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Reqwest(e.to_string())
    }
}
impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}
impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() || e.is_eof() || e.is_syntax() {
            AppError::SerdeParse(e.to_string())
        } else {
            AppError::SerdeSerialize(e.to_string())
        }
    }
}
impl From<JoinError> for AppError {
    fn from(e: JoinError) -> Self {
        AppError::JoinError(e.to_string())
    }
}
impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::Csv(e.to_string())
    }
}
impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        AppError::Image(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn persistence<S: Into<String>>(path: &std::path::Path, message: S) -> AppError {
        AppError::Persistence {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    pub fn transient<S: Into<String>>(url: &str, attempts: u32, message: S) -> AppError {
        AppError::TransientNetwork {
            url: url.to_string(),
            attempts,
            message: message.into(),
        }
    }

    /// Connection failures, timeouts, 429 and 5xx responses are worth another attempt.
    /// Everything else, 404 in particular, is terminal for the URL.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::TransientNetwork { .. } | AppError::Timeout(_) => true,
            AppError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::PageNotFound(_))
    }
}
