use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("{operation} gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Submission not found: {submission_id}")]
    SubmissionNotFound { submission_id: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

/// Failure classes driving the retry policy: quota errors back off and
/// retry, transient errors retry on a fixed delay, everything else aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    QuotaExceeded,
    Transient,
    Unexpected,
}

impl CoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::RedditApi(api_error) => api_error.class(),
            CoreError::Network(e) if e.is_timeout() || e.is_connect() => ErrorClass::Transient,
            CoreError::Timeout { .. } => ErrorClass::Transient,
            _ => ErrorClass::Unexpected,
        }
    }

    /// Server-suggested delay before the next attempt, if the error carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after }) => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }
}

impl RedditApiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RedditApiError::RateLimitExceeded { .. } => ErrorClass::QuotaExceeded,
            RedditApiError::ServerError { .. } => ErrorClass::Transient,
            RedditApiError::RequestTimeout => ErrorClass::Transient,
            RedditApiError::Forbidden { .. } => ErrorClass::Unexpected,
            RedditApiError::NotFound { .. } => ErrorClass::Unexpected,
            RedditApiError::SubmissionNotFound { .. } => ErrorClass::Unexpected,
            RedditApiError::InvalidResponse { .. } => ErrorClass::Unexpected,
        }
    }
}
