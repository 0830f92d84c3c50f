use snoocrawl_core::{CoreError, ErrorClass};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, first try included.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after every failed attempt.
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl RetryConfig {
    /// Policy for fetching one submission: a flat one-second pause between
    /// attempts, bounded at ten so a persistent quota error cannot stall a
    /// subreddit's crawl forever.
    pub fn submission_fetch() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Policy for listing a subreddit's hot submissions.
    pub fn listing() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(60),
            backoff_multiplier: 1.5,
            jitter_factor: 0.0,
        }
    }

    /// Policy for refreshing a comment node during tree traversal.
    pub fn comment_refresh() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

/// Delay before the retry following `attempt` (0-based) failed attempts
/// with quota errors: `base * multiplier^attempt`, plus optional jitter.
pub fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let multiplier = config.backoff_multiplier.powi(attempt as i32);
    let delay = config.base_delay.mul_f64(multiplier);

    if config.jitter_factor > 0.0 {
        delay + delay.mul_f64(config.jitter_factor * fastrand::f64())
    } else {
        delay
    }
}

/// Runs `operation` until it succeeds or the policy gives up.
///
/// Quota errors back off on the growing schedule, other transient failures
/// wait the base delay unchanged, and unexpected errors abort immediately.
/// Exhausting `max_attempts` yields [`CoreError::RetriesExhausted`].
pub async fn retry_with_backoff<T, F, Fut>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut last_error: Option<CoreError> = None;

    for attempt in 0..config.max_attempts {
        if attempt > 0 {
            debug!("Retry attempt {} for {}", attempt, operation_name);
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    info!("{} succeeded after {} retries", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                let has_attempts_left = attempt + 1 < config.max_attempts;
                match err.class() {
                    ErrorClass::QuotaExceeded => {
                        let delay = backoff_delay(attempt, config);
                        warn!(
                            "Rate limit exceeded during {}: {}. Retrying in {:?}",
                            operation_name, err, delay
                        );
                        last_error = Some(err);
                        if has_attempts_left {
                            sleep(delay).await;
                        }
                    }
                    ErrorClass::Transient => {
                        warn!(
                            "Request failure during {}: {}. Retrying in {:?}",
                            operation_name, err, config.base_delay
                        );
                        last_error = Some(err);
                        if has_attempts_left {
                            sleep(config.base_delay).await;
                        }
                    }
                    ErrorClass::Unexpected => {
                        error!("Unexpected error during {}: {}", operation_name, err);
                        return Err(err);
                    }
                }
            }
        }
    }

    error!(
        "{} failed after {} attempts, giving up",
        operation_name, config.max_attempts
    );
    Err(CoreError::RetriesExhausted {
        operation: operation_name.to_string(),
        attempts: config.max_attempts,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string()),
    })
}
