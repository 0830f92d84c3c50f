use std::path::PathBuf;
use std::time::Duration;

/// Crawl-wide settings. Per-call parameters (subreddits, post limit,
/// comment depth) are passed to the orchestrator directly.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum outbound API calls in flight at once.
    pub max_in_flight: usize,
    /// Spacing budget for outbound calls.
    pub max_calls_per_minute: f64,
    /// Subreddit crawls running in parallel.
    pub max_concurrent_subreddits: usize,
    /// Wall-clock budget for one subreddit's crawl.
    pub subreddit_timeout: Duration,
    /// Directory receiving the per-subreddit and combined JSON artifacts.
    pub output_dir: PathBuf,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 50,
            max_calls_per_minute: 100.0,
            max_concurrent_subreddits: 3,
            subreddit_timeout: Duration::from_secs(300),
            output_dir: PathBuf::from("."),
        }
    }
}
