use crate::submission::SubmissionProcessor;
use reddit_client::{retry_with_backoff, ContentApi, RateLimiter, RetryConfig};
use snoocrawl_core::SubredditData;
use std::sync::Arc;
use tracing::{error, info};

/// Crawls one subreddit: a bounded hot listing, then each submission in
/// listing order.
pub struct SubredditCrawler {
    api: Arc<dyn ContentApi>,
    limiter: Arc<RateLimiter>,
    processor: SubmissionProcessor,
    listing_retry: RetryConfig,
}

impl SubredditCrawler {
    pub fn new(
        api: Arc<dyn ContentApi>,
        limiter: Arc<RateLimiter>,
        processor: SubmissionProcessor,
    ) -> Self {
        Self {
            api,
            limiter,
            processor,
            listing_retry: RetryConfig::listing(),
        }
    }

    /// A listing that stays empty after retries fails soft: the subreddit
    /// yields an empty map and the rest of the run continues. Submissions are
    /// processed sequentially; a failed submission is logged and skipped.
    pub async fn crawl(
        &self,
        subreddit: &str,
        post_limit: u32,
        comment_depth: u32,
    ) -> SubredditData {
        let mut results = SubredditData::new();

        let ids = match retry_with_backoff("submission listing", &self.listing_retry, || {
            let api = Arc::clone(&self.api);
            let limiter = Arc::clone(&self.limiter);
            let subreddit = subreddit.to_string();
            async move {
                let permit = limiter.acquire().await;
                let result = api.list_hot(&subreddit, post_limit).await;
                permit.release().await;
                result
            }
        })
        .await
        {
            Ok(ids) => ids,
            Err(err) => {
                error!("Failed to list submissions for r/{}: {}", subreddit, err);
                return results;
            }
        };

        if ids.is_empty() {
            error!("No submission ids fetched for r/{}", subreddit);
            return results;
        }

        for submission_id in ids {
            match self
                .processor
                .process(&submission_id, comment_depth, subreddit)
                .await
            {
                Ok(Some(record)) => {
                    info!("Processed post in r/{}: {}", subreddit, record.id);
                    results.insert(record.id.clone(), record);
                }
                Ok(None) => {}
                Err(err) => {
                    error!(
                        "Failed to process submission {} in r/{}: {}",
                        submission_id, subreddit, err
                    );
                }
            }
        }

        results
    }
}
