use crate::storage::JsonStore;
use crate::submission::{ProcessedIds, SubmissionProcessor};
use crate::subreddit::SubredditCrawler;
use futures::stream::{self, StreamExt};
use reddit_client::{ContentApi, RateLimitConfig, RateLimiter};
use snoocrawl_core::{CoreError, CrawlConfig, CrawlResult, SubredditData};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::time::timeout;
use tracing::{error, info};

/// Runs several subreddit crawls on a bounded pool and writes the combined
/// artifact at the end of the run.
pub struct CrawlOrchestrator {
    api: Arc<dyn ContentApi>,
    limiter: Arc<RateLimiter>,
    store: Arc<JsonStore>,
    config: CrawlConfig,
}

impl CrawlOrchestrator {
    pub fn new(api: Arc<dyn ContentApi>, config: CrawlConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            max_in_flight: config.max_in_flight,
            max_calls_per_minute: config.max_calls_per_minute,
        }));
        let store = Arc::new(JsonStore::new(config.output_dir.clone()));

        Self {
            api,
            limiter,
            store,
            config,
        }
    }

    /// Crawls every subreddit, at most `max_concurrent_subreddits` at a
    /// time. A subreddit that exceeds its timeout is skipped with an empty
    /// result; the other crawls are unaffected.
    pub async fn crawl_all(
        &self,
        subreddits: &[String],
        post_limit: u32,
        comment_depth: u32,
    ) -> Result<CrawlResult, CoreError> {
        // One dedup set per run; concurrent crawls share it.
        let processed: ProcessedIds = Arc::new(Mutex::new(HashSet::new()));

        let mut crawls = stream::iter(subreddits.iter().map(|name| {
            let crawler = self.subreddit_crawler(Arc::clone(&processed));
            let name = name.clone();
            let budget = self.config.subreddit_timeout;
            async move {
                let outcome = timeout(budget, crawler.crawl(&name, post_limit, comment_depth)).await;
                (name, outcome)
            }
        }))
        .buffer_unordered(self.config.max_concurrent_subreddits);

        let mut all_data = CrawlResult::new();
        while let Some((name, outcome)) = crawls.next().await {
            match outcome {
                Ok(data) => {
                    info!("Completed crawling r/{}: {} submissions", name, data.len());
                    all_data.insert(name, data);
                }
                Err(_) => {
                    error!(
                        "Crawl of r/{} exceeded {:?}, skipping",
                        name, self.config.subreddit_timeout
                    );
                    all_data.insert(name, SubredditData::new());
                }
            }
        }

        self.store.write_combined(&all_data).await?;
        Ok(all_data)
    }

    fn subreddit_crawler(&self, processed: ProcessedIds) -> SubredditCrawler {
        let processor = SubmissionProcessor::new(
            Arc::clone(&self.api),
            Arc::clone(&self.limiter),
            Arc::clone(&self.store),
            processed,
        );
        SubredditCrawler::new(Arc::clone(&self.api), Arc::clone(&self.limiter), processor)
    }
}
