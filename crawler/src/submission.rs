use crate::comments::{extract_links, CommentFetcher};
use crate::storage::JsonStore;
use reddit_client::{retry_with_backoff, ContentApi, RateLimiter, RetryConfig};
use snoocrawl_core::{CommentRecord, CoreError, SubmissionRecord};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Submission ids already claimed in this run. Shared by every processor of
/// the run; check-and-insert happens atomically under the lock.
pub type ProcessedIds = Arc<Mutex<HashSet<String>>>;

/// Turns one submission id into a persisted [`SubmissionRecord`].
pub struct SubmissionProcessor {
    api: Arc<dyn ContentApi>,
    limiter: Arc<RateLimiter>,
    store: Arc<JsonStore>,
    processed: ProcessedIds,
    comments: CommentFetcher,
    fetch_retry: RetryConfig,
}

impl SubmissionProcessor {
    pub fn new(
        api: Arc<dyn ContentApi>,
        limiter: Arc<RateLimiter>,
        store: Arc<JsonStore>,
        processed: ProcessedIds,
    ) -> Self {
        let comments = CommentFetcher::new(Arc::clone(&api), Arc::clone(&limiter));
        Self {
            api,
            limiter,
            store,
            processed,
            comments,
            fetch_retry: RetryConfig::submission_fetch(),
        }
    }

    /// Fetches one submission and its comment tree, appends it to the
    /// subreddit's artifact, and returns the record. Returns `None` when
    /// another processor of this run already claimed the id.
    pub async fn process(
        &self,
        submission_id: &str,
        comment_depth: u32,
        subreddit: &str,
    ) -> Result<Option<SubmissionRecord>, CoreError> {
        let submission = retry_with_backoff("submission fetch", &self.fetch_retry, || {
            let api = Arc::clone(&self.api);
            let limiter = Arc::clone(&self.limiter);
            async move {
                let permit = limiter.acquire().await;
                let result = api.fetch_submission(submission_id).await;
                permit.release().await;
                result
            }
        })
        .await?;

        {
            let mut processed = self.processed.lock().unwrap();
            if !processed.insert(submission.id.clone()) {
                debug!("Skipping already-processed submission {}", submission.id);
                return Ok(None);
            }
        }

        // Full "load more" expansion; the client makes as many calls as the
        // tree demands.
        let top_level = {
            let permit = self.limiter.acquire().await;
            let result = self.api.top_level_comments(&submission.id).await;
            permit.release().await;
            result?
        };

        let mut record = SubmissionRecord {
            selftext: submission.selftext,
            title: submission.title,
            id: submission.id,
            score: submission.score,
            url: submission.url,
            permalink: submission.permalink,
            comments: Vec::with_capacity(top_level.len()),
        };

        for comment in top_level {
            let links = extract_links(&comment.body);
            let replies = self
                .comments
                .fetch_replies(&record.id, &comment.id, comment_depth)
                .await;
            record.comments.push(CommentRecord {
                id: comment.id,
                body: comment.body,
                score: comment.score,
                links,
                replies: if replies.is_empty() {
                    None
                } else {
                    Some(replies)
                },
            });
        }

        self.store.append_submission(subreddit, &record).await?;
        Ok(Some(record))
    }
}
