use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use reddit_client::{retry_with_backoff, ContentApi, RateLimiter, RetryConfig};
use regex::Regex;
use snoocrawl_core::CommentRecord;
use std::sync::Arc;
use tracing::warn;

static LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("link pattern is valid"));

/// Extracts every `http(s)://` token from a comment body. Pure text scan,
/// no normalization.
pub fn extract_links(body: &str) -> Vec<String> {
    LINK_PATTERN
        .find_iter(body)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Materializes comment subtrees to a bounded depth.
pub struct CommentFetcher {
    api: Arc<dyn ContentApi>,
    limiter: Arc<RateLimiter>,
    retry: RetryConfig,
}

impl CommentFetcher {
    pub fn new(api: Arc<dyn ContentApi>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            api,
            limiter,
            retry: RetryConfig::comment_refresh(),
        }
    }

    /// Fetches the direct replies of one comment, recursing one level less
    /// below each reply. Reply order is whatever the API returned.
    ///
    /// A refresh that keeps failing abandons this branch (returns what was
    /// collected, here nothing) rather than failing the whole submission.
    pub fn fetch_replies<'a>(
        &'a self,
        submission_id: &'a str,
        comment_id: &'a str,
        remaining_depth: u32,
    ) -> BoxFuture<'a, Vec<CommentRecord>> {
        Box::pin(async move {
            if remaining_depth == 0 {
                return Vec::new();
            }

            let refreshed = retry_with_backoff("comment refresh", &self.retry, || {
                let api = Arc::clone(&self.api);
                let limiter = Arc::clone(&self.limiter);
                async move {
                    let permit = limiter.acquire().await;
                    let result = api.comment_replies(submission_id, comment_id).await;
                    permit.release().await;
                    result
                }
            })
            .await;

            let replies = match refreshed {
                Ok(replies) => replies,
                Err(err) => {
                    warn!("Giving up on replies of comment {}: {}", comment_id, err);
                    return Vec::new();
                }
            };

            let mut records = Vec::with_capacity(replies.len());
            for reply in replies {
                let links = extract_links(&reply.body);
                let children = self
                    .fetch_replies(submission_id, &reply.id, remaining_depth - 1)
                    .await;
                records.push(CommentRecord {
                    id: reply.id,
                    body: reply.body,
                    score: reply.score,
                    links,
                    replies: if children.is_empty() {
                        None
                    } else {
                        Some(children)
                    },
                });
            }
            records
        })
    }
}
