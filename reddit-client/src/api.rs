use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snoocrawl_core::{CoreError, RedditApiError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

const REDDIT_JSON_BASE: &str = "https://www.reddit.com";

/// Reddit serves at most this many comments per tree fetch; the remainder
/// arrives as "more" stubs.
const COMMENT_FETCH_LIMIT: u32 = 500;

/// The morechildren endpoint accepts at most 100 ids per call.
const MORE_CHILDREN_BATCH: usize = 100;

/// Submission metadata as the crawl pipeline consumes it.
#[derive(Debug, Clone)]
pub struct SubmissionData {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub score: i64,
    pub url: String,
    pub permalink: String,
}

/// One comment node as the crawl pipeline consumes it.
#[derive(Debug, Clone)]
pub struct CommentData {
    pub id: String,
    pub body: String,
    pub score: i64,
}

/// The remote content platform, as seen by the crawl pipeline.
///
/// The production implementation is [`RedditApiClient`]; tests drive the
/// pipeline against in-memory fakes. Every operation may fail with a
/// quota-exceeded error, which callers are expected to retry with backoff.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Fetch one submission's metadata by id.
    async fn fetch_submission(&self, submission_id: &str) -> Result<SubmissionData, CoreError>;

    /// List up to `limit` submission ids from the subreddit's hot listing.
    async fn list_hot(&self, subreddit: &str, limit: u32) -> Result<Vec<String>, CoreError>;

    /// Top-level comments of a submission, with every "load more" stub
    /// expanded. Expansion is unbounded in the number of calls it may take.
    async fn top_level_comments(&self, submission_id: &str)
        -> Result<Vec<CommentData>, CoreError>;

    /// Refresh one comment node, revealing its direct replies.
    async fn comment_replies(
        &self,
        submission_id: &str,
        comment_id: &str,
    ) -> Result<Vec<CommentData>, CoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubmissionData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub score: i64,
    pub url: String,
    pub permalink: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub parent_id: String,
    /// Either `""` or a nested listing; parsed lazily.
    #[serde(default)]
    pub replies: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct MoreStubData {
    #[serde(default)]
    children: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenEnvelope {
    json: MoreChildrenBody,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenBody {
    data: MoreChildrenData,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenData {
    things: Vec<RedditListingChild<serde_json::Value>>,
}

impl From<RedditSubmissionData> for SubmissionData {
    fn from(data: RedditSubmissionData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            selftext: data.selftext,
            score: data.score,
            url: data.url,
            permalink: data.permalink,
        }
    }
}

impl From<RedditCommentData> for CommentData {
    fn from(data: RedditCommentData) -> Self {
        Self {
            id: data.id,
            body: data.body,
            score: data.score,
        }
    }
}

/// Splits listing children into parsed comments and ids still hidden
/// behind "more" stubs.
fn split_comment_children(
    children: Vec<RedditListingChild<serde_json::Value>>,
) -> Result<(Vec<RedditCommentData>, Vec<String>), CoreError> {
    let mut comments = Vec::new();
    let mut pending = Vec::new();

    for child in children {
        match child.kind.as_str() {
            "t1" => comments.push(serde_json::from_value(child.data)?),
            "more" => {
                let stub: MoreStubData = serde_json::from_value(child.data)?;
                pending.extend(stub.children);
            }
            other => debug!("Ignoring listing child of kind {}", other),
        }
    }

    Ok((comments, pending))
}

/// Direct reply children of a comment. Reddit encodes "no replies" as the
/// empty string instead of a listing.
fn reply_children(comment: &RedditCommentData) -> Vec<RedditListingChild<serde_json::Value>> {
    match serde_json::from_value::<RedditListing<serde_json::Value>>(comment.replies.clone()) {
        Ok(listing) => listing.data.children,
        Err(_) => Vec::new(),
    }
}

/// HTTP client for Reddit's public JSON endpoints.
#[derive(Debug)]
pub struct RedditApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    metrics: Arc<MetricsCollector>,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Self {
        let base_url = Url::parse(REDDIT_JSON_BASE).expect("base URL is valid");
        Self::with_base_url(user_agent, base_url)
    }

    /// Points the client at an alternate host; tests use this to talk to a
    /// mock server.
    pub fn with_base_url(user_agent: String, base_url: Url) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            base_url,
            metrics: Arc::new(MetricsCollector::new()),
            user_agent,
        }
    }

    pub async fn metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    async fn make_request(
        &self,
        endpoint: &str,
        query_params: &[(&str, String)],
    ) -> Result<reqwest::Response, CoreError> {
        let url = self.base_url.join(endpoint).map_err(|e| {
            CoreError::Internal {
                message: format!("invalid endpoint {}: {}", endpoint, e),
            }
        })?;
        let start_time = Instant::now();

        debug!("Reddit API request: GET {}", endpoint);
        let result = self
            .http_client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .query(query_params)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for GET {}: {}", endpoint, e);
                self.record(endpoint, None, start_time.elapsed(), false, false)
                    .await;
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            self.record(
                endpoint,
                Some(status.as_u16()),
                start_time.elapsed(),
                true,
                false,
            )
            .await;
            return Ok(response);
        }

        error!("Request failed with status {} for {}", status, endpoint);
        let quota_hit = status.as_u16() == 429;
        self.record(
            endpoint,
            Some(status.as_u16()),
            start_time.elapsed(),
            false,
            quota_hit,
        )
        .await;

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded {
                    retry_after,
                }))
            }
            403 => Err(CoreError::RedditApi(RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            })),
            404 => Err(CoreError::RedditApi(RedditApiError::NotFound {
                resource: endpoint.to_string(),
            })),
            code if status.is_server_error() => {
                Err(CoreError::RedditApi(RedditApiError::ServerError {
                    status_code: code,
                }))
            }
            code => Err(CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("unexpected status {} for {}", code, endpoint),
            })),
        }
    }

    async fn record(
        &self,
        endpoint: &str,
        status_code: Option<u16>,
        response_time: Duration,
        success: bool,
        quota_hit: bool,
    ) {
        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                status_code,
                response_time,
                success,
                quota_hit,
            })
            .await;
    }
}

#[async_trait]
impl ContentApi for RedditApiClient {
    async fn fetch_submission(&self, submission_id: &str) -> Result<SubmissionData, CoreError> {
        let endpoint = format!("/comments/{}.json", submission_id);
        let response = self
            .make_request(&endpoint, &[("limit", "1".to_string())])
            .await?;

        // The comments endpoint returns a two-element array: the submission
        // listing, then the comment listing.
        let (submission_listing, _comments): (
            RedditListing<RedditSubmissionData>,
            serde_json::Value,
        ) = response.json().await.map_err(|e| {
            error!("Failed to parse submission {}: {}", submission_id, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse submission {}", submission_id),
            })
        })?;

        let child = submission_listing
            .data
            .children
            .into_iter()
            .next()
            .ok_or_else(|| {
                CoreError::RedditApi(RedditApiError::SubmissionNotFound {
                    submission_id: submission_id.to_string(),
                })
            })?;

        debug!("Fetched submission {}", submission_id);
        Ok(child.data.into())
    }

    async fn list_hot(&self, subreddit: &str, limit: u32) -> Result<Vec<String>, CoreError> {
        let endpoint = format!("/r/{}/hot.json", subreddit);
        let response = self
            .make_request(&endpoint, &[("limit", limit.to_string())])
            .await?;

        let listing: RedditListing<RedditSubmissionData> =
            response.json().await.map_err(|e| {
                error!("Failed to parse hot listing for r/{}: {}", subreddit, e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("failed to parse hot listing for r/{}", subreddit),
                })
            })?;

        let ids: Vec<String> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.id)
            .collect();

        info!("Retrieved {} submissions from r/{}", ids.len(), subreddit);
        Ok(ids)
    }

    async fn top_level_comments(
        &self,
        submission_id: &str,
    ) -> Result<Vec<CommentData>, CoreError> {
        let endpoint = format!("/comments/{}.json", submission_id);
        let response = self
            .make_request(
                &endpoint,
                &[
                    ("limit", COMMENT_FETCH_LIMIT.to_string()),
                    ("depth", "1".to_string()),
                ],
            )
            .await?;

        let (_submission, comment_listing): (serde_json::Value, RedditListing<serde_json::Value>) =
            response.json().await.map_err(|e| {
                error!(
                    "Failed to parse comments for submission {}: {}",
                    submission_id, e
                );
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("failed to parse comments for submission {}", submission_id),
                })
            })?;

        let (mut comments, mut pending) = split_comment_children(comment_listing.data.children)?;
        let link_id = format!("t3_{}", submission_id);

        // Full expansion: every stub batch may reveal further stubs, so this
        // loop is unbounded in the number of calls it makes.
        while !pending.is_empty() {
            let batch_len = pending.len().min(MORE_CHILDREN_BATCH);
            let batch: Vec<String> = pending.drain(..batch_len).collect();

            let response = self
                .make_request(
                    "/api/morechildren.json",
                    &[
                        ("api_type", "json".to_string()),
                        ("link_id", link_id.clone()),
                        ("children", batch.join(",")),
                    ],
                )
                .await?;

            let envelope: MoreChildrenEnvelope = response.json().await.map_err(|e| {
                error!(
                    "Failed to parse morechildren for submission {}: {}",
                    submission_id, e
                );
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("failed to parse morechildren for {}", submission_id),
                })
            })?;

            let (more_comments, more_pending) =
                split_comment_children(envelope.json.data.things)?;
            // morechildren returns nodes from any depth; only direct children
            // of the submission belong in the top-level sequence.
            comments.extend(more_comments.into_iter().filter(|c| c.parent_id == link_id));
            pending.extend(more_pending);
        }

        debug!(
            "Expanded {} top-level comments for submission {}",
            comments.len(),
            submission_id
        );
        Ok(comments.into_iter().map(CommentData::from).collect())
    }

    async fn comment_replies(
        &self,
        submission_id: &str,
        comment_id: &str,
    ) -> Result<Vec<CommentData>, CoreError> {
        let endpoint = format!("/comments/{}.json", submission_id);
        let response = self
            .make_request(
                &endpoint,
                &[
                    ("comment", comment_id.to_string()),
                    ("depth", "2".to_string()),
                ],
            )
            .await?;

        let (_submission, comment_listing): (serde_json::Value, RedditListing<serde_json::Value>) =
            response.json().await.map_err(|e| {
                error!("Failed to parse refresh of comment {}: {}", comment_id, e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("failed to parse refresh of comment {}", comment_id),
                })
            })?;

        let (focal, _) = split_comment_children(comment_listing.data.children)?;
        let Some(comment) = focal.into_iter().find(|c| c.id == comment_id) else {
            debug!("Comment {} vanished on refresh", comment_id);
            return Ok(Vec::new());
        };

        // Stubs among the direct replies are left unexpanded; the traversal
        // keeps whatever was materialized.
        let (replies, _stubs) = split_comment_children(reply_children(&comment))?;
        Ok(replies.into_iter().map(CommentData::from).collect())
    }
}
