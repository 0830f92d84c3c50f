//! End-to-end tests for the crawl pipeline, driven against an in-memory
//! fake of the content API.

use async_trait::async_trait;
use crawler::CrawlOrchestrator;
use reddit_client::{CommentData, ContentApi, SubmissionData};
use snoocrawl_core::{CoreError, CrawlConfig, RedditApiError, SubmissionRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct FakeApi {
    hot: HashMap<String, Vec<String>>,
    submissions: HashMap<String, SubmissionData>,
    top_level: HashMap<String, Vec<CommentData>>,
    replies: HashMap<String, Vec<CommentData>>,
    listing_delay: Duration,
}

impl FakeApi {
    /// Two submissions, each with one top-level comment carrying one reply.
    fn with_two_submissions(subreddit: &str) -> Self {
        let mut api = FakeApi::default();
        api.hot.insert(
            subreddit.to_string(),
            vec!["s1".to_string(), "s2".to_string()],
        );

        for (submission_id, comment_id, reply_id) in [("s1", "c1", "r1"), ("s2", "c2", "r2")] {
            api.submissions.insert(
                submission_id.to_string(),
                SubmissionData {
                    id: submission_id.to_string(),
                    title: format!("post {}", submission_id),
                    selftext: "seen at https://example.com".to_string(),
                    score: 5,
                    url: format!("https://www.reddit.com/r/{}/comments/{}/", subreddit, submission_id),
                    permalink: format!("/r/{}/comments/{}/", subreddit, submission_id),
                },
            );
            api.top_level.insert(
                submission_id.to_string(),
                vec![CommentData {
                    id: comment_id.to_string(),
                    body: "top comment".to_string(),
                    score: 2,
                }],
            );
            api.replies.insert(
                comment_id.to_string(),
                vec![CommentData {
                    id: reply_id.to_string(),
                    body: "reply".to_string(),
                    score: 1,
                }],
            );
        }

        api
    }

    fn also_listing(mut self, subreddit: &str, ids: &[&str]) -> Self {
        self.hot.insert(
            subreddit.to_string(),
            ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl ContentApi for FakeApi {
    async fn fetch_submission(&self, submission_id: &str) -> Result<SubmissionData, CoreError> {
        self.submissions.get(submission_id).cloned().ok_or_else(|| {
            CoreError::RedditApi(RedditApiError::SubmissionNotFound {
                submission_id: submission_id.to_string(),
            })
        })
    }

    async fn list_hot(&self, subreddit: &str, limit: u32) -> Result<Vec<String>, CoreError> {
        if !self.listing_delay.is_zero() {
            tokio::time::sleep(self.listing_delay).await;
        }
        let ids = self.hot.get(subreddit).cloned().ok_or_else(|| {
            CoreError::RedditApi(RedditApiError::NotFound {
                resource: format!("/r/{}/hot.json", subreddit),
            })
        })?;
        Ok(ids.into_iter().take(limit as usize).collect())
    }

    async fn top_level_comments(&self, submission_id: &str) -> Result<Vec<CommentData>, CoreError> {
        Ok(self.top_level.get(submission_id).cloned().unwrap_or_default())
    }

    async fn comment_replies(
        &self,
        _submission_id: &str,
        comment_id: &str,
    ) -> Result<Vec<CommentData>, CoreError> {
        Ok(self.replies.get(comment_id).cloned().unwrap_or_default())
    }
}

fn config_for(dir: &tempfile::TempDir) -> CrawlConfig {
    CrawlConfig {
        max_in_flight: 10,
        max_calls_per_minute: 60_000.0,
        max_concurrent_subreddits: 3,
        subreddit_timeout: Duration::from_secs(5),
        output_dir: dir.path().to_path_buf(),
    }
}

fn subreddits(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn end_to_end_crawl_of_one_subreddit() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(FakeApi::with_two_submissions("books"));
    let orchestrator = CrawlOrchestrator::new(api, config_for(&dir));

    let data = orchestrator
        .crawl_all(&subreddits(&["books"]), 2, 1)
        .await
        .unwrap();

    let books = &data["books"];
    assert_eq!(books.len(), 2);

    for record in books.values() {
        assert_eq!(record.comments.len(), 1);
        let comment = &record.comments[0];
        let replies = comment.replies.as_ref().expect("depth 1 fetches replies");
        assert_eq!(replies.len(), 1);
        assert!(replies[0].replies.is_none());
    }

    // Per-subreddit artifact holds both records
    let bytes = tokio::fs::read(dir.path().join("reddit_data_books.json"))
        .await
        .unwrap();
    let persisted: Vec<SubmissionRecord> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(persisted.len(), 2);

    // Combined artifact mirrors the returned mapping
    let bytes = tokio::fs::read(dir.path().join("reddit_data_multiple.json"))
        .await
        .unwrap();
    let combined: snoocrawl_core::CrawlResult = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(combined["books"].len(), 2);
}

#[tokio::test]
async fn depth_zero_leaves_comments_unexpanded() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(FakeApi::with_two_submissions("books"));
    let orchestrator = CrawlOrchestrator::new(api, config_for(&dir));

    let data = orchestrator
        .crawl_all(&subreddits(&["books"]), 2, 0)
        .await
        .unwrap();

    for record in data["books"].values() {
        assert_eq!(record.comments.len(), 1);
        assert!(record.comments[0].replies.is_none());
    }
}

#[tokio::test]
async fn shared_ids_are_processed_by_exactly_one_subreddit() {
    let dir = tempfile::tempdir().unwrap();
    // Both subreddits list the same two submissions
    let api = Arc::new(
        FakeApi::with_two_submissions("books").also_listing("reading", &["s1", "s2"]),
    );
    let orchestrator = CrawlOrchestrator::new(api, config_for(&dir));

    let data = orchestrator
        .crawl_all(&subreddits(&["books", "reading"]), 2, 0)
        .await
        .unwrap();

    for id in ["s1", "s2"] {
        let owners = data.values().filter(|m| m.contains_key(id)).count();
        assert_eq!(owners, 1, "submission {} processed more than once", id);
    }

    let total: usize = data.values().map(|m| m.len()).sum();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn unknown_subreddit_fails_soft() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(FakeApi::with_two_submissions("books"));
    let orchestrator = CrawlOrchestrator::new(api, config_for(&dir));

    let data = orchestrator
        .crawl_all(&subreddits(&["books", "doesnotexist"]), 2, 0)
        .await
        .unwrap();

    assert_eq!(data["books"].len(), 2);
    assert!(data["doesnotexist"].is_empty());
}

#[tokio::test]
async fn slow_subreddit_times_out_without_aborting_the_run() {
    let dir = tempfile::tempdir().unwrap();

    let mut slow = FakeApi::with_two_submissions("books");
    slow.listing_delay = Duration::from_millis(200);
    let api = Arc::new(slow);

    let mut config = config_for(&dir);
    config.subreddit_timeout = Duration::from_millis(50);
    let orchestrator = CrawlOrchestrator::new(api, config);

    let data = orchestrator
        .crawl_all(&subreddits(&["books"]), 2, 0)
        .await
        .unwrap();

    // The timed-out subreddit is present but empty, and the combined
    // artifact was still written.
    assert!(data["books"].is_empty());
    assert!(dir.path().join("reddit_data_multiple.json").exists());
}
