use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One crawled submission with its comment tree, as written to disk.
///
/// Field order matches the on-disk JSON layout consumed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub selftext: String,
    pub title: String,
    pub id: String,
    pub score: i64,
    pub url: String,
    pub permalink: String,
    pub comments: Vec<CommentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub body: String,
    pub score: i64,
    pub links: Vec<String>,
    /// Nested replies, present only when at least one was fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentRecord>>,
}

/// Submissions of one subreddit, keyed by submission id.
pub type SubredditData = HashMap<String, SubmissionRecord>;

/// Combined output of one orchestrator run, keyed by subreddit name.
pub type CrawlResult = HashMap<String, SubredditData>;
