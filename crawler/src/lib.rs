//! The crawl pipeline: comment tree fetching, submission processing,
//! per-subreddit crawling, and the multi-subreddit orchestrator.

pub mod comments;
pub mod orchestrator;
pub mod storage;
pub mod submission;
pub mod subreddit;

pub use comments::{extract_links, CommentFetcher};
pub use orchestrator::CrawlOrchestrator;
pub use storage::JsonStore;
pub use submission::{ProcessedIds, SubmissionProcessor};
pub use subreddit::SubredditCrawler;
