use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use snoocrawl_core::{CoreError, CrawlResult, SubmissionRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Writes crawl output as pretty-printed JSON files.
///
/// Every read-modify-write runs under one lock, so an append can never lose
/// a concurrent append's data. Subreddits never share a file, but the lock
/// also covers the combined artifact.
#[derive(Debug)]
pub struct JsonStore {
    output_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn subreddit_path(&self, subreddit: &str) -> PathBuf {
        self.output_dir
            .join(format!("reddit_data_{}.json", subreddit))
    }

    pub fn combined_path(&self) -> PathBuf {
        self.output_dir.join("reddit_data_multiple.json")
    }

    /// Appends one record to the subreddit's array: load the existing array
    /// (or start a new one), push, rewrite truncated.
    pub async fn append_submission(
        &self,
        subreddit: &str,
        record: &SubmissionRecord,
    ) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.subreddit_path(subreddit);

        let mut records: Vec<SubmissionRecord> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        records.push(record.clone());
        write_pretty(&path, &records).await?;
        debug!("Appended submission {} to {}", record.id, path.display());
        Ok(())
    }

    /// Overwrites the combined artifact with the whole run's output.
    pub async fn write_combined(&self, data: &CrawlResult) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock().await;
        write_pretty(&self.combined_path(), data).await
    }
}

/// Serializes with 4-space indentation, the layout downstream consumers of
/// the artifacts expect.
async fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    tokio::fs::write(path, buf).await?;
    Ok(())
}
