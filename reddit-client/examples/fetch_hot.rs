//! Fetches the current hot listing of one subreddit and prints the ids.
//!
//! Run with: cargo run -p reddit-client --example fetch_hot

use reddit_client::{ContentApi, RedditApiClient};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("reddit_client=debug")
        .init();

    let client = RedditApiClient::new("snoocrawl-example/0.1".to_string());
    match client.list_hot("rust", 10).await {
        Ok(ids) => {
            for id in ids {
                println!("{}", id);
            }
        }
        Err(err) => eprintln!("listing failed: {}", err),
    }
}
