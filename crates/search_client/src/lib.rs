//! Web search adapter: result links for a query, cleaned text for a page.
//!
//! The prediction core only ever sees lowercased plain text; raw HTML stays
//! inside this crate.

use std::time::Duration;

use async_trait::async_trait;
use common::Error;
use futures_util::future::join_all;
use tracing::warn;

pub mod clean;
pub mod client;
pub mod links;
pub mod rate_limit;

pub use clean::clean_html;
pub use client::SearchClient;
pub use links::extract_result_links;
pub use rate_limit::RateLimiter;

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Up to `limit` result URLs for `query`, in rank order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, Error>;

    /// Cleaned text per URL, same order and length as `urls`. A failed
    /// fetch yields an empty string at its position.
    async fn fetch_and_clean(&self, urls: &[String], timeout: Duration) -> Vec<String>;

    /// Run several searches concurrently; a failed search yields no links.
    async fn multiple_search(&self, queries: &[String], limit: usize) -> Vec<Vec<String>> {
        let searches = queries.iter().map(|q| async move {
            self.search(q, limit).await.unwrap_or_else(|e| {
                warn!("Search failed for '{}': {}", q, e);
                Vec::new()
            })
        });
        join_all(searches).await
    }
}
