//! HTTP search and page-fetch client.

use std::time::Duration;

use async_trait::async_trait;
use common::config::SearchConfig;
use common::{format_error_chain, Error};
use futures_util::future::join_all;
use tracing::{debug, warn};
use url::Url;

use crate::clean::clean_html;
use crate::links::extract_result_links;
use crate::rate_limit::RateLimiter;
use crate::WebSearch;

/// Desktop browser identity; result pages for unknown agents differ.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:58.0) Gecko/20100101 Firefox/58.0";

fn normalize_search_url(raw: &str) -> Result<Url, Error> {
    Url::parse(raw.trim()).map_err(|e| Error::Config(format!("invalid search URL '{raw}': {e}")))
}

#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    search_url: Url,
    search_timeout: Duration,
    limiter: RateLimiter,
}

impl SearchClient {
    /// * `search_url`: results endpoint; the query is appended as `q`.
    pub fn new(search_url: &str, settings: &SearchConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| Error::Http(format_error_chain(&e)))?;

        Ok(Self {
            client,
            search_url: normalize_search_url(search_url)?,
            search_timeout: Duration::from_millis(settings.search_timeout_ms),
            limiter: RateLimiter::per_second(settings.requests_per_sec),
        })
    }

    /// Results-page URL for `query`.
    pub fn query_url(&self, query: &str) -> String {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair("q", query);
        url.into()
    }

    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, Error> {
        self.limiter.wait().await;

        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::Search(format_error_chain(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("{} returned {}", url, status)));
        }

        resp.text()
            .await
            .map_err(|e| Error::Search(format_error_chain(&e)))
    }
}

#[async_trait]
impl WebSearch for SearchClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, Error> {
        let url = self.query_url(query);
        let page = self.get_text(&url, self.search_timeout).await?;
        let links = extract_result_links(&page, limit);
        debug!("Search '{}' -> {} links", query, links.len());
        Ok(links)
    }

    async fn fetch_and_clean(&self, urls: &[String], timeout: Duration) -> Vec<String> {
        let fetches = urls.iter().map(|url| async move {
            match self.get_text(url, timeout).await {
                Ok(html) => clean_html(&html),
                Err(e) => {
                    warn!("Fetch failed for {}: {}", url, e);
                    String::new()
                }
            }
        });
        join_all(fetches).await
    }
}
