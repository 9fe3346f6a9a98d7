//! REST client for the quiz API.
//!
//! Only one endpoint matters: `GET /shows/now`, which reports whether a
//! broadcast is live and, if not, when the next one starts.

use std::time::Duration;

use common::{format_error_chain, Error, ShowSchedule, ShowsNowResponse};
use tracing::{debug, info, warn};

use crate::auth::QuizAuth;

pub const GAME_INFO_PATH: &str = "/shows/now";

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn resolve_base_url(configured: &str) -> String {
    if let Ok(override_url) = std::env::var("TRIVIA_QUIZ_API_URL") {
        let normalized = normalize_base_url(&override_url);
        if !normalized.is_empty() {
            info!("Using TRIVIA_QUIZ_API_URL override: {}", normalized);
            return normalized;
        }
        warn!("Ignoring empty TRIVIA_QUIZ_API_URL override");
    }

    normalize_base_url(configured)
}

fn summarize_response_body(raw: &str) -> String {
    const MAX_CHARS: usize = 800;
    let compact = raw.replace(['\n', '\r'], " ");
    match compact.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &compact[..cut]),
        None => compact,
    }
}

/// Async REST client for the quiz API.
#[derive(Debug, Clone)]
pub struct QuizRestClient {
    client: reqwest::Client,
    auth: QuizAuth,
    base_url: String,
    poll_timeout: Duration,
}

impl QuizRestClient {
    /// Create a new REST client.
    ///
    /// * `base_url`: quiz API root; `TRIVIA_QUIZ_API_URL` takes precedence.
    /// * `poll_timeout`: per-call timeout for the schedule poll.
    pub fn new(auth: QuizAuth, base_url: &str, poll_timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(format_error_chain(&e)))?;

        Ok(Self {
            client,
            auth,
            base_url: resolve_base_url(base_url),
            poll_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Poll the current show schedule.
    ///
    /// Network failures, timeouts and undecodable bodies come back as
    /// transient errors; a rejected token comes back as `Error::AuthInvalid`.
    pub async fn get_schedule(&self) -> Result<ShowSchedule, Error> {
        let resp = self
            .client
            .get(self.url(GAME_INFO_PATH))
            .headers(self.auth.headers()?)
            .timeout(self.poll_timeout)
            .send()
            .await
            .map_err(|e| Error::Http(format_error_chain(&e)))?;

        let status_code = resp.status().as_u16();
        let raw_body = resp
            .text()
            .await
            .map_err(|e| Error::Http(format_error_chain(&e)))?;

        let body = parse_schedule_body(status_code, &raw_body)?;
        debug!("Schedule response: {:?}", body);

        if body.is_auth_invalid() {
            return Err(Error::AuthInvalid(format!(
                "quiz API rejected the token (status={})",
                status_code
            )));
        }

        Ok(body.into_schedule())
    }
}

fn parse_schedule_body(status_code: u16, raw_body: &str) -> Result<ShowsNowResponse, Error> {
    serde_json::from_str(raw_body).map_err(|e| {
        Error::Http(format!(
            "Error decoding schedule response (status={}): {}; body={}",
            status_code,
            e,
            summarize_response_body(raw_body)
        ))
    })
}
