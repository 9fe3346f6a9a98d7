//! Bearer-token headers for the quiz API.
//!
//! The same header set goes on the schedule poll and the WebSocket upgrade.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use common::Error;

/// Client identification header the quiz API expects.
pub const CLIENT_HEADER: &str = "x-hq-client";
pub const CLIENT_VERSION: &str = "Android/1.5.0";

/// Holds the bearer token.
#[derive(Clone)]
pub struct QuizAuth {
    token: String,
}

impl std::fmt::Debug for QuizAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizAuth")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl QuizAuth {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.trim().to_string(),
        }
    }

    /// Header name/value pairs, in send order.
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("authorization", format!("Bearer {}", self.token)),
            (CLIENT_HEADER, CLIENT_VERSION.to_string()),
        ]
    }

    /// The header pairs as a reqwest `HeaderMap`.
    pub fn headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in self.header_pairs() {
            let value = HeaderValue::from_str(&value)
                .map_err(|e| Error::Config(format!("Invalid header value for {name}: {e}")))?;
            headers.insert(HeaderName::from_static(name), value);
        }
        Ok(headers)
    }
}
