//! Unified error type for the trivia-bot.

use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The bearer token was rejected. Nothing retries past this.
    #[error("Auth not valid: {0}")]
    AuthInvalid(String),

    /// Peer closed, reset, refused or could not be resolved.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Only a rejected credential aborts the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::AuthInvalid(_))
    }

    /// Failures that are retried locally or degraded to empty evidence.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Json(_) | Error::Search(_) | Error::ConnectionLost(_)
        )
    }
}

/// Flatten an error and its sources into one line, skipping causes that
/// repeat text already present.
pub fn format_error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Leaf;

    impl std::fmt::Display for Leaf {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "connection refused")
        }
    }

    impl StdError for Leaf {}

    #[derive(Debug)]
    struct Wrapper(Leaf);

    impl std::fmt::Display for Wrapper {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "error sending request")
        }
    }

    impl StdError for Wrapper {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_error_chain_includes_causes() {
        let msg = format_error_chain(&Wrapper(Leaf));
        assert_eq!(msg, "error sending request: connection refused");
    }

    #[test]
    fn test_only_auth_is_fatal() {
        assert!(Error::AuthInvalid("bad token".into()).is_fatal());
        assert!(!Error::ConnectionLost("reset".into()).is_fatal());
        assert!(!Error::Http("timeout".into()).is_fatal());
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Http("timeout".into()).is_transient());
        assert!(Error::Search("no results".into()).is_transient());
        assert!(!Error::AuthInvalid("x".into()).is_transient());
        assert!(!Error::Config("x".into()).is_transient());
    }
}
