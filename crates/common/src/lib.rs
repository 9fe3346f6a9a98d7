//! Shared types, config, and error definitions for the trivia-bot.

pub mod config;
pub mod error;
pub mod report;
pub mod types;

pub use config::BotConfig;
pub use error::{format_error_chain, Error};
pub use report::{AccuracyReport, MethodAccuracy, Notification, NullReporter, Reporter};
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
