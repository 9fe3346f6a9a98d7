//! Bot configuration types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Quiz API bearer token.
    #[serde(default)]
    pub token: String,

    /// Quiz API base URL.
    #[serde(default = "default_quiz_api")]
    pub quiz_api: String,

    /// Simulated quiz API used in test mode.
    #[serde(default = "default_test_api")]
    pub test_api: String,

    /// Run against `test_api` without a token.
    #[serde(default)]
    pub test_mode: bool,

    /// Dashboard base URL that receives stage notifications.
    #[serde(default = "default_output_url")]
    pub output_url: String,

    /// Disable the dashboard push entirely.
    #[serde(default)]
    pub disable_output: bool,

    /// Language tables used for question analysis and search.
    #[serde(default)]
    pub locale: LocaleId,

    /// Directory for the JSONL session journal (resolved at startup if unset).
    #[serde(default)]
    pub journal_dir: Option<String>,

    /// Timing parameters.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Search and fetch parameters.
    #[serde(default)]
    pub search: SearchConfig,

    /// Fusion weights for the prediction methods.
    #[serde(default)]
    pub fusion: FusionConfig,
}

impl BotConfig {
    /// The API the scheduler should poll.
    pub fn active_api(&self) -> &str {
        if self.test_mode {
            &self.test_api
        } else {
            &self.quiz_api
        }
    }
}

/// Supported analysis locales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocaleId {
    #[default]
    #[serde(rename = "en-uk")]
    EnglishUk,
    #[serde(rename = "en-us")]
    EnglishUs,
    #[serde(rename = "de")]
    German,
}

impl LocaleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocaleId::EnglishUk => "en-uk",
            LocaleId::EnglishUs => "en-us",
            LocaleId::German => "de",
        }
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocaleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en-uk" | "en_uk" | "en-gb" => Ok(LocaleId::EnglishUk),
            "en-us" | "en_us" => Ok(LocaleId::EnglishUs),
            "de" | "de-de" => Ok(LocaleId::German),
            other => Err(format!("unknown locale '{other}' (expected en-uk, en-us or de)")),
        }
    }
}

/// Timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Per-call timeout for the schedule poll (milliseconds).
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Delay before retrying a failed schedule poll.
    #[serde(default = "default_poll_retry_secs")]
    pub poll_retry_secs: u64,

    /// Poll interval once the show is close or its time is unknown.
    #[serde(default = "default_near_show_poll_secs")]
    pub near_show_poll_secs: u64,

    /// A show further away than this is "far"; the scheduler backs off.
    #[serde(default = "default_far_show_threshold_secs")]
    pub far_show_threshold_secs: u64,

    /// Lower bound of the jittered far-show sleep.
    #[serde(default = "default_far_sleep_min_secs")]
    pub far_sleep_min_secs: u64,

    /// Upper bound of the jittered far-show sleep.
    #[serde(default = "default_far_sleep_max_secs")]
    pub far_sleep_max_secs: u64,

    /// Re-emit the waiting status at most this far apart while sleeping.
    #[serde(default = "default_waiting_report_secs")]
    pub waiting_report_secs: u64,

    /// WebSocket keep-alive ping period.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Pause between the end of one session and the next discovery cycle.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

/// Search and page-fetch parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Result links kept per query.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// Timeout for a search results page (milliseconds).
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Timeout for each content page fetch (milliseconds).
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Hard budget for one evidence-gathering branch of a prediction (milliseconds).
    #[serde(default = "default_prediction_budget_ms")]
    pub prediction_budget_ms: u64,

    /// Outbound search/fetch requests per second.
    #[serde(default = "default_requests_per_sec")]
    pub requests_per_sec: u32,

    /// Override for the locale's search endpoint (e.g. a local mirror).
    #[serde(default)]
    pub search_url: Option<String>,
}

/// Fusion weights. Heuristic constants, kept tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Weight of exact-phrase occurrences in question texts.
    #[serde(default = "default_exact_phrase_weight")]
    pub exact_phrase_weight: f64,

    /// Weight of candidate-keyword occurrences in question texts.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    /// Weight of question evidence found in each candidate's own search.
    #[serde(default = "default_answer_context_weight")]
    pub answer_context_weight: f64,

    /// Share of the answer-context score coming from question keywords;
    /// the remainder comes from key nouns.
    #[serde(default = "default_context_keyword_share")]
    pub context_keyword_share: f64,

    /// Score given to a zero count when the question is an opposite question.
    #[serde(default = "default_opposite_zero_score")]
    pub opposite_zero_score: f64,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_quiz_api() -> String {
    "https://api-quiz.hype.space".into()
}
fn default_test_api() -> String {
    "http://localhost:8732".into()
}
fn default_output_url() -> String {
    "http://localhost:1029".into()
}

fn default_poll_timeout_ms() -> u64 {
    1500
}
fn default_poll_retry_secs() -> u64 {
    5
}
fn default_near_show_poll_secs() -> u64 {
    2
}
fn default_far_show_threshold_secs() -> u64 {
    60
}
fn default_far_sleep_min_secs() -> u64 {
    60
}
fn default_far_sleep_max_secs() -> u64 {
    120
}
fn default_waiting_report_secs() -> u64 {
    5
}
fn default_heartbeat_secs() -> u64 {
    5
}
fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_results_per_query() -> usize {
    7
}
fn default_search_timeout_ms() -> u64 {
    5000
}
fn default_fetch_timeout_ms() -> u64 {
    2000
}
fn default_prediction_budget_ms() -> u64 {
    10_000
}
fn default_requests_per_sec() -> u32 {
    20
}

fn default_exact_phrase_weight() -> f64 {
    0.7
}
fn default_keyword_weight() -> f64 {
    0.7
}
fn default_answer_context_weight() -> f64 {
    0.4
}
fn default_context_keyword_share() -> f64 {
    0.75
}
fn default_opposite_zero_score() -> f64 {
    100_000.0
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout_ms(),
            poll_retry_secs: default_poll_retry_secs(),
            near_show_poll_secs: default_near_show_poll_secs(),
            far_show_threshold_secs: default_far_show_threshold_secs(),
            far_sleep_min_secs: default_far_sleep_min_secs(),
            far_sleep_max_secs: default_far_sleep_max_secs(),
            waiting_report_secs: default_waiting_report_secs(),
            heartbeat_secs: default_heartbeat_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            results_per_query: default_results_per_query(),
            search_timeout_ms: default_search_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            prediction_budget_ms: default_prediction_budget_ms(),
            requests_per_sec: default_requests_per_sec(),
            search_url: None,
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            exact_phrase_weight: default_exact_phrase_weight(),
            keyword_weight: default_keyword_weight(),
            answer_context_weight: default_answer_context_weight(),
            context_keyword_share: default_context_keyword_share(),
            opposite_zero_score: default_opposite_zero_score(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            quiz_api: default_quiz_api(),
            test_api: default_test_api(),
            test_mode: false,
            output_url: default_output_url(),
            disable_output: false,
            locale: LocaleId::default(),
            journal_dir: None,
            timing: TimingConfig::default(),
            search: SearchConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}
