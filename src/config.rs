//! Configuration loader: merges .env, config.toml, env vars and CLI flags.

use std::path::Path;

use common::config::{BotConfig, LocaleId};
use common::Error;

/// Values given on the command line; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub token: Option<String>,
    pub quiz_api: Option<String>,
    pub test_api: Option<String>,
    pub output_url: Option<String>,
    pub locale: Option<LocaleId>,
    pub test_mode: bool,
    pub disable_output: bool,
    /// Offline single prediction; the quiz API is never contacted.
    pub offline: bool,
}

fn parse_positive_usize(raw: &str, env_name: &str) -> Result<usize, Error> {
    let parsed = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::Config(format!("{} must be an integer > 0", env_name)))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{} must be an integer > 0", env_name)));
    }
    Ok(parsed)
}

fn parse_bool(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "yes" | "on")
}

fn validate_config(config: &BotConfig, needs_quiz_api: bool) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if needs_quiz_api && !config.test_mode && config.token.trim().is_empty() {
        issues.push("token is required (set TRIVIA_TOKEN or pass --token) unless --test".into());
    }
    if url::Url::parse(config.active_api()).is_err() {
        issues.push(format!("quiz API '{}' is not a valid URL", config.active_api()));
    }
    if !config.disable_output && url::Url::parse(&config.output_url).is_err() {
        issues.push(format!("output_url '{}' is not a valid URL", config.output_url));
    }

    let t = &config.timing;
    if t.poll_timeout_ms == 0 {
        issues.push("timing.poll_timeout_ms must be > 0".into());
    }
    if t.poll_retry_secs == 0 {
        issues.push("timing.poll_retry_secs must be > 0".into());
    }
    if t.near_show_poll_secs == 0 {
        issues.push("timing.near_show_poll_secs must be > 0".into());
    }
    if t.far_sleep_min_secs > t.far_sleep_max_secs {
        issues.push("timing.far_sleep_min_secs must be <= timing.far_sleep_max_secs".into());
    }
    if t.waiting_report_secs == 0 {
        issues.push("timing.waiting_report_secs must be > 0".into());
    }
    if t.heartbeat_secs == 0 {
        issues.push("timing.heartbeat_secs must be > 0".into());
    }

    let s = &config.search;
    if s.results_per_query == 0 {
        issues.push("search.results_per_query must be > 0".into());
    }
    if s.search_timeout_ms == 0 || s.fetch_timeout_ms == 0 {
        issues.push("search.search_timeout_ms and search.fetch_timeout_ms must be > 0".into());
    }
    if s.prediction_budget_ms == 0 {
        issues.push("search.prediction_budget_ms must be > 0".into());
    }
    if s.requests_per_sec == 0 {
        issues.push("search.requests_per_sec must be > 0".into());
    }
    if let Some(raw) = &s.search_url {
        if url::Url::parse(raw).is_err() {
            issues.push(format!("search.search_url '{}' is not a valid URL", raw));
        }
    }

    let f = &config.fusion;
    let weights = [f.exact_phrase_weight, f.keyword_weight, f.answer_context_weight];
    if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
        issues.push("fusion weights must be finite and >= 0".into());
    } else if weights.iter().sum::<f64>() <= 0.0 {
        issues.push("fusion total weight must be > 0".into());
    }
    if !(0.0..=1.0).contains(&f.context_keyword_share) {
        issues.push("fusion.context_keyword_share must be in [0,1]".into());
    }
    if f.opposite_zero_score <= 0.0 {
        issues.push("fusion.opposite_zero_score must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply environment overrides through `lookup` (normally `std::env::var`).
fn apply_env<F>(config: &mut BotConfig, lookup: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup("TRIVIA_TOKEN") {
        config.token = token.trim().to_string();
    }
    if let Some(api) = lookup("TRIVIA_QUIZ_API") {
        config.quiz_api = api.trim().to_string();
    }
    if let Some(api) = lookup("TRIVIA_TEST_API") {
        config.test_api = api.trim().to_string();
    }
    if let Some(url) = lookup("TRIVIA_OUTPUT_URL") {
        config.output_url = url.trim().to_string();
    }
    if let Some(raw) = lookup("TRIVIA_LOCALE") {
        config.locale = raw
            .parse()
            .map_err(|e: String| Error::Config(format!("TRIVIA_LOCALE: {}", e)))?;
    }
    if let Some(raw) = lookup("TRIVIA_TEST_MODE") {
        config.test_mode = parse_bool(&raw);
    }
    if let Some(raw) = lookup("TRIVIA_DISABLE_OUTPUT") {
        config.disable_output = parse_bool(&raw);
    }
    if let Some(raw) = lookup("TRIVIA_SEARCH_RESULTS") {
        config.search.results_per_query = parse_positive_usize(&raw, "TRIVIA_SEARCH_RESULTS")?;
    }
    if let Some(raw) = lookup("TRIVIA_SEARCH_URL") {
        let trimmed = raw.trim();
        config.search.search_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if let Some(dir) = lookup("TRIVIA_JOURNAL_DIR") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            config.journal_dir = Some(trimmed.to_string());
        }
    }
    Ok(())
}

fn apply_cli(config: &mut BotConfig, cli: &CliOverrides) {
    if let Some(token) = &cli.token {
        config.token = token.clone();
    }
    if let Some(api) = &cli.quiz_api {
        config.quiz_api = api.clone();
    }
    if let Some(api) = &cli.test_api {
        config.test_api = api.clone();
    }
    if let Some(url) = &cli.output_url {
        config.output_url = url.clone();
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    if cli.test_mode {
        config.test_mode = true;
    }
    if cli.disable_output {
        config.disable_output = true;
    }
}

pub fn load_config(cli: &CliOverrides) -> Result<BotConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = BotConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Environment, then the command line.
    apply_env(&mut config, |name| std::env::var(name).ok())?;
    apply_cli(&mut config, cli);

    validate_config(&config, !cli.offline)?;
    Ok(config)
}
