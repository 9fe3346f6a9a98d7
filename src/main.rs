//! Trivia-bot: live trivia broadcast assistant.
//!
//! Single-binary Tokio application that:
//! 1. Polls the quiz schedule until a broadcast goes live
//! 2. Follows the broadcast's live event stream
//! 3. Analyses each question and searches the web for evidence
//! 4. Reports a fused answer prediction per round to the dashboard

mod config;
mod journal;
mod output;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tokio::time::sleep;
use tracing::{error, info, warn};

use common::config::{BotConfig, LocaleId};
use common::{Notification, Reporter};
use predictor::{analyze, play, Locale, PredictionEngine};
use quiz_client::{QuizAuth, QuizRestClient, SchedulerPolicy, SessionConnection, ShowScheduler};
use search_client::SearchClient;

use crate::config::{load_config, CliOverrides};
use crate::journal::{resolve_journal_dir, JournalReporter, SessionJournal};
use crate::output::{ConsoleReporter, DashboardReporter, FanoutReporter};

/// Live trivia broadcast assistant
#[derive(Parser)]
#[command(name = "trivia-bot", about = "Predicts live trivia answers from web search evidence")]
struct Cli {
    /// Quiz API bearer token (overrides TRIVIA_TOKEN).
    #[arg(long)]
    token: Option<String>,

    /// Dashboard base URL (overrides TRIVIA_OUTPUT_URL).
    #[arg(long)]
    output: Option<String>,

    /// Do not push stage notifications to the dashboard.
    #[arg(long)]
    no_output: bool,

    /// Analysis locale: en-uk, en-us or de.
    #[arg(long)]
    locale: Option<LocaleId>,

    /// Use the simulated quiz API; no token required.
    #[arg(long)]
    test: bool,

    /// Quiz API base URL.
    #[arg(long)]
    quiz_api: Option<String>,

    /// Simulated quiz API base URL used with --test.
    #[arg(long)]
    test_api: Option<String>,

    /// Log filter, e.g. "debug" or "predictor=debug" (RUST_LOG wins).
    #[arg(long)]
    log_level: Option<String>,

    /// Poll the schedule once, print it, then exit.
    #[arg(long)]
    check_schedule: bool,

    /// Predict a single question offline, then exit.
    #[arg(long, requires = "choices")]
    predict: Option<String>,

    /// Comma-separated answer choices for --predict.
    #[arg(long, value_delimiter = ',')]
    choices: Vec<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            token: self.token.clone(),
            quiz_api: self.quiz_api.clone(),
            test_api: self.test_api.clone(),
            output_url: self.output.clone(),
            locale: self.locale,
            test_mode: self.test,
            disable_output: self.no_output,
            offline: self.predict.is_some(),
        }
    }
}

const DEFAULT_LOG_FILTER: &str = "trivia_bot=info,quiz_client=info,search_client=info,predictor=info";

fn build_engine(cfg: &BotConfig) -> Result<Arc<PredictionEngine<SearchClient>>, common::Error> {
    let locale = Arc::new(Locale::new(cfg.locale));
    let search_url = cfg
        .search
        .search_url
        .as_deref()
        .unwrap_or(locale.search_url());
    let search = SearchClient::new(search_url, &cfg.search)?;
    Ok(Arc::new(PredictionEngine::new(
        Arc::new(search),
        locale,
        &cfg.search,
        cfg.fusion.clone(),
    )))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging.
    let default_filter = cli.log_level.clone().unwrap_or_else(|| DEFAULT_LOG_FILTER.into());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(true)
        .init();

    info!("🧠 Trivia Bot starting...");

    let cfg = match load_config(&cli.overrides()) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Mode: {} | API: {} | locale: {}",
        if cfg.test_mode { "TEST" } else { "LIVE" },
        cfg.active_api(),
        cfg.locale
    );
    info!(
        "Search: {} results/query, fetch timeout {}ms, budget {}ms, {} req/s",
        cfg.search.results_per_query,
        cfg.search.fetch_timeout_ms,
        cfg.search.prediction_budget_ms,
        cfg.search.requests_per_sec
    );
    info!(
        "Fusion: exact={:.2}, keyword={:.2}, context={:.2}",
        cfg.fusion.exact_phrase_weight, cfg.fusion.keyword_weight, cfg.fusion.answer_context_weight
    );

    let engine = match build_engine(&cfg) {
        Ok(e) => e,
        Err(e) => {
            error!("Search client initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    // ── Predict mode ─────────────────────────────────────────────────
    if let Some(question) = &cli.predict {
        let evidence = analyze(question, &cli.choices, engine.locale());
        info!("Analysis: {}", evidence.report());
        let prediction = engine.predict(1, &evidence).await;
        for (label, p) in &prediction.distribution {
            info!("  → {:<30} {:>6.2}%", label, p * 100.0);
        }
        info!(
            "🎯 Best: {} (methods: {:?}, {:.2}s)",
            prediction.best, prediction.per_method_best, prediction.latency_secs
        );
        return;
    }

    let auth = QuizAuth::new(&cfg.token);
    let rest_client = match QuizRestClient::new(
        auth.clone(),
        cfg.active_api(),
        Duration::from_millis(cfg.timing.poll_timeout_ms),
    ) {
        Ok(c) => c,
        Err(e) => {
            error!("Quiz client initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    // ── Check-schedule mode ──────────────────────────────────────────
    if cli.check_schedule {
        match rest_client.get_schedule().await {
            Ok(schedule) => {
                match &schedule.live_address {
                    Some(address) => info!("✅ Broadcast is live at {}", address),
                    None => info!(
                        "No live broadcast. Next show: {} | prize: {}",
                        schedule
                            .next_show_time
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_else(|| "unknown".into()),
                        schedule.next_show_prize.as_deref().unwrap_or("unknown")
                    ),
                }
            }
            Err(e) => {
                error!("❌ Schedule check failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // ── Presentation sinks ───────────────────────────────────────────
    let mut reporter = FanoutReporter::default().with(ConsoleReporter);
    if !cfg.disable_output {
        match DashboardReporter::new(&cfg.output_url) {
            Ok(dashboard) => {
                info!("Dashboard push: {}", cfg.output_url);
                reporter = reporter.with(dashboard);
            }
            Err(e) => warn!("Dashboard disabled: {}", e),
        }
    }

    let journal_dir = resolve_journal_dir(cfg.journal_dir.as_deref());
    let journal = match SessionJournal::open(journal_dir) {
        Ok(j) => j,
        Err(e) => {
            error!("Failed to initialize session journal: {}", e);
            std::process::exit(1);
        }
    };
    info!("Session journal path: {}", journal.dir().display());
    let (journal_reporter, journal_handle) = JournalReporter::spawn(journal);
    journal_reporter.record(
        "bot_start",
        json!({
            "mode": if cfg.test_mode { "test" } else { "live" },
            "api": cfg.active_api(),
            "locale": cfg.locale.as_str(),
            "fusion": {
                "exact_phrase_weight": cfg.fusion.exact_phrase_weight,
                "keyword_weight": cfg.fusion.keyword_weight,
                "answer_context_weight": cfg.fusion.answer_context_weight
            }
        }),
    );
    let reporter = reporter.with(journal_reporter.clone());

    // ── Discovery → session loop ─────────────────────────────────────
    let scheduler = ShowScheduler::new(
        rest_client,
        reporter.clone(),
        SchedulerPolicy::from_timing(&cfg.timing),
    );
    let heartbeat = Duration::from_secs(cfg.timing.heartbeat_secs);
    let reconnect_delay = Duration::from_secs(cfg.timing.reconnect_delay_secs);

    info!("🚀 Trivia Bot is running. Press Ctrl+C to stop.");

    let failure = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            None
        }
        e = run_sessions(&scheduler, &auth, &engine, &reporter, heartbeat, reconnect_delay) => Some(e),
    };
    drop(scheduler);

    let shutdown_reason = match &failure {
        Some(e) => {
            error!("❌ {}. Check the quiz API token.", e);
            reporter.notify(Notification::Ended {
                reason: Some(e.to_string()),
            });
            e.to_string()
        }
        None => "ctrl_c".to_string(),
    };
    journal_reporter.record("bot_shutdown", json!({ "reason": shutdown_reason }));

    // The writer drains once every sink clone is gone.
    drop(reporter);
    drop(journal_reporter);
    let _ = tokio::time::timeout(Duration::from_secs(2), journal_handle).await;

    info!("Trivia Bot shut down.");
    if failure.is_some() {
        std::process::exit(1);
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Discover, play, repeat. Returns only on a fatal error.
async fn run_sessions(
    scheduler: &ShowScheduler<QuizRestClient, FanoutReporter>,
    auth: &QuizAuth,
    engine: &Arc<PredictionEngine<SearchClient>>,
    reporter: &FanoutReporter,
    heartbeat: Duration,
    reconnect_delay: Duration,
) -> common::Error {
    loop {
        let address = match scheduler.find_live_address().await {
            Ok(a) => a,
            Err(e) => return e,
        };
        info!("📡 Broadcast live at {}", address);

        let connection = SessionConnection::new(&address, auth.clone(), heartbeat);
        match play(&connection, engine.clone(), reporter.clone()).await {
            Ok(end) => info!(
                "Session ended{}",
                end.reason.map(|r| format!(": {}", r)).unwrap_or_default()
            ),
            Err(e) if e.is_fatal() => return e,
            Err(e) => warn!("Session lost: {}", e),
        }
        sleep(reconnect_delay).await;
    }
}
