//! Per-broadcast round driving: analysis, prediction, staleness guard,
//! accuracy tracking.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use common::{
    AccuracyReport, Error, MethodAccuracy, Notification, Prediction, QuestionFrame, Reporter,
    Round, RoundEvent, RoundOutcome, SummaryFrame,
};
use quiz_client::{RoundHandler, SessionConnection, SessionEnd};
use search_client::WebSearch;
use tracing::{debug, info};

use crate::analysis::{analyze, normalize_candidate};
use crate::engine::PredictionEngine;

/// Hit counts per method and for the fused pick.
#[derive(Debug, Clone, Default)]
pub struct AccuracyTracker {
    per_method: [MethodAccuracy; 3],
    fused: MethodAccuracy,
}

impl AccuracyTracker {
    pub fn record(&mut self, prediction: &Prediction, correct_label: &str) {
        let correct = normalize_candidate(correct_label);
        let hit = |label: &str| normalize_candidate(label) == correct;

        for (acc, pick) in self.per_method.iter_mut().zip(&prediction.per_method_best) {
            acc.record(hit(pick));
        }
        self.fused.record(hit(&prediction.best));
    }

    pub fn report(&self) -> AccuracyReport {
        AccuracyReport {
            per_method: self.per_method.to_vec(),
            fused: self.fused,
        }
    }
}

#[derive(Debug, Default)]
struct RoundCursor {
    current: u32,
    closed: bool,
}

/// State shared by every round task of one session.
#[derive(Debug, Default)]
pub struct SessionState {
    cursor: Mutex<RoundCursor>,
    last_prediction: Mutex<Option<Prediction>>,
    accuracy: Mutex<AccuracyTracker>,
}

impl SessionState {
    fn cursor(&self) -> MutexGuard<'_, RoundCursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `index` as the round in progress; never moves backwards.
    pub fn begin_round(&self, index: u32) {
        let mut cursor = self.cursor();
        cursor.current = cursor.current.max(index);
    }

    /// Whether output computed for `index` may still be surfaced.
    pub fn is_current(&self, index: u32) -> bool {
        let cursor = self.cursor();
        !cursor.closed && cursor.current == index
    }

    /// Run `emit` only if `index` is still the current round, holding the
    /// round lock so no newer round can begin in between. `emit` must not
    /// block.
    pub fn emit_if_current(&self, index: u32, emit: impl FnOnce()) -> bool {
        let cursor = self.cursor();
        if cursor.closed || cursor.current != index {
            return false;
        }
        emit();
        true
    }

    /// The stream ended; nothing in flight may report any more.
    pub fn close(&self) {
        self.cursor().closed = true;
    }

    pub fn store_prediction(&self, prediction: Prediction) {
        if let Ok(mut slot) = self.last_prediction.lock() {
            *slot = Some(prediction);
        }
    }

    /// Score the current round's prediction, if any, against its outcome.
    pub fn record_outcome(&self, outcome: &RoundOutcome) -> (Option<String>, AccuracyReport) {
        let current = self.cursor().current;
        let prediction = self
            .last_prediction
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .filter(|p| p.round_index == current);

        let Ok(mut accuracy) = self.accuracy.lock() else {
            return (None, AccuracyReport::default());
        };
        if let Some(p) = &prediction {
            if !outcome.correct_label.is_empty() {
                accuracy.record(p, &outcome.correct_label);
            }
        }
        (prediction.map(|p| p.best), accuracy.report())
    }
}

/// Handles the round events of one session.
pub struct RoundDriver<S, R> {
    engine: Arc<PredictionEngine<S>>,
    reporter: R,
    state: Arc<SessionState>,
}

impl<S, R> RoundDriver<S, R>
where
    S: WebSearch + 'static,
    R: Reporter + 'static,
{
    pub fn new(engine: Arc<PredictionEngine<S>>, reporter: R, state: Arc<SessionState>) -> Self {
        Self {
            engine,
            reporter,
            state,
        }
    }

    async fn on_question(&self, frame: &QuestionFrame) {
        let round = Round::from(frame);
        let index = round.index;
        self.state.begin_round(index);
        info!(
            "❓ Question {}/{}: {} {:?}",
            round.index, round.total, round.question_text, round.candidates
        );
        self.reporter.notify(Notification::Round(round.clone()));

        let evidence = analyze(&round.question_text, &round.candidates, self.engine.locale());
        debug!("Analysis: {}", evidence.report());
        self.state.emit_if_current(index, || {
            self.reporter.notify(Notification::Analysis {
                round_index: index,
                analysis: evidence.report(),
            })
        });

        let prediction = self.engine.predict(index, &evidence).await;

        let emitted = self.state.emit_if_current(index, || {
            info!(
                "🎯 Round {} prediction: {} ({:.2}s) {:?}",
                index, prediction.best, prediction.latency_secs, prediction.distribution
            );
            self.reporter.notify(Notification::Prediction(prediction.clone()));
        });
        if emitted {
            self.state.store_prediction(prediction);
        } else {
            info!("Discarding stale prediction for round {}", index);
        }
    }

    fn on_summary(&self, frame: &SummaryFrame) {
        let outcome = RoundOutcome::from(frame);
        let (predicted, accuracy) = self.state.record_outcome(&outcome);
        info!(
            "✅ Answer: {} (predicted {}), fused accuracy {:.0}%",
            outcome.correct_label,
            predicted.as_deref().unwrap_or("nothing"),
            accuracy.fused.rate_pct()
        );
        self.reporter.notify(Notification::Outcome {
            outcome,
            predicted,
            accuracy,
        });
    }
}

#[async_trait]
impl<S, R> RoundHandler for RoundDriver<S, R>
where
    S: WebSearch + 'static,
    R: Reporter + 'static,
{
    async fn handle(&self, event: RoundEvent) {
        match event {
            RoundEvent::Question(frame) => self.on_question(&frame).await,
            RoundEvent::QuestionSummary(frame) => self.on_summary(&frame),
            _ => {}
        }
    }
}

/// Drive one broadcast from connect to end.
///
/// Rounds still predicting when the stream ends are left to finish but
/// report nothing.
pub async fn play<S, R>(
    connection: &SessionConnection,
    engine: Arc<PredictionEngine<S>>,
    reporter: R,
) -> Result<SessionEnd, Error>
where
    S: WebSearch + 'static,
    R: Reporter + Clone + 'static,
{
    let state = Arc::new(SessionState::default());
    reporter.notify(Notification::Starting);

    let driver = Arc::new(RoundDriver::new(engine, reporter.clone(), state.clone()));
    let result = connection.run(driver).await;
    state.close();

    match &result {
        Ok(end) => reporter.notify(Notification::Ended {
            reason: end.reason.clone(),
        }),
        Err(e) if !e.is_fatal() => reporter.notify(Notification::Ended {
            reason: Some(e.to_string()),
        }),
        Err(_) => {}
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use common::config::{FusionConfig, SearchConfig};
    use common::AnswerChoice;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Search that blocks until released, so round tasks can overlap.
    #[derive(Default)]
    struct GatedSearch {
        gate: Notify,
    }

    #[async_trait]
    impl WebSearch for GatedSearch {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>, Error> {
            self.gate.notified().await;
            Ok(Vec::new())
        }

        async fn fetch_and_clean(&self, urls: &[String], _timeout: Duration) -> Vec<String> {
            vec![String::new(); urls.len()]
        }
    }

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<Notification>>,
    }

    impl Reporter for Collect {
        fn notify(&self, notification: Notification) {
            self.seen.lock().unwrap().push(notification);
        }
    }

    impl Collect {
        fn predictions(&self) -> Vec<u32> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match n {
                    Notification::Prediction(p) => Some(p.round_index),
                    _ => None,
                })
                .collect()
        }
    }

    fn question(index: u32) -> QuestionFrame {
        QuestionFrame {
            question: format!("Which answer is right for question {index}?"),
            answers: ["Alpha", "Beta", "Gamma"]
                .iter()
                .map(|t| AnswerChoice { text: t.to_string() })
                .collect(),
            question_number: index,
            question_count: 12,
        }
    }

    fn driver(
        search: Arc<GatedSearch>,
    ) -> (Arc<RoundDriver<GatedSearch, Arc<Collect>>>, Arc<Collect>, Arc<SessionState>) {
        let engine = Arc::new(PredictionEngine::new(
            search,
            Arc::new(Locale::default()),
            &SearchConfig::default(),
            FusionConfig::default(),
        ));
        let reporter = Arc::new(Collect::default());
        let state = Arc::new(SessionState::default());
        let driver = Arc::new(RoundDriver::new(engine, reporter.clone(), state.clone()));
        (driver, reporter, state)
    }

    fn prediction(round_index: u32, best: &str, per_method: [&str; 3]) -> Prediction {
        Prediction {
            round_index,
            distribution: Vec::new(),
            best: best.to_string(),
            per_method_best: per_method.iter().map(|s| s.to_string()).collect(),
            per_method: Vec::new(),
            latency_secs: 0.1,
        }
    }

    #[tokio::test]
    async fn test_stale_prediction_is_discarded() {
        let search = Arc::new(GatedSearch::default());
        let (driver, reporter, _) = driver(search.clone());

        let first = {
            let d = driver.clone();
            tokio::spawn(async move { d.handle(RoundEvent::Question(question(1))).await })
        };
        tokio::task::yield_now().await;
        let second = {
            let d = driver.clone();
            tokio::spawn(async move { d.handle(RoundEvent::Question(question(2))).await })
        };
        tokio::task::yield_now().await;

        // Release every pending search until both rounds finish.
        while !(first.is_finished() && second.is_finished()) {
            search.gate.notify_waiters();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(reporter.predictions(), vec![2]);
    }

    #[tokio::test]
    async fn test_closed_session_reports_nothing() {
        let search = Arc::new(GatedSearch::default());
        let (driver, reporter, state) = driver(search.clone());

        let task = {
            let d = driver.clone();
            tokio::spawn(async move { d.handle(RoundEvent::Question(question(5))).await })
        };
        tokio::task::yield_now().await;
        state.close();
        while !task.is_finished() {
            search.gate.notify_waiters();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(reporter.predictions().is_empty());
    }

    /// Search that answers at once, so rounds race on real worker threads.
    struct InstantSearch;

    #[async_trait]
    impl WebSearch for InstantSearch {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>, Error> {
            Ok(vec!["https://a.example/1".into()])
        }

        async fn fetch_and_clean(&self, urls: &[String], _timeout: Duration) -> Vec<String> {
            vec!["alpha beta gamma".to_string(); urls.len()]
        }
    }

    /// (stage, round) in the order sinks observed them.
    #[derive(Default)]
    struct OrderLog {
        seen: Mutex<Vec<(&'static str, u32)>>,
    }

    impl Reporter for OrderLog {
        fn notify(&self, notification: Notification) {
            let round = match &notification {
                Notification::Round(r) => r.index,
                Notification::Analysis { round_index, .. } => *round_index,
                Notification::Prediction(p) => p.round_index,
                _ => return,
            };
            self.seen.lock().unwrap().push((notification.stage(), round));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_output_for_a_round_after_a_newer_round_began() {
        let engine = Arc::new(PredictionEngine::new(
            Arc::new(InstantSearch),
            Arc::new(Locale::default()),
            &SearchConfig::default(),
            FusionConfig::default(),
        ));

        for _ in 0..500 {
            let log = Arc::new(OrderLog::default());
            let state = Arc::new(SessionState::default());
            let driver = Arc::new(RoundDriver::new(engine.clone(), log.clone(), state));

            let tasks: Vec<_> = [1u32, 2]
                .into_iter()
                .map(|index| {
                    let d = driver.clone();
                    tokio::spawn(async move { d.handle(RoundEvent::Question(question(index))).await })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            // Round(N) is announced after round N began, so nothing for an
            // older round may follow it.
            let mut newest = 0;
            for (stage, round) in log.seen.lock().unwrap().iter() {
                if *stage == "round" {
                    newest = newest.max(*round);
                } else {
                    assert!(*round >= newest, "{stage} for round {round} after round {newest} began");
                }
            }
        }
    }

    #[test]
    fn test_emit_if_current_respects_round_and_close() {
        let state = SessionState::default();
        state.begin_round(1);
        assert!(state.emit_if_current(1, || {}));
        state.begin_round(2);
        let mut ran = false;
        assert!(!state.emit_if_current(1, || ran = true));
        assert!(!ran);
        state.close();
        assert!(!state.emit_if_current(2, || {}));
    }

    #[test]
    fn test_round_index_never_moves_backwards() {
        let state = SessionState::default();
        state.begin_round(3);
        state.begin_round(2);
        assert!(state.is_current(3));
        assert!(!state.is_current(2));
    }

    #[test]
    fn test_accuracy_counts_each_method() {
        let state = SessionState::default();
        state.begin_round(1);
        state.store_prediction(prediction(1, "Blue", ["Blue", "Red", "Blue"]));

        let outcome = RoundOutcome {
            counts: vec![("Blue".into(), 80), ("Red".into(), 20)],
            correct_label: "Blue".into(),
            eliminated_count: 20,
            advancing_count: 80,
        };
        let (predicted, report) = state.record_outcome(&outcome);

        assert_eq!(predicted.as_deref(), Some("Blue"));
        assert_eq!(report.fused, MethodAccuracy { hits: 1, total: 1 });
        assert_eq!(report.per_method[0], MethodAccuracy { hits: 1, total: 1 });
        assert_eq!(report.per_method[1], MethodAccuracy { hits: 0, total: 1 });
    }

    #[test]
    fn test_outcome_without_current_prediction_is_not_scored() {
        let state = SessionState::default();
        state.begin_round(1);
        state.store_prediction(prediction(1, "Blue", ["Blue", "Blue", "Blue"]));
        state.begin_round(2);

        let outcome = RoundOutcome {
            counts: Vec::new(),
            correct_label: "Blue".into(),
            eliminated_count: 0,
            advancing_count: 0,
        };
        let (predicted, report) = state.record_outcome(&outcome);
        assert!(predicted.is_none());
        assert_eq!(report.fused.total, 0);
    }
}
