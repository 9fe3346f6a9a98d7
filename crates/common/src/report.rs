//! Stage notifications for the presentation sink.
//!
//! Every stage transition (waiting, starting, new round, analysis,
//! prediction, outcome, ended) produces one `Notification`. Sinks receive
//! them through `Reporter::notify`, which must never block the caller.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::types::{Prediction, Round, RoundOutcome};

/// Hit counts for one prediction method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MethodAccuracy {
    pub hits: u32,
    pub total: u32,
}

impl MethodAccuracy {
    pub fn record(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.hits += 1;
        }
    }

    /// Hit rate in percent; 0 before any round is scored.
    pub fn rate_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64 * 100.0
        }
    }
}

/// Cumulative accuracy for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccuracyReport {
    /// Exact phrase, keyword, answer context.
    pub per_method: Vec<MethodAccuracy>,
    pub fused: MethodAccuracy,
}

#[derive(Debug, Clone)]
pub enum Notification {
    Waiting {
        next_game: Option<DateTime<Utc>>,
        prize: Option<String>,
    },
    Starting,
    Round(Round),
    Analysis {
        round_index: u32,
        analysis: Value,
    },
    Prediction(Prediction),
    Outcome {
        outcome: RoundOutcome,
        predicted: Option<String>,
        accuracy: AccuracyReport,
    },
    Ended {
        reason: Option<String>,
    },
}

fn ordered_map<V: Into<Value> + Clone>(pairs: &[(String, V)]) -> Value {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert(k.clone(), v.clone().into());
    }
    Value::Object(map)
}

impl Notification {
    pub fn stage(&self) -> &'static str {
        match self {
            Notification::Waiting { .. } => "waiting",
            Notification::Starting => "starting",
            Notification::Round(_) => "round",
            Notification::Analysis { .. } => "analysis",
            Notification::Prediction(_) => "prediction",
            Notification::Outcome { .. } => "answers",
            Notification::Ended { .. } => "ended",
        }
    }

    /// Dashboard path for this stage.
    pub fn endpoint(&self) -> String {
        format!("/hero/{}", self.stage())
    }

    /// Dashboard payload for this stage.
    pub fn payload(&self) -> Value {
        match self {
            Notification::Waiting { next_game, prize } => json!({
                "prize": prize,
                "nextGame": next_game.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            }),
            Notification::Starting | Notification::Ended { .. } => json!({}),
            Notification::Round(round) => json!({
                "question": {
                    "question": round.question_text,
                    "choices": round.candidates,
                },
                "numRounds": round.total,
                "num": round.index,
            }),
            Notification::Analysis {
                round_index,
                analysis,
            } => json!({
                "analysis": analysis,
                "roundNum": round_index,
            }),
            Notification::Prediction(prediction) => json!({
                "prediction": {
                    "answers": ordered_map(&prediction.distribution),
                    "best": prediction.best,
                    "speed": (prediction.latency_secs * 100.0).round() / 100.0,
                },
                "roundNum": prediction.round_index,
            }),
            Notification::Outcome { outcome, .. } => json!({
                "conclusion": {
                    "answers": ordered_map(&outcome.counts),
                    "answer": outcome.correct_label,
                    "eliminated": outcome.eliminated_count,
                    "advancing": outcome.advancing_count,
                }
            }),
        }
    }
}

/// Best-effort, fire-and-forget notification sink.
///
/// Implementations must return without awaiting any I/O; slow or failing
/// delivery is never visible to the caller.
pub trait Reporter: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn notify(&self, _notification: Notification) {}
}
