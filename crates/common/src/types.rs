//! Domain and wire types shared across the bot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error string the quiz API uses for a rejected bearer token.
pub const AUTH_NOT_VALID: &str = "Auth not valid";

/// Transliterate to the closest ASCII so question text compares against
/// search-result text (typographic quotes, diacritics).
pub fn transliterate(text: &str) -> String {
    deunicode::deunicode(text)
}

// ── Schedule ──────────────────────────────────────────────────────────

/// Response body of GET /shows/now.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowsNowResponse {
    #[serde(default)]
    pub broadcast: Option<BroadcastInfo>,
    #[serde(default)]
    pub next_show_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_show_prize: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastInfo {
    pub socket_url: String,
}

/// One poll's view of the show schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowSchedule {
    pub next_show_time: Option<DateTime<Utc>>,
    pub next_show_prize: Option<String>,
    /// Present exactly when a broadcast is live.
    pub live_address: Option<String>,
}

impl ShowsNowResponse {
    pub fn is_auth_invalid(&self) -> bool {
        self.error.as_deref() == Some(AUTH_NOT_VALID)
    }

    pub fn into_schedule(self) -> ShowSchedule {
        ShowSchedule {
            next_show_time: self.next_show_time,
            next_show_prize: self.next_show_prize,
            live_address: self.broadcast.map(|b| socket_address(&b.socket_url)),
        }
    }
}

/// Rewrite an HTTP(S) broadcast URL into its WebSocket form.
pub fn socket_address(url: &str) -> String {
    let trimmed = url.trim();
    if let Some(rest) = trimmed.strip_prefix("https") {
        format!("wss{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http") {
        format!("ws{rest}")
    } else {
        trimmed.to_string()
    }
}

// ── Live event frames ─────────────────────────────────────────────────

/// A decoded live-event frame, tagged by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RoundEvent {
    Question(QuestionFrame),
    QuestionSummary(SummaryFrame),
    /// Chat and social noise.
    Interaction,
    BroadcastEnded(EndedFrame),
    #[serde(other)]
    Unknown,
}

impl RoundEvent {
    /// Whether this event terminates the stream.
    pub fn is_ended(&self) -> bool {
        matches!(self, RoundEvent::BroadcastEnded(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RoundEvent::Question(_) => "question",
            RoundEvent::QuestionSummary(_) => "questionSummary",
            RoundEvent::Interaction => "interaction",
            RoundEvent::BroadcastEnded(_) => "broadcastEnded",
            RoundEvent::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFrame {
    pub question: String,
    #[serde(default)]
    pub answers: Vec<AnswerChoice>,
    pub question_number: u32,
    pub question_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerChoice {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryFrame {
    #[serde(default)]
    pub answer_counts: Vec<AnswerCount>,
    #[serde(default)]
    pub advancing_players_count: u64,
    #[serde(default)]
    pub eliminated_players_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerCount {
    pub answer: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub correct: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndedFrame {
    /// Set when the broadcast ended irregularly.
    #[serde(default)]
    pub reason: Option<String>,
}

// ── Rounds ────────────────────────────────────────────────────────────

/// One question within a broadcast. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    pub index: u32,
    pub total: u32,
    pub question_text: String,
    /// Answer labels in the order the show sent them; may contain duplicates.
    pub candidates: Vec<String>,
}

impl From<&QuestionFrame> for Round {
    fn from(frame: &QuestionFrame) -> Self {
        Self {
            index: frame.question_number,
            total: frame.question_count,
            question_text: transliterate(&frame.question),
            candidates: frame.answers.iter().map(|a| transliterate(&a.text)).collect(),
        }
    }
}

/// Result of a round, used only for accuracy tracking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundOutcome {
    /// Player counts per answer label, in the order the show sent them.
    pub counts: Vec<(String, u64)>,
    pub correct_label: String,
    pub eliminated_count: u64,
    pub advancing_count: u64,
}

impl From<&SummaryFrame> for RoundOutcome {
    fn from(frame: &SummaryFrame) -> Self {
        let mut correct_label = String::new();
        let counts = frame
            .answer_counts
            .iter()
            .map(|a| {
                let label = transliterate(&a.answer);
                if a.correct {
                    correct_label = label.clone();
                }
                (label, a.count)
            })
            .collect();

        Self {
            counts,
            correct_label,
            eliminated_count: frame.eliminated_players_count,
            advancing_count: frame.advancing_players_count,
        }
    }
}

// ── Predictions ───────────────────────────────────────────────────────

/// Fused answer distribution for one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Round this prediction was computed for.
    pub round_index: u32,
    /// Probability per original answer label, in insertion order.
    pub distribution: Vec<(String, f64)>,
    /// Label with the highest fused probability (first wins ties).
    pub best: String,
    /// Top pick of each unfused method: exact phrase, keyword, answer context.
    pub per_method_best: Vec<String>,
    /// Normalised per-method scores keyed by original label.
    pub per_method: Vec<Vec<(String, f64)>>,
    pub latency_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_without_broadcast() {
        let raw = r#"{"broadcast": null, "nextShowTime": "2018-06-20T00:55:00.000Z", "nextShowPrize": "$5,000", "error": null}"#;
        let resp: ShowsNowResponse = serde_json::from_str(raw).unwrap();
        assert!(!resp.is_auth_invalid());
        let schedule = resp.into_schedule();
        assert!(schedule.live_address.is_none());
        assert_eq!(schedule.next_show_prize.as_deref(), Some("$5,000"));
        assert!(schedule.next_show_time.is_some());
    }

    #[test]
    fn test_schedule_with_broadcast_rewrites_scheme() {
        let raw = r#"{"broadcast": {"socketUrl": "https://ws.example.com/ws/123"}}"#;
        let resp: ShowsNowResponse = serde_json::from_str(raw).unwrap();
        let schedule = resp.into_schedule();
        assert_eq!(schedule.live_address.as_deref(), Some("wss://ws.example.com/ws/123"));
    }

    #[test]
    fn test_auth_error_detected() {
        let resp: ShowsNowResponse = serde_json::from_str(r#"{"error": "Auth not valid"}"#).unwrap();
        assert!(resp.is_auth_invalid());
    }

    #[test]
    fn test_socket_address_plain_http() {
        assert_eq!(socket_address("http://localhost:8765"), "ws://localhost:8765");
        assert_eq!(socket_address("ws://localhost:8765"), "ws://localhost:8765");
    }

    #[test]
    fn test_decode_question_frame() {
        let raw = r#"{"type":"question","question":"Which colour is NOT in the Italian flag?",
            "answers":[{"answerId":1,"text":"Green"},{"text":"Red"},{"text":"Blue"}],
            "questionNumber":3,"questionCount":12,"ts":"2018-06-19T14:11:02.525Z"}"#;
        let event: RoundEvent = serde_json::from_str(raw).unwrap();
        let RoundEvent::Question(frame) = event else {
            panic!("expected question");
        };
        let round = Round::from(&frame);
        assert_eq!(round.index, 3);
        assert_eq!(round.total, 12);
        assert_eq!(round.candidates, vec!["Green", "Red", "Blue"]);
    }

    #[test]
    fn test_decode_summary_frame() {
        let raw = r#"{"type":"questionSummary","answerCounts":[
            {"answer":"Green","count":10,"correct":false},
            {"answer":"Blue","count":90,"correct":true}],
            "advancingPlayersCount":90,"eliminatedPlayersCount":10}"#;
        let event: RoundEvent = serde_json::from_str(raw).unwrap();
        let RoundEvent::QuestionSummary(frame) = event else {
            panic!("expected summary");
        };
        let outcome = RoundOutcome::from(&frame);
        assert_eq!(outcome.correct_label, "Blue");
        assert_eq!(outcome.counts[0], ("Green".to_string(), 10));
        assert_eq!(outcome.advancing_count, 90);
        assert_eq!(outcome.eliminated_count, 10);
    }

    #[test]
    fn test_decode_other_kinds() {
        let interaction: RoundEvent = serde_json::from_str(
            r#"{"type":"interaction","itemId":"chat","metadata":{"message":"hi"}}"#,
        )
        .unwrap();
        assert!(matches!(interaction, RoundEvent::Interaction));

        let unknown: RoundEvent =
            serde_json::from_str(r#"{"type":"broadcastStats","viewers":100}"#).unwrap();
        assert!(matches!(unknown, RoundEvent::Unknown));
        assert!(!unknown.is_ended());

        let ended: RoundEvent = serde_json::from_str(r#"{"type":"broadcastEnded"}"#).unwrap();
        assert!(ended.is_ended());
        let RoundEvent::BroadcastEnded(frame) = ended else {
            panic!("expected ended");
        };
        assert!(frame.reason.is_none());
    }

    #[test]
    fn test_question_text_transliterated() {
        let frame = QuestionFrame {
            question: "Which of these is a “Café” in Zürich?".into(),
            answers: vec![AnswerChoice { text: "Crème brûlée".into() }],
            question_number: 1,
            question_count: 12,
        };
        let round = Round::from(&frame);
        assert_eq!(round.question_text, "Which of these is a \"Cafe\" in Zurich?");
        assert_eq!(round.candidates[0], "Creme brulee");
    }
}
