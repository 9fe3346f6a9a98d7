//! Question analysis and answer prediction.
//!
//! `analyze` turns a question and its answer labels into `Evidence`;
//! `PredictionEngine` searches the web for both and fuses three counting
//! methods into one distribution; `session::play` drives a broadcast.

pub mod analysis;
pub mod engine;
pub mod locale;
pub mod scoring;
pub mod session;
pub mod tagger;

pub use analysis::{analyze, normalize_candidate, Candidate, Evidence};
pub use engine::PredictionEngine;
pub use locale::Locale;
pub use session::{play, AccuracyTracker, RoundDriver, SessionState};
pub use tagger::{LexiconTagger, PosTagger, Tag};
