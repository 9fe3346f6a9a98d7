//! Question analysis: candidate normalisation, polarity, keywords, key nouns.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::locale::Locale;

/// Characters treated as punctuation in candidates and page text.
pub const PUNCTUATION: &str = "!\"#$%&'()*+,-.:;<=>?@[\\]^_`{|}~\u{FFFD}\u{201C}\u{201D}";

/// Stands in for a quoted phrase while the question is tokenised.
const QUOTE_PLACEHOLDER: &str = "1placeholder1";

/// Window of tagged tokens searched for nouns.
const NOUN_WINDOW: usize = 5;

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(c)
}

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").expect("static word pattern"))
}

fn quote_pattern() -> &'static Regex {
    static QUOTE: OnceLock<Regex> = OnceLock::new();
    QUOTE.get_or_init(|| Regex::new(r#""([^"]*)""#).expect("static quote pattern"))
}

fn capitalised_run_pattern() -> &'static Regex {
    static RUN: OnceLock<Regex> = OnceLock::new();
    RUN.get_or_init(|| {
        Regex::new(r"[A-Z][a-z]+(?:\s[A-Z][a-z]+)+").expect("static capitalised-run pattern")
    })
}

/// One distinct answer, keyed by its normalised form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub normalized: String,
    /// First label seen with this normalised form.
    pub original: String,
}

/// Everything derived from a question before any search runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub question: String,
    pub is_opposite: bool,
    /// Question keywords in question order; quoted phrases kept whole.
    pub keywords: Vec<String>,
    pub key_nouns: BTreeSet<String>,
    /// Deduplicated candidates in first-seen order.
    pub candidates: Vec<Candidate>,
}

impl Evidence {
    /// Keywords with repeats removed, first occurrence kept.
    pub fn unique_keywords(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.keywords
            .iter()
            .map(String::as_str)
            .filter(|k| seen.insert(*k))
            .collect()
    }

    pub fn search_query(&self) -> String {
        self.keywords.join(" ")
    }

    /// Payload for the analysis stage notification.
    pub fn report(&self) -> Value {
        json!({
            "nouns": self.key_nouns.iter().collect::<Vec<_>>(),
            "keywords": self.keywords,
            "opposite": self.is_opposite,
            "parsedAnswers": self.candidates.iter().map(|c| &c.normalized).collect::<Vec<_>>(),
        })
    }
}

/// Straighten typographic quotes so quoted phrases are found.
fn fix_quotes(text: &str) -> String {
    text.replace(['\u{201C}', '\u{201D}'], "\"")
}

/// Lowercase, punctuation-free form of an answer label.
pub fn normalize_candidate(label: &str) -> String {
    let mapped: String = label
        .replace("'s ", "s ")
        .chars()
        .map(|c| if is_punctuation(c) { ' ' } else { c })
        .collect();
    mapped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word tokens of `text` that are not stopwords, lowercased, in order.
pub fn find_keywords(text: &str, locale: &Locale) -> Vec<String> {
    let lower = text.to_lowercase();
    word_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !locale.is_stopword(w))
        .map(str::to_string)
        .collect()
}

fn normalize_candidates(labels: &[String]) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    labels
        .iter()
        .filter_map(|label| {
            let normalized = normalize_candidate(label);
            seen.insert(normalized.clone()).then(|| Candidate {
                normalized,
                original: label.clone(),
            })
        })
        .collect()
}

fn quoted_phrases(question_lower: &str) -> Vec<String> {
    quote_pattern()
        .captures_iter(question_lower)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|q| !q.is_empty())
        .collect()
}

fn extract_keywords(question_lower: &str, quotes: &[String], locale: &Locale) -> Vec<String> {
    let without_quotes = quote_pattern().replace_all(question_lower, |c: &regex::Captures| {
        if c[1].trim().is_empty() {
            " ".to_string()
        } else {
            format!(" {QUOTE_PLACEHOLDER} ")
        }
    });

    let mut quotes = quotes.iter();
    find_keywords(&without_quotes, locale)
        .into_iter()
        .map(|k| {
            if k == QUOTE_PLACEHOLDER {
                quotes.next().cloned().unwrap_or(k)
            } else {
                k
            }
        })
        .collect()
}

/// Byte offset of the earliest whole-word question word, and the word.
fn question_word_location(question_lower: &str, locale: &Locale) -> Option<(usize, String)> {
    word_pattern()
        .find_iter(question_lower)
        .find(|m| locale.question_words().contains(&m.as_str()))
        .map(|m| (m.start(), m.as_str().to_string()))
}

/// Maximal runs of noun-tagged tokens within the window, joined by spaces.
fn find_nouns(question: &str, locale: &Locale, from_end: bool) -> Vec<String> {
    let tagged = locale.tagger().tag(question);
    let window = if from_end {
        &tagged[tagged.len().saturating_sub(NOUN_WINDOW)..]
    } else {
        &tagged[..tagged.len().min(NOUN_WINDOW)]
    };

    let mut nouns = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    for (word, tag) in window {
        if tag.is_noun() {
            run.push(word);
        } else if !run.is_empty() {
            nouns.push(run.join(" "));
            run.clear();
        }
    }
    if !run.is_empty() {
        nouns.push(run.join(" "));
    }
    nouns
}

/// Runs of two or more capitalised words, skipping the question word itself.
fn capitalised_runs(question: &str, question_word: Option<&str>) -> Vec<String> {
    let mut skipped = false;
    let words: Vec<&str> = question
        .split(' ')
        .filter(|w| {
            let bare = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if !skipped && Some(bare.as_str()) == question_word {
                skipped = true;
                return false;
            }
            true
        })
        .collect();
    let joined = words.join(" ");
    capitalised_run_pattern()
        .find_iter(&joined)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn extract_key_nouns(question: &str, quotes: &[String], locale: &Locale) -> BTreeSet<String> {
    let question_lower = question.to_lowercase();
    let location = question_word_location(&question_lower, locale);

    let mut nouns: BTreeSet<String> = quotes.iter().cloned().collect();
    if nouns.is_empty() {
        // Question word late in the text: the subject is at the front.
        let from_end = !location
            .as_ref()
            .is_some_and(|(at, _)| *at > question.len() / 2);
        nouns.extend(
            find_nouns(question, locale, from_end)
                .into_iter()
                .filter(|n| !n.eq_ignore_ascii_case("type")),
        );
    }

    let question_word = location.as_ref().map(|(_, w)| w.as_str());
    nouns.extend(capitalised_runs(question, question_word));

    nouns.into_iter().map(|n| n.to_lowercase()).collect()
}

/// Analyse one question against its answer labels.
pub fn analyze(question: &str, candidates: &[String], locale: &Locale) -> Evidence {
    let question = fix_quotes(question);
    let question_lower = question.to_lowercase();
    let quotes = quoted_phrases(&question_lower);

    Evidence {
        is_opposite: locale.is_opposite(&question),
        keywords: extract_keywords(&question_lower, &quotes, locale),
        key_nouns: extract_key_nouns(&question, &quotes, locale),
        candidates: normalize_candidates(candidates),
        question,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::LocaleId;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_italian_flag_question() {
        let locale = Locale::new(LocaleId::EnglishUk);
        let ev = analyze(
            "Which colour is NOT in the Italian flag?",
            &labels(&["Green", "Red", "Blue"]),
            &locale,
        );

        assert!(ev.is_opposite);
        assert_eq!(ev.keywords, vec!["colour", "italian", "flag"]);
        for stop in ["which", "in", "the"] {
            assert!(!ev.keywords.iter().any(|k| k == stop));
        }
        let pairs: Vec<(&str, &str)> = ev
            .candidates
            .iter()
            .map(|c| (c.normalized.as_str(), c.original.as_str()))
            .collect();
        assert_eq!(pairs, vec![("green", "Green"), ("red", "Red"), ("blue", "Blue")]);
        assert!(ev.key_nouns.contains("italian flag"));
    }

    #[test]
    fn test_candidates_dedup_by_normalised_form() {
        let ev = analyze(
            "Who is it?",
            &labels(&["St. John's Wood", "st johns wood", "Mc-Donald", "mc donald!"]),
            &Locale::default(),
        );
        assert_eq!(ev.candidates.len(), 2);
        assert_eq!(ev.candidates[0].normalized, "st johns wood");
        assert_eq!(ev.candidates[0].original, "St. John's Wood");
        assert_eq!(ev.candidates[1].normalized, "mc donald");
        assert_eq!(ev.candidates[1].original, "Mc-Donald");
    }

    #[test]
    fn test_quoted_phrase_kept_whole() {
        let ev = analyze(
            "Which band released the album \"Dark Side of the Moon\" in 1973?",
            &labels(&["Pink Floyd", "Queen"]),
            &Locale::default(),
        );
        assert_eq!(
            ev.keywords,
            vec!["band", "released", "album", "dark side of the moon", "1973"]
        );
        assert!(ev.key_nouns.contains("dark side of the moon"));
    }

    #[test]
    fn test_typographic_quotes_are_recognised() {
        let ev = analyze(
            "What does \u{201C}carpe diem\u{201D} mean?",
            &labels(&["Seize the day"]),
            &Locale::default(),
        );
        assert!(ev.keywords.contains(&"carpe diem".to_string()));
    }

    #[test]
    fn test_capitalised_runs_skip_question_word() {
        let nouns = capitalised_runs("Which New York borough is largest?", Some("which"));
        assert_eq!(nouns, vec!["New York"]);

        let nouns = capitalised_runs("Which Borough hosts Central Park?", Some("which"));
        assert_eq!(nouns, vec!["Central Park"]);
    }

    #[test]
    fn test_noun_window_picks_front_when_question_word_is_late() {
        let locale = Locale::default();
        let ev = analyze(
            "The Eiffel Tower is located in which city?",
            &labels(&["Paris", "Lyon"]),
            &locale,
        );
        // Question word sits past the midpoint: first five tokens.
        assert!(ev.key_nouns.contains("eiffel tower"));
        assert!(!ev.key_nouns.contains("city"));
    }

    #[test]
    fn test_type_is_never_a_key_noun() {
        let ev = analyze(
            "What type of animal is a dolphin?",
            &labels(&["Mammal", "Fish"]),
            &Locale::default(),
        );
        assert!(!ev.key_nouns.contains("type"));
        assert!(ev.key_nouns.contains("dolphin"));
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let locale = Locale::default();
        let q = "Which of these is NOT a \"Beatles\" song?";
        let c = labels(&["Yesterday", "Help!", "Angie"]);
        assert_eq!(analyze(q, &c, &locale), analyze(q, &c, &locale));
    }

    #[test]
    fn test_report_shape() {
        let ev = analyze("Which colour is NOT in the Italian flag?", &labels(&["Green"]), &Locale::default());
        let report = ev.report();
        assert_eq!(report["opposite"], true);
        assert_eq!(report["parsedAnswers"], json!(["green"]));
        assert_eq!(report["keywords"], json!(["colour", "italian", "flag"]));
        assert!(report["nouns"].is_array());
    }

    #[test]
    fn test_unique_keywords_keep_first_occurrence() {
        let ev = analyze("Which flag flag colour flag?", &labels(&["Red"]), &Locale::default());
        assert_eq!(ev.unique_keywords(), vec!["flag", "colour"]);
    }
}
