//! Counting methods, polarity inversion, normalisation and fusion.
//!
//! All score vectors are aligned with `Evidence::candidates`.

use std::collections::BTreeMap;

use crate::analysis::{find_keywords, Candidate};
use crate::locale::Locale;

/// Whole-word occurrences of `phrase` in a space-padded text. An empty
/// phrase never matches.
pub fn count_phrase(text: &str, phrase: &str) -> usize {
    if phrase.trim().is_empty() {
        return 0;
    }
    let needle = format!(" {phrase} ");
    text.matches(needle.as_str()).count()
}

fn total_occurrences(texts: &[String], phrase: &str) -> usize {
    texts.iter().map(|t| count_phrase(t, phrase)).sum()
}

/// Exact-phrase method: occurrences of each candidate across question texts.
pub fn exact_phrase_counts(texts: &[String], candidates: &[Candidate]) -> Vec<f64> {
    candidates
        .iter()
        .map(|c| total_occurrences(texts, &c.normalized) as f64)
        .collect()
}

/// Keyword method: occurrences of each candidate's own keywords across
/// question texts.
pub fn keyword_counts(texts: &[String], candidates: &[Candidate], locale: &Locale) -> Vec<f64> {
    candidates
        .iter()
        .map(|c| {
            let mut keywords = find_keywords(&c.normalized, locale);
            keywords.sort();
            keywords.dedup();
            keywords
                .iter()
                .map(|k| total_occurrences(texts, k))
                .sum::<usize>() as f64
        })
        .collect()
}

/// Answer-context method: question keywords and key nouns found in each
/// candidate's own result pages. A word counted once per page even when
/// it is both a keyword and a noun.
pub fn answer_context_scores(
    answer_texts: &[Vec<String>],
    keywords: &[&str],
    key_nouns: &[&str],
    keyword_share: f64,
) -> Vec<f64> {
    // word -> (is keyword, is noun)
    let mut words: BTreeMap<&str, (bool, bool)> = BTreeMap::new();
    for k in keywords {
        words.entry(*k).or_default().0 = true;
    }
    for n in key_nouns {
        words.entry(*n).or_default().1 = true;
    }

    answer_texts
        .iter()
        .map(|texts| {
            let (mut keyword_score, mut noun_score) = (0usize, 0usize);
            for text in texts {
                for (word, (is_keyword, is_noun)) in &words {
                    let hits = count_phrase(text, word);
                    if *is_keyword {
                        keyword_score += hits;
                    }
                    if *is_noun {
                        noun_score += hits;
                    }
                }
            }
            keyword_score as f64 * keyword_share + noun_score as f64 * (1.0 - keyword_share)
        })
        .collect()
}

/// Invert for opposite questions, then normalise to sum to 1. An all-zero
/// vector passes through unchanged.
pub fn to_probabilities(mut scores: Vec<f64>, opposite: bool, zero_score: f64) -> Vec<f64> {
    if opposite {
        for s in scores.iter_mut() {
            *s = if *s > 0.0 { 1.0 / *s } else { zero_score };
        }
    }
    normalize(scores)
}

fn normalize(scores: Vec<f64>) -> Vec<f64> {
    let sum: f64 = scores.iter().sum();
    if sum == 0.0 {
        return scores;
    }
    scores.into_iter().map(|s| s / sum).collect()
}

/// Weighted sum of per-method distributions, renormalised. Uniform when
/// nothing scored.
pub fn fuse(methods: &[Vec<f64>], weights: &[f64]) -> Vec<f64> {
    let n = methods.first().map_or(0, Vec::len);
    let combined: Vec<f64> = (0..n)
        .map(|i| {
            methods
                .iter()
                .zip(weights)
                .map(|(m, w)| m.get(i).copied().unwrap_or(0.0) * w)
                .sum()
        })
        .collect();

    if combined.iter().sum::<f64>() == 0.0 {
        return vec![1.0 / n as f64; n];
    }
    normalize(combined)
}

/// Index of the highest score; the first wins ties.
pub fn argmax(scores: &[f64]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}
