//! Evidence gathering and fusion for one round.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::config::{FusionConfig, SearchConfig};
use common::Prediction;
use search_client::WebSearch;
use tracing::{debug, info, warn};

use crate::analysis::{is_punctuation, Evidence};
use crate::locale::Locale;
use crate::scoring;

/// Page text ready for whole-word counting: punctuation removed,
/// whitespace collapsed, padded with one space on each side.
pub fn prepare_page_text(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !is_punctuation(*c)).collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(" {collapsed} ")
}

pub struct PredictionEngine<S> {
    search: Arc<S>,
    locale: Arc<Locale>,
    results_per_query: usize,
    fetch_timeout: Duration,
    budget: Duration,
    fusion: FusionConfig,
}

impl<S: WebSearch> PredictionEngine<S> {
    pub fn new(
        search: Arc<S>,
        locale: Arc<Locale>,
        settings: &SearchConfig,
        fusion: FusionConfig,
    ) -> Self {
        Self {
            search,
            locale,
            results_per_query: settings.results_per_query,
            fetch_timeout: Duration::from_millis(settings.fetch_timeout_ms),
            budget: Duration::from_millis(settings.prediction_budget_ms),
            fusion,
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Search, count, fuse. Always returns; a branch that fails or runs
    /// past the budget contributes no texts.
    pub async fn predict(&self, round_index: u32, evidence: &Evidence) -> Prediction {
        let started = Instant::now();

        let (question_texts, answer_texts) = tokio::join!(
            self.within_budget("question search", self.texts_about_question(evidence)),
            self.within_budget("answer search", self.texts_about_answers(evidence)),
        );
        let answer_texts = if answer_texts.len() == evidence.candidates.len() {
            answer_texts
        } else {
            vec![Vec::new(); evidence.candidates.len()]
        };

        info!(
            "🔎 Read {} question pages, {} answer pages",
            question_texts.len(),
            answer_texts.iter().map(Vec::len).sum::<usize>()
        );

        self.score(
            round_index,
            evidence,
            &question_texts,
            &answer_texts,
            started.elapsed(),
        )
    }

    async fn within_budget<T: Default>(&self, what: &str, work: impl Future<Output = T>) -> T {
        match tokio::time::timeout(self.budget, work).await {
            Ok(value) => value,
            Err(_) => {
                warn!("{} exceeded {:?}; continuing without it", what, self.budget);
                T::default()
            }
        }
    }

    async fn texts_about_question(&self, evidence: &Evidence) -> Vec<String> {
        let query = evidence.search_query();
        if query.is_empty() {
            return Vec::new();
        }

        let links = match self.search.search(&query, self.results_per_query).await {
            Ok(links) => links,
            Err(e) => {
                warn!("Question search failed: {}", e);
                return Vec::new();
            }
        };

        self.search
            .fetch_and_clean(&links, self.fetch_timeout)
            .await
            .iter()
            .map(|t| prepare_page_text(t))
            .collect()
    }

    /// One text list per candidate, aligned with `evidence.candidates`.
    async fn texts_about_answers(&self, evidence: &Evidence) -> Vec<Vec<String>> {
        let queries: Vec<String> = evidence
            .candidates
            .iter()
            .map(|c| c.normalized.clone())
            .collect();
        let link_lists = self
            .search
            .multiple_search(&queries, self.results_per_query)
            .await;

        let lengths: Vec<usize> = link_lists.iter().map(Vec::len).collect();
        let all_links: Vec<String> = link_lists.into_iter().flatten().collect();
        let mut texts = self
            .search
            .fetch_and_clean(&all_links, self.fetch_timeout)
            .await
            .into_iter()
            .map(|t| prepare_page_text(&t));

        lengths
            .into_iter()
            .map(|n| texts.by_ref().take(n).collect())
            .collect()
    }

    /// Pure scoring over already-gathered texts.
    pub fn score(
        &self,
        round_index: u32,
        evidence: &Evidence,
        question_texts: &[String],
        answer_texts: &[Vec<String>],
        latency: Duration,
    ) -> Prediction {
        let opposite = evidence.is_opposite;
        let zero = self.fusion.opposite_zero_score;

        let keywords = evidence.unique_keywords();
        let nouns: Vec<&str> = evidence.key_nouns.iter().map(String::as_str).collect();

        let methods = vec![
            scoring::to_probabilities(
                scoring::exact_phrase_counts(question_texts, &evidence.candidates),
                opposite,
                zero,
            ),
            scoring::to_probabilities(
                scoring::keyword_counts(question_texts, &evidence.candidates, &self.locale),
                opposite,
                zero,
            ),
            scoring::to_probabilities(
                scoring::answer_context_scores(
                    answer_texts,
                    &keywords,
                    &nouns,
                    self.fusion.context_keyword_share,
                ),
                opposite,
                zero,
            ),
        ];
        debug!("Method scores: {:?}", methods);

        let weights = [
            self.fusion.exact_phrase_weight,
            self.fusion.keyword_weight,
            self.fusion.answer_context_weight,
        ];
        let fused = scoring::fuse(&methods, &weights);

        let label = |idx: Option<usize>| {
            idx.and_then(|i| evidence.candidates.get(i))
                .map(|c| c.original.clone())
                .unwrap_or_default()
        };
        let labelled = |scores: &[f64]| -> Vec<(String, f64)> {
            evidence
                .candidates
                .iter()
                .zip(scores)
                .map(|(c, s)| (c.original.clone(), *s))
                .collect()
        };

        Prediction {
            round_index,
            distribution: labelled(&fused),
            best: label(scoring::argmax(&fused)),
            per_method_best: methods.iter().map(|m| label(scoring::argmax(m))).collect(),
            per_method: methods.iter().map(|m| labelled(m)).collect(),
            latency_secs: latency.as_secs_f64(),
        }
    }
}
