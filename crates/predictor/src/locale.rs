//! Language tables: stopwords, question words, polarity, search endpoint.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use common::config::LocaleId;
use common::transliterate;

use crate::tagger::{LexiconTagger, PosTagger};

const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "other", "some", "such", "no", "nor",
    "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

const GERMAN_STOPWORDS: &[&str] = &[
    "aber", "alle", "allem", "allen", "aller", "alles", "als", "also", "am", "an", "ander",
    "andere", "anderem", "anderen", "anderer", "anderes", "anderm", "andern", "anderr",
    "anders", "auch", "auf", "aus", "bei", "bin", "bis", "bist", "da", "damit", "dann", "der",
    "den", "des", "dem", "die", "das", "dass", "daß", "derselbe", "derselben", "denselben",
    "desselben", "demselben", "dieselbe", "dieselben", "dasselbe", "dazu", "dein", "deine",
    "deinem", "deinen", "deiner", "deines", "denn", "derer", "dessen", "dich", "dir", "du",
    "dies", "diese", "diesem", "diesen", "dieser", "dieses", "doch", "dort", "durch", "ein",
    "eine", "einem", "einen", "einer", "eines", "einig", "einige", "einigem", "einigen",
    "einiger", "einiges", "einmal", "er", "ihn", "ihm", "es", "etwas", "euer", "eure", "eurem",
    "euren", "eurer", "eures", "für", "gegen", "gewesen", "hab", "habe", "haben", "hat",
    "hatte", "hatten", "hier", "hin", "hinter", "ich", "mich", "mir", "ihr", "ihre", "ihrem",
    "ihren", "ihrer", "ihres", "euch", "im", "in", "indem", "ins", "ist", "jede", "jedem",
    "jeden", "jeder", "jedes", "jene", "jenem", "jenen", "jener", "jenes", "jetzt", "kann",
    "kein", "keine", "keinem", "keinen", "keiner", "keines", "können", "könnte", "machen",
    "man", "manche", "manchem", "manchen", "mancher", "manches", "mein", "meine", "meinem",
    "meinen", "meiner", "meines", "mit", "muss", "musste", "nach", "nicht", "nichts", "noch",
    "nun", "nur", "ob", "oder", "ohne", "sehr", "sein", "seine", "seinem", "seinen", "seiner",
    "seines", "selbst", "sich", "sie", "ihnen", "sind", "so", "solche", "solchem", "solchen",
    "solcher", "solches", "soll", "sollte", "sondern", "sonst", "über", "um", "und", "uns",
    "unsere", "unserem", "unseren", "unser", "unseres", "unter", "viel", "vom", "von", "vor",
    "während", "war", "waren", "warst", "was", "weg", "weil", "weiter", "welche", "welchem",
    "welchen", "welcher", "welches", "wenn", "werde", "werden", "wie", "wieder", "will", "wir",
    "wird", "wirst", "wo", "wollen", "wollte", "würde", "würden", "zu", "zum", "zur", "zwar",
    "zwischen",
];

const ENGLISH_QUESTION_WORDS: &[&str] =
    &["what", "when", "who", "which", "whom", "where", "why", "how"];

const GERMAN_QUESTION_WORDS: &[&str] =
    &["was", "wann", "wer", "welche", "wem", "wo", "warum", "wie"];

/// English: an upper-case NOT/NEVER, or "least" that is not "at least".
pub fn is_opposite_english(question: &str) -> bool {
    let lower = question.to_lowercase();
    question.contains("NOT")
        || question.contains("NEVER")
        || (lower.contains("least") && !lower.contains("at least"))
}

/// German: an upper-case NICHT/NIE/NIEMALS, or "am wenigsten" without "mindestens".
pub fn is_opposite_german(question: &str) -> bool {
    let lower = question.to_lowercase();
    question.contains("NICHT")
        || question.contains("NIE")
        || question.contains("NIEMALS")
        || (lower.contains("am wenigsten") && !lower.contains("mindestens"))
}

/// Everything language-specific the analyzer and search need.
#[derive(Clone)]
pub struct Locale {
    id: LocaleId,
    stopwords: HashSet<String>,
    question_words: &'static [&'static str],
    polarity: fn(&str) -> bool,
    search_url: &'static str,
    tagger: Arc<dyn PosTagger>,
}

impl fmt::Debug for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locale")
            .field("id", &self.id)
            .field("stopwords", &self.stopwords.len())
            .field("search_url", &self.search_url)
            .finish()
    }
}

impl Locale {
    pub fn new(id: LocaleId) -> Self {
        // "most"/"least"/"meisten" carry the question's polarity.
        let (stopwords, question_words, polarity, search_url): (
            &[&str],
            _,
            fn(&str) -> bool,
            _,
        ) = match id {
            LocaleId::EnglishUk => (
                ENGLISH_STOPWORDS,
                ENGLISH_QUESTION_WORDS,
                is_opposite_english,
                "https://www.google.co.uk/search?ie=utf-8&oe=utf-8&client=firefox-b-1-ab",
            ),
            LocaleId::EnglishUs => (
                ENGLISH_STOPWORDS,
                ENGLISH_QUESTION_WORDS,
                is_opposite_english,
                "https://www.google.com/search?ie=utf-8&oe=utf-8&client=firefox-b-1-ab",
            ),
            LocaleId::German => (
                GERMAN_STOPWORDS,
                GERMAN_QUESTION_WORDS,
                is_opposite_german,
                "https://www.google.de/search?ie=utf-8&oe=utf-8&client=firefox-b-1-ab",
            ),
        };

        // Question text arrives transliterated, so match both spellings.
        let stopwords = stopwords
            .iter()
            .flat_map(|w| [w.to_string(), transliterate(w)])
            .collect();

        Self {
            id,
            stopwords,
            question_words,
            polarity,
            search_url,
            tagger: Arc::new(LexiconTagger::new(id)),
        }
    }

    /// Swap the part-of-speech tagger.
    pub fn with_tagger(mut self, tagger: Arc<dyn PosTagger>) -> Self {
        self.tagger = tagger;
        self
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    pub fn question_words(&self) -> &[&'static str] {
        self.question_words
    }

    pub fn is_opposite(&self, question: &str) -> bool {
        (self.polarity)(question)
    }

    pub fn search_url(&self) -> &'static str {
        self.search_url
    }

    pub fn tagger(&self) -> &dyn PosTagger {
        self.tagger.as_ref()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new(LocaleId::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_polarity() {
        assert!(is_opposite_english("Which of these is NOT a fruit?"));
        assert!(is_opposite_english("Which of these has NEVER won?"));
        assert!(is_opposite_english("Which planet has the least moons?"));
        assert!(!is_opposite_english("Which planet has at least two moons?"));
        assert!(!is_opposite_english("Which of these is not lowercase-negated?"));
        assert!(!is_opposite_english("Who wrote Hamlet?"));
    }

    #[test]
    fn test_german_polarity() {
        assert!(is_opposite_german("Was ist NICHT rot?"));
        assert!(is_opposite_german("Wer hat NIEMALS gewonnen?"));
        assert!(is_opposite_german("Welches Land hat am wenigsten Einwohner?"));
        assert!(!is_opposite_german("Welches Land hat am wenigsten mindestens zwei Seen?"));
        assert!(!is_opposite_german("Wer schrieb Faust?"));
    }

    #[test]
    fn test_us_locale_uses_english_polarity() {
        let us = Locale::new(LocaleId::EnglishUs);
        assert!(us.is_opposite("Which is NOT a colour?"));
        assert!(!us.is_opposite("Which is NICHT a colour?"));
    }

    #[test]
    fn test_polarity_words_are_not_stopwords() {
        let en = Locale::new(LocaleId::EnglishUk);
        assert!(en.is_stopword("the"));
        assert!(en.is_stopword("not"));
        assert!(!en.is_stopword("most"));
        assert!(!en.is_stopword("least"));

        let de = Locale::new(LocaleId::German);
        assert!(de.is_stopword("für"));
        assert!(de.is_stopword("fur"));
        assert!(!de.is_stopword("meisten"));
    }

    #[test]
    fn test_search_urls_per_locale() {
        assert!(Locale::new(LocaleId::EnglishUk).search_url().contains("google.co.uk"));
        assert!(Locale::new(LocaleId::EnglishUs).search_url().contains("google.com/"));
        assert!(Locale::new(LocaleId::German).search_url().contains("google.de"));
    }
}
