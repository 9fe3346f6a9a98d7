//! Part-of-speech tagging for key-noun extraction.
//!
//! `LexiconTagger` is a closed-class lexicon plus suffix rules. It only has
//! to tell nouns from everything else in short quiz questions, which is
//! what the key-noun heuristic consumes.

use std::collections::HashMap;

use common::config::LocaleId;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Noun,
    ProperNoun,
    Verb,
    Adjective,
    Adverb,
    Determiner,
    Preposition,
    Pronoun,
    Conjunction,
    Number,
    WhWord,
    Other,
}

impl Tag {
    pub fn is_noun(self) -> bool {
        matches!(self, Tag::Noun | Tag::ProperNoun)
    }
}

/// Tags the words of a sentence in order. Punctuation and possessive
/// markers produce no token.
pub trait PosTagger: Send + Sync {
    fn tag(&self, text: &str) -> Vec<(String, Tag)>;
}

const ENGLISH_LEXICON: &[(&str, Tag)] = &[
    ("a", Tag::Determiner), ("an", Tag::Determiner), ("the", Tag::Determiner),
    ("this", Tag::Determiner), ("that", Tag::Determiner), ("these", Tag::Determiner),
    ("those", Tag::Determiner), ("each", Tag::Determiner), ("every", Tag::Determiner),
    ("some", Tag::Determiner), ("any", Tag::Determiner), ("no", Tag::Determiner),
    ("all", Tag::Determiner), ("both", Tag::Determiner), ("another", Tag::Determiner),
    ("what", Tag::WhWord), ("which", Tag::WhWord), ("who", Tag::WhWord),
    ("whom", Tag::WhWord), ("whose", Tag::WhWord), ("when", Tag::WhWord),
    ("where", Tag::WhWord), ("why", Tag::WhWord), ("how", Tag::WhWord),
    ("i", Tag::Pronoun), ("you", Tag::Pronoun), ("he", Tag::Pronoun), ("she", Tag::Pronoun),
    ("it", Tag::Pronoun), ("we", Tag::Pronoun), ("they", Tag::Pronoun), ("me", Tag::Pronoun),
    ("him", Tag::Pronoun), ("her", Tag::Pronoun), ("us", Tag::Pronoun), ("them", Tag::Pronoun),
    ("his", Tag::Pronoun), ("its", Tag::Pronoun), ("their", Tag::Pronoun),
    ("our", Tag::Pronoun), ("your", Tag::Pronoun), ("my", Tag::Pronoun),
    ("one", Tag::Number),
    ("in", Tag::Preposition), ("on", Tag::Preposition), ("at", Tag::Preposition),
    ("of", Tag::Preposition), ("for", Tag::Preposition), ("with", Tag::Preposition),
    ("by", Tag::Preposition), ("from", Tag::Preposition), ("to", Tag::Preposition),
    ("into", Tag::Preposition), ("about", Tag::Preposition), ("as", Tag::Preposition),
    ("after", Tag::Preposition), ("before", Tag::Preposition), ("between", Tag::Preposition),
    ("during", Tag::Preposition), ("under", Tag::Preposition), ("over", Tag::Preposition),
    ("through", Tag::Preposition), ("without", Tag::Preposition), ("than", Tag::Preposition),
    ("like", Tag::Preposition), ("near", Tag::Preposition), ("against", Tag::Preposition),
    ("and", Tag::Conjunction), ("or", Tag::Conjunction), ("but", Tag::Conjunction),
    ("nor", Tag::Conjunction), ("if", Tag::Conjunction), ("because", Tag::Conjunction),
    ("is", Tag::Verb), ("are", Tag::Verb), ("was", Tag::Verb), ("were", Tag::Verb),
    ("be", Tag::Verb), ("been", Tag::Verb), ("being", Tag::Verb), ("am", Tag::Verb),
    ("do", Tag::Verb), ("does", Tag::Verb), ("did", Tag::Verb), ("has", Tag::Verb),
    ("have", Tag::Verb), ("had", Tag::Verb), ("can", Tag::Verb), ("could", Tag::Verb),
    ("will", Tag::Verb), ("would", Tag::Verb), ("should", Tag::Verb), ("may", Tag::Verb),
    ("might", Tag::Verb), ("must", Tag::Verb), ("shall", Tag::Verb), ("won", Tag::Verb),
    ("wrote", Tag::Verb), ("made", Tag::Verb), ("make", Tag::Verb), ("makes", Tag::Verb),
    ("known", Tag::Verb), ("called", Tag::Verb), ("invented", Tag::Verb),
    ("found", Tag::Verb), ("named", Tag::Verb), ("became", Tag::Verb), ("born", Tag::Verb),
    ("not", Tag::Adverb), ("never", Tag::Adverb), ("also", Tag::Adverb), ("only", Tag::Adverb),
    ("most", Tag::Adverb), ("least", Tag::Adverb), ("more", Tag::Adverb), ("less", Tag::Adverb),
    ("very", Tag::Adverb), ("first", Tag::Adjective), ("last", Tag::Adjective),
    ("largest", Tag::Adjective), ("biggest", Tag::Adjective), ("smallest", Tag::Adjective),
    ("famous", Tag::Adjective), ("following", Tag::Adjective),
];

const GERMAN_LEXICON: &[(&str, Tag)] = &[
    ("der", Tag::Determiner), ("die", Tag::Determiner), ("das", Tag::Determiner),
    ("den", Tag::Determiner), ("dem", Tag::Determiner), ("des", Tag::Determiner),
    ("ein", Tag::Determiner), ("eine", Tag::Determiner), ("einen", Tag::Determiner),
    ("einem", Tag::Determiner), ("einer", Tag::Determiner), ("eines", Tag::Determiner),
    ("kein", Tag::Determiner), ("keine", Tag::Determiner),
    ("was", Tag::WhWord), ("wann", Tag::WhWord), ("wer", Tag::WhWord),
    ("welche", Tag::WhWord), ("welcher", Tag::WhWord), ("welches", Tag::WhWord),
    ("wem", Tag::WhWord), ("wo", Tag::WhWord), ("warum", Tag::WhWord), ("wie", Tag::WhWord),
    ("ich", Tag::Pronoun), ("du", Tag::Pronoun), ("er", Tag::Pronoun), ("sie", Tag::Pronoun),
    ("es", Tag::Pronoun), ("wir", Tag::Pronoun), ("ihr", Tag::Pronoun), ("man", Tag::Pronoun),
    ("in", Tag::Preposition), ("im", Tag::Preposition), ("an", Tag::Preposition),
    ("am", Tag::Preposition), ("auf", Tag::Preposition), ("aus", Tag::Preposition),
    ("bei", Tag::Preposition), ("mit", Tag::Preposition), ("nach", Tag::Preposition),
    ("von", Tag::Preposition), ("vom", Tag::Preposition), ("zu", Tag::Preposition),
    ("zum", Tag::Preposition), ("zur", Tag::Preposition), ("für", Tag::Preposition),
    ("fur", Tag::Preposition), ("über", Tag::Preposition), ("uber", Tag::Preposition),
    ("und", Tag::Conjunction), ("oder", Tag::Conjunction), ("aber", Tag::Conjunction),
    ("wenn", Tag::Conjunction), ("dann", Tag::Adverb), ("nicht", Tag::Adverb),
    ("nie", Tag::Adverb), ("niemals", Tag::Adverb), ("meisten", Tag::Adverb),
    ("wenigsten", Tag::Adverb),
    ("ist", Tag::Verb), ("sind", Tag::Verb), ("war", Tag::Verb), ("hat", Tag::Verb),
    ("haben", Tag::Verb), ("wird", Tag::Verb), ("spielt", Tag::Verb),
];

/// Lexicon lookup, then capitalisation and suffix heuristics.
pub struct LexiconTagger {
    locale: LocaleId,
    lexicon: HashMap<&'static str, Tag>,
    word: Regex,
}

impl LexiconTagger {
    pub fn new(locale: LocaleId) -> Self {
        let entries = match locale {
            LocaleId::German => GERMAN_LEXICON,
            LocaleId::EnglishUk | LocaleId::EnglishUs => ENGLISH_LEXICON,
        };
        Self {
            locale,
            lexicon: entries.iter().copied().collect(),
            // Words, keeping inner hyphens and apostrophes.
            word: Regex::new(r"\w+(?:['\-]\w+)*").expect("static word pattern"),
        }
    }

    fn tag_word(&self, word: &str, sentence_start: bool) -> Tag {
        let lower = word.to_lowercase();
        if let Some(tag) = self.lexicon.get(lower.as_str()) {
            return *tag;
        }
        if word.chars().all(|c| c.is_ascii_digit()) {
            return Tag::Number;
        }

        let capitalised = word.chars().next().is_some_and(char::is_uppercase);
        match self.locale {
            // German capitalises every noun.
            LocaleId::German => {
                if capitalised {
                    Tag::Noun
                } else if lower.ends_with("en") || lower.ends_with("st") || lower.ends_with("te") {
                    Tag::Verb
                } else {
                    Tag::Adjective
                }
            }
            LocaleId::EnglishUk | LocaleId::EnglishUs => {
                if capitalised && !sentence_start {
                    Tag::ProperNoun
                } else {
                    english_suffix_tag(&lower)
                }
            }
        }
    }
}

fn english_suffix_tag(lower: &str) -> Tag {
    const ADJECTIVE_SUFFIXES: &[&str] = &[
        "ous", "ful", "ive", "able", "ible", "less", "ic", "est", "ary",
    ];

    if lower.len() > 4 && lower.ends_with("ly") {
        Tag::Adverb
    } else if lower.len() > 4 && (lower.ends_with("ing") || lower.ends_with("ed")) {
        Tag::Verb
    } else if lower.len() > 4 && ADJECTIVE_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        Tag::Adjective
    } else {
        Tag::Noun
    }
}

impl PosTagger for LexiconTagger {
    fn tag(&self, text: &str) -> Vec<(String, Tag)> {
        self.word
            .find_iter(text)
            .enumerate()
            .filter_map(|(i, m)| {
                // Possessive marker carries no tag of its own.
                let word = m
                    .as_str()
                    .strip_suffix("'s")
                    .unwrap_or(m.as_str());
                if word.is_empty() {
                    return None;
                }
                Some((word.to_string(), self.tag_word(word, i == 0)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(locale: LocaleId, text: &str) -> Vec<(String, Tag)> {
        LexiconTagger::new(locale).tag(text)
    }

    #[test]
    fn test_english_sentence() {
        let tagged = tags(LocaleId::EnglishUk, "Which colour is NOT in the Italian flag?");
        let words: Vec<&str> = tagged.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(words, vec!["Which", "colour", "is", "NOT", "in", "the", "Italian", "flag"]);
        assert_eq!(tagged[0].1, Tag::WhWord);
        assert!(tagged[1].1.is_noun());
        assert_eq!(tagged[3].1, Tag::Adverb);
        assert_eq!(tagged[6].1, Tag::ProperNoun);
        assert!(tagged[7].1.is_noun());
    }

    #[test]
    fn test_possessive_dropped() {
        let tagged = tags(LocaleId::EnglishUk, "Who was Shakespeare's wife?");
        let words: Vec<&str> = tagged.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(words, vec!["Who", "was", "Shakespeare", "wife"]);
    }

    #[test]
    fn test_english_suffixes() {
        assert_eq!(english_suffix_tag("quickly"), Tag::Adverb);
        assert_eq!(english_suffix_tag("running"), Tag::Verb);
        assert_eq!(english_suffix_tag("poisonous"), Tag::Adjective);
        assert_eq!(english_suffix_tag("volcano"), Tag::Noun);
    }

    #[test]
    fn test_german_capitalised_nouns() {
        let tagged = tags(LocaleId::German, "Wenn man Doppelkopf spielt, dann spielt man");
        assert_eq!(tagged[0].1, Tag::Conjunction);
        assert_eq!(tagged[2].1, Tag::Noun);
        assert_eq!(tagged[3].1, Tag::Verb);
    }
}
