mod lexicon;
mod sentiment;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

pub use sentiment::{SentimentAnalyzer, SentimentLabel, SentimentScores};

pub const TOP_WORDS: usize = 10;
const MIN_TERM_CHARS: usize = 3;

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| lexicon::STOPWORDS.iter().copied().collect());

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LexicalFeatures {
    pub token_count: usize,
    pub word_frequency: BTreeMap<String, usize>,
    /// Adjacent token pairs that are equal.
    pub repetition_count: usize,
    /// Non-stop-word tokens of three or more characters, in order of appearance.
    pub meaningful_terms: Vec<String>,
    pub repeated_words: BTreeMap<String, usize>,
    pub sentiment: SentimentScores,
}

impl LexicalFeatures {
    /// Most frequent words, ties broken alphabetically.
    pub fn top_words(&self, n: usize) -> Vec<WordCount> {
        let mut words: Vec<WordCount> = self
            .word_frequency
            .iter()
            .map(|(word, &count)| WordCount {
                word: word.clone(),
                count,
            })
            .collect();
        words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        words.truncate(n);
        words
    }
}

/// Lower-cases, drops everything that is not a word character or whitespace, splits on
/// whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    cleaned.split_whitespace().map(str::to_owned).collect()
}

pub fn repetition_count(tokens: &[String]) -> usize {
    tokens.windows(2).filter(|pair| pair[0] == pair[1]).count()
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

pub fn analyze(text: &str) -> LexicalFeatures {
    let tokens = tokenize(text);

    let mut word_frequency = BTreeMap::new();
    for token in &tokens {
        *word_frequency.entry(token.clone()).or_insert(0) += 1;
    }

    let meaningful_terms: Vec<String> = tokens
        .iter()
        .filter(|t| t.chars().count() >= MIN_TERM_CHARS && !is_stopword(t))
        .cloned()
        .collect();

    let mut term_counts: BTreeMap<String, usize> = BTreeMap::new();
    for term in &meaningful_terms {
        *term_counts.entry(term.clone()).or_insert(0) += 1;
    }
    term_counts.retain(|_, count| *count > 1);

    LexicalFeatures {
        token_count: tokens.len(),
        repetition_count: repetition_count(&tokens),
        sentiment: SentimentAnalyzer::shared().score(&tokens, text),
        word_frequency,
        meaningful_terms,
        repeated_words: term_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_punctuation_and_case() {
        assert_eq!(
            tokenize("I don't want to GO. Please!"),
            vec!["i", "dont", "want", "to", "go", "please"]
        );
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn repetition_counts_adjacent_pairs() {
        let f = analyze("I don't want to go. I don't want to. Please. Please.");
        assert_eq!(f.token_count, 11);
        assert_eq!(f.repetition_count, 1);
        assert_eq!(f.word_frequency["please"], 2);
        assert_eq!(f.word_frequency["dont"], 2);
    }

    #[test]
    fn triple_word_counts_two_pairs() {
        assert_eq!(analyze("no no no").repetition_count, 2);
        assert_eq!(analyze("no yes no").repetition_count, 0);
    }

    #[test]
    fn frequency_sums_to_token_count() {
        let f = analyze("calm calm breathe in, breathe out; calm down");
        let total: usize = f.word_frequency.values().sum();
        assert_eq!(total, f.token_count);
        assert!(f.repetition_count < f.token_count);
    }

    #[test]
    fn empty_text_is_total() {
        let f = analyze("");
        assert_eq!(f.token_count, 0);
        assert_eq!(f.repetition_count, 0);
        assert!(f.top_words(TOP_WORDS).is_empty());
        assert_eq!(f.sentiment.compound, 0.0);
    }

    #[test]
    fn top_words_orders_by_count_then_word() {
        let f = analyze("b a c a b a d");
        let top = f.top_words(3);
        assert_eq!(top[0], WordCount { word: "a".into(), count: 3 });
        assert_eq!(top[1], WordCount { word: "b".into(), count: 2 });
        assert_eq!(top[2], WordCount { word: "c".into(), count: 1 });
    }

    #[test]
    fn meaningful_terms_skip_stopwords_and_short_tokens() {
        let f = analyze("I am so tired, so very tired of this ok");
        assert_eq!(f.meaningful_terms, vec!["tired", "tired"]);
        assert_eq!(f.repeated_words.get("tired"), Some(&2));
    }

    #[test]
    fn placeholder_transcripts_are_neutral() {
        for text in [
            "Audio too short for speech recognition",
            "Audio too quiet to detect speech",
            "Low audio signal detected",
            "Speech not detected in audio",
        ] {
            let f = analyze(text);
            assert_eq!(f.sentiment.compound, 0.0, "{text}");
            assert_eq!(f.repetition_count, 0);
        }
    }
}
