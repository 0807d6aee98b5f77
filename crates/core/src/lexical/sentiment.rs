//! Lexicon-and-rule polarity scoring.

use super::lexicon::{BOOSTERS, NEGATIONS, VALENCE};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

const NEGATION_SCALAR: f64 = -0.74;
const BUT_BEFORE: f64 = 0.5;
const BUT_AFTER: f64 = 1.5;
const EXCLAIM_AMP: f64 = 0.292;
const MAX_EXCLAIMS: usize = 4;
const QUESTION_AMP: f64 = 0.18;
const QUESTION_CAP: f64 = 0.96;
const NORMALIZE_ALPHA: f64 = 15.0;
const LABEL_THRESHOLD: f32 = 0.1;

static SHARED: LazyLock<SentimentAnalyzer> = LazyLock::new(SentimentAnalyzer::new);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_compound(compound: f32) -> Self {
        if compound > LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if compound < -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    /// Normalized overall polarity in [-1, 1].
    pub compound: f32,
    pub positive: f32,
    pub neutral: f32,
    pub negative: f32,
    pub label: SentimentLabel,
}

impl SentimentScores {
    fn neutral_empty() -> Self {
        Self {
            compound: 0.0,
            positive: 0.0,
            neutral: 0.0,
            negative: 0.0,
            label: SentimentLabel::Neutral,
        }
    }
}

pub struct SentimentAnalyzer {
    valence: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
    negations: HashSet<&'static str>,
}

impl SentimentAnalyzer {
    fn new() -> Self {
        Self {
            valence: VALENCE.iter().map(|&(w, v)| (w, f64::from(v))).collect(),
            boosters: BOOSTERS.iter().map(|&(w, v)| (w, f64::from(v))).collect(),
            negations: NEGATIONS.iter().copied().collect(),
        }
    }

    /// Process-wide instance; the tables are built on first use.
    pub fn shared() -> &'static SentimentAnalyzer {
        &SHARED
    }

    /// Scores pre-tokenized words; `raw` is only consulted for `!` and `?` emphasis.
    pub fn score(&self, tokens: &[String], raw: &str) -> SentimentScores {
        if tokens.is_empty() {
            return SentimentScores::neutral_empty();
        }

        let mut sentiments: Vec<f64> = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| self.word_valence(tokens, i, token))
            .collect();

        if let Some(but_at) = tokens.iter().position(|t| t == "but") {
            for (i, s) in sentiments.iter_mut().enumerate() {
                if i < but_at {
                    *s *= BUT_BEFORE;
                } else if i > but_at {
                    *s *= BUT_AFTER;
                }
            }
        }

        let emphasis = punctuation_emphasis(raw);
        let mut sum: f64 = sentiments.iter().sum();
        if sum > 0.0 {
            sum += emphasis;
        } else if sum < 0.0 {
            sum -= emphasis;
        }
        let compound = normalize(sum);

        let (mut pos_sum, mut neg_sum, mut neu_count) = (0.0f64, 0.0f64, 0usize);
        for &s in &sentiments {
            if s > 0.0 {
                pos_sum += s + 1.0;
            } else if s < 0.0 {
                neg_sum += s - 1.0;
            } else {
                neu_count += 1;
            }
        }
        if pos_sum > neg_sum.abs() {
            pos_sum += emphasis;
        } else if pos_sum < neg_sum.abs() {
            neg_sum -= emphasis;
        }
        let total = pos_sum + neg_sum.abs() + neu_count as f64;
        let share = |v: f64| if total > 0.0 { (v.abs() / total) as f32 } else { 0.0 };

        let compound = compound as f32;
        SentimentScores {
            compound,
            positive: share(pos_sum),
            neutral: share(neu_count as f64),
            negative: share(neg_sum),
            label: SentimentLabel::from_compound(compound),
        }
    }

    fn word_valence(&self, tokens: &[String], i: usize, token: &str) -> f64 {
        if self.boosters.contains_key(token) {
            return 0.0;
        }
        let Some(&base) = self.valence.get(token) else {
            return 0.0;
        };

        let mut valence = base;
        for back in 1..=3 {
            let Some(prev) = i.checked_sub(back).map(|j| tokens[j].as_str()) else {
                break;
            };
            if let Some(&boost) = self.boosters.get(prev) {
                let damp = match back {
                    1 => 1.0,
                    2 => 0.95,
                    _ => 0.9,
                };
                let signed = if valence < 0.0 { -boost } else { boost };
                valence += signed * damp;
            }
            if self.negations.contains(prev) {
                valence *= NEGATION_SCALAR;
            }
        }
        valence
    }
}

fn punctuation_emphasis(raw: &str) -> f64 {
    let exclaims = raw.matches('!').count().min(MAX_EXCLAIMS);
    let questions = raw.matches('?').count();
    let question_amp = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * QUESTION_AMP,
        _ => QUESTION_CAP,
    };
    exclaims as f64 * EXCLAIM_AMP + question_amp
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + NORMALIZE_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize;

    fn score(text: &str) -> SentimentScores {
        SentimentAnalyzer::shared().score(&tokenize(text), text)
    }

    #[test]
    fn neutral_text_scores_zero() {
        let s = score("the table is in the kitchen");
        assert_eq!(s.compound, 0.0);
        assert_eq!(s.neutral, 1.0);
        assert_eq!(s.label, SentimentLabel::Neutral);
    }

    #[test]
    fn empty_text_is_all_zero() {
        let s = score("");
        assert_eq!(s, SentimentScores::neutral_empty());
    }

    #[test]
    fn single_positive_word() {
        let s = score("happy");
        // 2.7 / sqrt(2.7^2 + 15)
        assert!((s.compound - 0.5719).abs() < 1e-3, "{}", s.compound);
        assert_eq!(s.label, SentimentLabel::Positive);
        assert_eq!(s.positive, 1.0);
    }

    #[test]
    fn negation_flips_polarity() {
        assert!(score("i am happy").compound > 0.0);
        assert!(score("i am not happy").compound < 0.0);
    }

    #[test]
    fn negation_reaches_three_tokens_back() {
        // "dont" sits three tokens before "please"
        let s = score("i dont want to please");
        assert!(s.compound < 0.0);
    }

    #[test]
    fn booster_increases_magnitude() {
        assert!(score("very sad").compound < score("sad").compound);
        assert!(score("very happy").compound > score("happy").compound);
    }

    #[test]
    fn but_shifts_weight_to_second_clause() {
        let s = score("the food was good but the service was awful");
        // 1.9 * 0.5 - 2.0 * 1.5 < 0
        assert!(s.compound < 0.0);
    }

    #[test]
    fn exclamations_amplify() {
        assert!(score("great!!!").compound > score("great").compound);
    }

    #[test]
    fn repeated_please_with_negation() {
        let s = score("I don't want to go. I don't want to. Please. Please.");
        assert!((s.compound - 0.087).abs() < 0.005, "{}", s.compound);
        assert_eq!(s.label, SentimentLabel::Neutral);
    }

    #[test]
    fn fearful_text_is_strongly_negative() {
        let s = score("Please please I am scared scared, I hate this");
        assert!((s.compound + 0.7096).abs() < 0.005, "{}", s.compound);
        assert_eq!(s.label, SentimentLabel::Negative);
    }

    #[test]
    fn proportions_sum_to_one() {
        let s = score("I love this but I am a little worried");
        let total = s.positive + s.neutral + s.negative;
        assert!((total - 1.0).abs() < 1e-4);
    }
}
