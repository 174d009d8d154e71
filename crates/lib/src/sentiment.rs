//! Keyword sentiment classifier.
//!
//! Each emotion scores the fraction of its keywords found in the lowercased text;
//! the strictly highest score wins and ties keep lexicon order. Total: empty input
//! classifies as neutral with the minimum confidence.

use crate::lexicon::{Emotion, EmotionLexicon, Polarity};
use serde::{Deserialize, Serialize};

pub const MIN_CONFIDENCE: f64 = 0.3;
pub const MAX_CONFIDENCE: f64 = 0.95;
const BASE_CONFIDENCE: f64 = 0.2;
const LENGTH_BONUS: f64 = 0.1;
const LENGTH_BONUS_CHARS: usize = 50;

/// Classifier output attached to every user message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub emotion: Emotion,
    pub confidence: f64,
    pub polarity: Polarity,
}

/// Classify with the built-in lexicon.
pub fn classify(text: &str) -> Sentiment {
    classify_with(&EmotionLexicon::default(), text)
}

pub fn classify_with(lexicon: &EmotionLexicon, text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let mut emotion = Emotion::Neutral;
    let mut best = 0.0_f64;

    for (candidate, keywords) in lexicon.iter() {
        if keywords.is_empty() {
            continue;
        }
        let hits = keywords.iter().filter(|k| lower.contains(k.as_str())).count();
        let score = hits as f64 / keywords.len() as f64;
        if score > best {
            best = score;
            emotion = candidate;
        }
    }

    let length_bonus = if text.chars().count() > LENGTH_BONUS_CHARS {
        LENGTH_BONUS
    } else {
        0.0
    };
    let confidence = (best + length_bonus + BASE_CONFIDENCE).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
    log::debug!(
        "sentiment: {} (score {:.3}, confidence {:.3})",
        emotion,
        best,
        confidence
    );

    Sentiment {
        emotion,
        confidence,
        polarity: emotion.polarity(),
    }
}
