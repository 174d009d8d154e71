//! Emotion and escalation keyword lexicons.
//!
//! Both lexicons ship with built-in defaults and may be replaced from the
//! `lexicon` section of the config. Keywords are matched as lowercase substrings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Emotion label assigned to a user utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Frustrated,
    Confused,
    Happy,
    Neutral,
}

/// Coarse valence of an emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Emotion {
    /// Lexicon iteration order; earlier entries win score ties.
    pub const ALL: [Emotion; 5] = [
        Emotion::Angry,
        Emotion::Frustrated,
        Emotion::Confused,
        Emotion::Happy,
        Emotion::Neutral,
    ];

    pub fn polarity(self) -> Polarity {
        match self {
            Emotion::Angry | Emotion::Frustrated => Polarity::Negative,
            Emotion::Happy => Polarity::Positive,
            Emotion::Confused | Emotion::Neutral => Polarity::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Frustrated => "frustrated",
            Emotion::Confused => "confused",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ANGRY: &[&str] = &[
    "angry", "furious", "mad", "hate", "terrible", "awful", "worst", "disgusted", "outraged",
];
const FRUSTRATED: &[&str] = &[
    "frustrated",
    "annoying",
    "annoyed",
    "irritated",
    "disappointed",
    "upset",
    "bothered",
];
const CONFUSED: &[&str] = &[
    "confused",
    "unclear",
    "don't understand",
    "help me",
    "not sure",
    "what does",
    "explain",
];
const HAPPY: &[&str] = &[
    "great", "excellent", "amazing", "love", "perfect", "wonderful", "fantastic", "happy",
];
const NEUTRAL: &[&str] = &["okay", "fine", "alright", "sure", "yes", "no", "maybe"];

const ESCALATION: &[&str] = &[
    "cancel",
    "refund",
    "lawyer",
    "sue",
    "complaint",
    "manager",
    "supervisor",
    "escalate",
    "unacceptable",
    "ridiculous",
];

fn lowercase_all<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Emotion → keyword sets, always held in [`Emotion::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionLexicon {
    entries: Vec<(Emotion, Vec<String>)>,
}

impl Default for EmotionLexicon {
    fn default() -> Self {
        let builtin = |e: Emotion| -> &'static [&'static str] {
            match e {
                Emotion::Angry => ANGRY,
                Emotion::Frustrated => FRUSTRATED,
                Emotion::Confused => CONFUSED,
                Emotion::Happy => HAPPY,
                Emotion::Neutral => NEUTRAL,
            }
        };
        Self {
            entries: Emotion::ALL
                .iter()
                .map(|&e| (e, lowercase_all(builtin(e))))
                .collect(),
        }
    }
}

impl EmotionLexicon {
    /// Build from a configured map. Emotions absent from the map get no keywords.
    pub fn from_map(map: &HashMap<Emotion, Vec<String>>) -> Self {
        Self {
            entries: Emotion::ALL
                .iter()
                .map(|e| {
                    let words = map.get(e).map(|w| lowercase_all(w.as_slice()));
                    (*e, words.unwrap_or_default())
                })
                .collect(),
        }
    }

    /// Iterate categories in tie-break order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, &[String])> {
        self.entries.iter().map(|(e, w)| (*e, w.as_slice()))
    }

    pub fn keywords(&self, emotion: Emotion) -> &[String] {
        self.entries
            .iter()
            .find(|(e, _)| *e == emotion)
            .map(|(_, w)| w.as_slice())
            .unwrap_or(&[])
    }
}

/// Keywords that signal a customer wants out or wants a human.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationLexicon {
    keywords: Vec<String>,
}

impl Default for EscalationLexicon {
    fn default() -> Self {
        Self {
            keywords: lowercase_all(ESCALATION),
        }
    }
}

impl EscalationLexicon {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: lowercase_all(keywords),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Number of keywords contained in the (already lowercased) text.
    pub fn count_matches(&self, lower_text: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| lower_text.contains(k.as_str()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_mapping() {
        assert_eq!(Emotion::Angry.polarity(), Polarity::Negative);
        assert_eq!(Emotion::Frustrated.polarity(), Polarity::Negative);
        assert_eq!(Emotion::Happy.polarity(), Polarity::Positive);
        assert_eq!(Emotion::Confused.polarity(), Polarity::Neutral);
        assert_eq!(Emotion::Neutral.polarity(), Polarity::Neutral);
    }

    #[test]
    fn from_map_keeps_fixed_order_and_lowercases() {
        let mut map = HashMap::new();
        map.insert(Emotion::Happy, vec!["Stoked".to_string(), "  ".to_string()]);
        map.insert(Emotion::Angry, vec!["LIVID".to_string()]);
        let lex = EmotionLexicon::from_map(&map);
        let order: Vec<Emotion> = lex.iter().map(|(e, _)| e).collect();
        assert_eq!(order, Emotion::ALL.to_vec());
        assert_eq!(lex.keywords(Emotion::Angry), ["livid".to_string()]);
        assert_eq!(lex.keywords(Emotion::Happy), ["stoked".to_string()]);
        assert!(lex.keywords(Emotion::Confused).is_empty());
    }

    #[test]
    fn escalation_counts_distinct_keywords() {
        let lex = EscalationLexicon::default();
        assert_eq!(lex.count_matches("i want a refund, refund now"), 1);
        assert_eq!(lex.count_matches("get me your manager or supervisor"), 2);
        assert_eq!(lex.count_matches(""), 0);
    }

    #[test]
    fn emotion_serializes_lowercase() {
        let s = serde_json::to_string(&Emotion::Frustrated).unwrap();
        assert_eq!(s, "\"frustrated\"");
    }
}
