//! Escalation risk: keyword hits, strong negative sentiment, and long complaints,
//! clamped to [0, 1].

use crate::lexicon::{Emotion, EscalationLexicon};
use crate::sentiment::Sentiment;

const KEYWORD_WEIGHT: f64 = 0.2;
const ANGRY_BONUS: f64 = 0.4;
const ANGRY_MIN_CONFIDENCE: f64 = 0.7;
const FRUSTRATED_BONUS: f64 = 0.2;
const FRUSTRATED_MIN_CONFIDENCE: f64 = 0.6;
const LONG_TEXT_BONUS: f64 = 0.1;
const LONG_TEXT_CHARS: usize = 200;

/// Score with the built-in escalation keywords.
pub fn score(text: &str, sentiment: &Sentiment) -> f64 {
    score_with(&EscalationLexicon::default(), text, sentiment)
}

pub fn score_with(lexicon: &EscalationLexicon, text: &str, sentiment: &Sentiment) -> f64 {
    let matches = lexicon.count_matches(&text.to_lowercase());
    let mut risk = matches as f64 * KEYWORD_WEIGHT;

    if sentiment.emotion == Emotion::Angry && sentiment.confidence > ANGRY_MIN_CONFIDENCE {
        risk += ANGRY_BONUS;
    } else if sentiment.emotion == Emotion::Frustrated
        && sentiment.confidence > FRUSTRATED_MIN_CONFIDENCE
    {
        risk += FRUSTRATED_BONUS;
    }

    if text.chars().count() > LONG_TEXT_CHARS {
        risk += LONG_TEXT_BONUS;
    }

    let risk = risk.clamp(0.0, 1.0);
    log::debug!("escalation: {} keyword(s), risk {:.2}", matches, risk);
    risk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Polarity;
    use crate::sentiment::classify;

    fn sentiment(emotion: Emotion, confidence: f64) -> Sentiment {
        Sentiment {
            emotion,
            confidence,
            polarity: emotion.polarity(),
        }
    }

    #[test]
    fn keywords_add_a_fifth_each() {
        let s = sentiment(Emotion::Neutral, 0.3);
        assert_eq!(score("hello", &s), 0.0);
        assert!((score("I want a REFUND", &s) - 0.2).abs() < 1e-9);
        assert!((score("refund, then cancel", &s) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn sentiment_bonuses_are_exclusive_and_thresholded() {
        assert!((score("x", &sentiment(Emotion::Angry, 0.75)) - 0.4).abs() < 1e-9);
        assert_eq!(score("x", &sentiment(Emotion::Angry, 0.7)), 0.0);
        assert!((score("x", &sentiment(Emotion::Frustrated, 0.65)) - 0.2).abs() < 1e-9);
        assert_eq!(score("x", &sentiment(Emotion::Frustrated, 0.6)), 0.0);
        assert_eq!(score("x", &sentiment(Emotion::Happy, 0.95)), 0.0);
    }

    #[test]
    fn long_text_bonus() {
        let s = sentiment(Emotion::Neutral, 0.3);
        let text = "a".repeat(201);
        assert!((score(&text, &s) - 0.1).abs() < 1e-9);
        assert_eq!(score(&"a".repeat(200), &s), 0.0);
    }

    #[test]
    fn clamped_to_one() {
        let text = "cancel refund lawyer sue complaint manager supervisor escalate";
        let s = Sentiment {
            emotion: Emotion::Angry,
            confidence: 0.9,
            polarity: Polarity::Negative,
        };
        assert_eq!(score(text, &s), 1.0);
    }

    #[test]
    fn stays_in_unit_interval() {
        let samples = [
            "",
            "This is unacceptable, I want a refund and to speak to your manager!",
            "How do I reset my password?",
            "I hate this, worst, terrible, awful, I will sue, get a lawyer, cancel it all",
        ];
        for text in samples {
            let r = score(text, &classify(text));
            assert!((0.0..=1.0).contains(&r), "{text}: {r}");
        }
    }

    #[test]
    fn complaint_with_refund_and_manager_is_high_risk() {
        let text = "This is unacceptable, I want a refund and to speak to your manager!";
        assert!(score(text, &classify(text)) > 0.6);
    }
}
