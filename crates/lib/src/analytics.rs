//! Analytics aggregate derived from the conversation set.
//!
//! Only the resolution counters are stored, and they are updated inside the same
//! transition as the `EndConversation` that produced them. Everything else is recomputed.

use crate::conversation::{Conversation, ConversationStatus, Sender};
use crate::lexicon::Emotion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsCounters {
    /// Conversations closed through `EndConversation`.
    pub total_conversations: u64,
    pub resolved_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub total_conversations: u64,
    /// Mean of recorded satisfaction ratings; None until one is recorded.
    pub average_satisfaction: Option<f64>,
    /// Escalated conversations over all conversations (0 when there are none).
    pub escalation_rate: f64,
    pub resolved_count: u64,
    /// User-message count per classified emotion.
    pub sentiment_distribution: BTreeMap<Emotion, usize>,
}

impl AnalyticsSnapshot {
    pub fn derive<'a>(
        conversations: impl IntoIterator<Item = &'a Conversation>,
        counters: AnalyticsCounters,
    ) -> Self {
        let mut count = 0usize;
        let mut escalated = 0usize;
        let mut ratings: Vec<u8> = Vec::new();
        let mut sentiment_distribution = BTreeMap::new();

        for conv in conversations {
            count += 1;
            if conv.status == ConversationStatus::Escalated {
                escalated += 1;
            }
            if let Some(r) = conv.customer_satisfaction {
                ratings.push(r.get());
            }
            for sentiment in conv
                .messages
                .iter()
                .filter(|m| m.sender == Sender::User)
                .filter_map(|m| m.sentiment)
            {
                *sentiment_distribution.entry(sentiment.emotion).or_insert(0) += 1;
            }
        }

        let average_satisfaction = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64)
        };
        let escalation_rate = if count == 0 {
            0.0
        } else {
            escalated as f64 / count as f64
        };

        Self {
            total_conversations: counters.total_conversations,
            average_satisfaction,
            escalation_rate,
            resolved_count: counters.resolved_count,
            sentiment_distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::conversation::{Event, MessagePayload, Rating, SessionState};
    use crate::lexicon::Emotion;
    use crate::sentiment::classify;
    use chrono::Utc;

    fn run(events: Vec<Event>) -> SessionState {
        events
            .into_iter()
            .fold(SessionState::new(), |s, e| s.apply(e, Utc::now()).state)
    }

    fn user(text: &str) -> Event {
        Event::AddMessage(MessagePayload::user(text, classify(text), 0.0))
    }

    #[test]
    fn empty_session() {
        let a = SessionState::new().analytics();
        assert_eq!(a.total_conversations, 0);
        assert_eq!(a.average_satisfaction, None);
        assert_eq!(a.escalation_rate, 0.0);
        assert!(a.sentiment_distribution.is_empty());
    }

    #[test]
    fn derived_from_conversations() {
        let s = run(vec![
            Event::StartConversation,
            user("I hate this"),
            Event::AddMessage(MessagePayload::bot("sorry", vec![])),
            Event::EndConversation { rating: Rating::new(4) },
            Event::StartConversation,
            user("great"),
            Event::EndConversation { rating: Rating::new(2) },
            Event::StartConversation,
            user("hello"),
            Event::EscalateConversation,
            Event::StartConversation,
        ]);
        let a = s.analytics();
        assert_eq!(a.total_conversations, 2);
        assert_eq!(a.resolved_count, 2);
        assert_eq!(a.average_satisfaction, Some(3.0));
        assert!((a.escalation_rate - 0.25).abs() < 1e-9);
        assert_eq!(a.sentiment_distribution.get(&Emotion::Angry), Some(&1));
        assert_eq!(a.sentiment_distribution.get(&Emotion::Happy), Some(&1));
        assert_eq!(a.sentiment_distribution.get(&Emotion::Neutral), Some(&1));
        assert_eq!(a.sentiment_distribution.values().sum::<usize>(), 3);
    }
}
