//! Conversation state machine.
//!
//! [`SessionState::apply`] is the single transition function: it takes the state and one
//! [`Event`] and returns the next state plus whether the event was applied. Conversations
//! live in a keyed collection; the current conversation is only a key into it.
//!
//! Status edges: `active -> resolved` and `active -> escalated`. Both targets are terminal;
//! a new conversation is started instead of reopening one.

use crate::analytics::{AnalyticsCounters, AnalyticsSnapshot};
use crate::sentiment::Sentiment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Message id, assigned monotonically across the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Conversation id, assigned monotonically across the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub u64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conv-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One recorded utterance. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Set on user messages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    /// Set on user messages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_risk: Option<f64>,
    /// Set on bot messages that were grounded in at least one document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_docs: Option<Vec<String>>,
}

/// Message content before id and timestamp are assigned. Only constructible through
/// [`MessagePayload::user`] and [`MessagePayload::bot`], which keep the per-sender fields consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePayload {
    text: String,
    sender: Sender,
    sentiment: Option<Sentiment>,
    escalation_risk: Option<f64>,
    retrieved_docs: Option<Vec<String>>,
}

impl MessagePayload {
    pub fn user(text: impl Into<String>, sentiment: Sentiment, escalation_risk: f64) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            sentiment: Some(sentiment),
            escalation_risk: Some(escalation_risk.clamp(0.0, 1.0)),
            retrieved_docs: None,
        }
    }

    /// Bot reply; an empty document list is recorded as no documents.
    pub fn bot(text: impl Into<String>, retrieved_docs: Vec<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
            sentiment: None,
            escalation_risk: None,
            retrieved_docs: if retrieved_docs.is_empty() {
                None
            } else {
                Some(retrieved_docs)
            },
        }
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    fn into_message(self, id: MessageId, timestamp: DateTime<Utc>) -> Message {
        Message {
            id,
            text: self.text,
            sender: self.sender,
            timestamp,
            sentiment: self.sentiment,
            escalation_risk: self.escalation_risk,
            retrieved_docs: self.retrieved_docs,
        }
    }
}

/// Customer satisfaction rating, 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct InvalidRating(pub u8);

impl Rating {
    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = InvalidRating;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or(InvalidRating(value))
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Resolved,
    Escalated,
}

impl ConversationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ConversationStatus::Active)
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Resolved => "resolved",
            ConversationStatus::Escalated => "escalated",
        })
    }
}

/// One support session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<Message>,
    pub start_time: DateTime<Utc>,
    pub status: ConversationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_satisfaction: Option<Rating>,
    #[serde(default)]
    pub escalation_triggered: bool,
}

/// Events accepted by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StartConversation,
    AddMessage(MessagePayload),
    SetTyping(bool),
    EndConversation { rating: Option<Rating> },
    EscalateConversation,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::StartConversation => "StartConversation",
            Event::AddMessage(_) => "AddMessage",
            Event::SetTyping(_) => "SetTyping",
            Event::EndConversation { .. } => "EndConversation",
            Event::EscalateConversation => "EscalateConversation",
        }
    }
}

/// Why an event left the state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no current conversation")]
    NoCurrentConversation,
    #[error("conversation {id} is already {status}")]
    Terminal {
        id: ConversationId,
        status: ConversationStatus,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    /// StartConversation created and selected this conversation.
    Started(ConversationId),
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Outcome::Rejected(_))
    }
}

/// Result of [`SessionState::apply`].
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: SessionState,
    pub outcome: Outcome,
}

/// Session-wide state: all conversations, the current one (by key), and the typing flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    conversations: BTreeMap<ConversationId, Conversation>,
    current_conversation: Option<ConversationId>,
    is_typing: bool,
    counters: AnalyticsCounters,
    last_message_id: u64,
    last_conversation_id: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event at instant `now`. Rejected events return the state unchanged.
    pub fn apply(mut self, event: Event, now: DateTime<Utc>) -> Transition {
        let outcome = match event {
            Event::StartConversation => {
                self.last_conversation_id += 1;
                let id = ConversationId(self.last_conversation_id);
                self.conversations.insert(
                    id,
                    Conversation {
                        id,
                        messages: Vec::new(),
                        start_time: now,
                        status: ConversationStatus::Active,
                        customer_satisfaction: None,
                        escalation_triggered: false,
                    },
                );
                self.current_conversation = Some(id);
                Outcome::Started(id)
            }
            Event::AddMessage(payload) => {
                let id = MessageId(self.last_message_id + 1);
                match self.current_mut() {
                    Some(conv) => {
                        conv.messages.push(payload.into_message(id, now));
                        self.last_message_id = id.0;
                        Outcome::Applied
                    }
                    None => Outcome::Rejected(Rejection::NoCurrentConversation),
                }
            }
            Event::SetTyping(typing) => {
                self.is_typing = typing;
                Outcome::Applied
            }
            Event::EndConversation { rating } => match self.active_current() {
                Ok(conv) => {
                    conv.status = ConversationStatus::Resolved;
                    conv.customer_satisfaction = rating;
                    self.counters.resolved_count += 1;
                    self.counters.total_conversations += 1;
                    Outcome::Applied
                }
                Err(r) => Outcome::Rejected(r),
            },
            Event::EscalateConversation => match self.active_current() {
                Ok(conv) => {
                    conv.status = ConversationStatus::Escalated;
                    conv.escalation_triggered = true;
                    Outcome::Applied
                }
                Err(r) => Outcome::Rejected(r),
            },
        };
        Transition {
            state: self,
            outcome,
        }
    }

    fn current_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.current_conversation?;
        self.conversations.get_mut(&id)
    }

    fn active_current(&mut self) -> Result<&mut Conversation, Rejection> {
        let conv = self
            .current_mut()
            .ok_or(Rejection::NoCurrentConversation)?;
        if conv.status.is_terminal() {
            return Err(Rejection::Terminal {
                id: conv.id,
                status: conv.status,
            });
        }
        Ok(conv)
    }

    pub fn current_id(&self) -> Option<ConversationId> {
        self.current_conversation
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current_conversation
            .and_then(|id| self.conversations.get(&id))
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.get(&id)
    }

    /// All conversations in creation order.
    pub fn conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.values()
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn counters(&self) -> AnalyticsCounters {
        self.counters
    }

    pub fn analytics(&self) -> AnalyticsSnapshot {
        AnalyticsSnapshot::derive(self.conversations.values(), self.counters)
    }
}
