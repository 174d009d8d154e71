//! Support desk: serialized dispatch over [`SessionState`] and the per-turn protocol.
//!
//! Every transition runs under one lock and each applied state is published on a watch
//! channel. A turn records the user message, awaits the responder, and commits the reply
//! only if the conversation it was issued for is still current. Automatic escalation runs
//! as a scheduled task keyed by conversation id; starting a new conversation aborts the
//! tasks of every other conversation.

use crate::analytics::AnalyticsSnapshot;
use crate::conversation::{
    ConversationId, Event, Message, MessagePayload, Outcome, Rating, SessionState, Transition,
};
use crate::lexicon::Emotion;
use crate::pipeline::Pipeline;
use crate::response::{HeuristicResponder, Responder};
use crate::sentiment::Sentiment;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// State plus its publisher; shared with scheduled tasks.
struct Shared {
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionState>,
}

impl Shared {
    async fn dispatch(&self, event: Event) -> Outcome {
        let mut state = self.state.lock().await;
        self.apply_locked(&mut state, event)
    }

    /// Apply one event to already-locked state, publishing it when applied.
    fn apply_locked(&self, state: &mut SessionState, event: Event) -> Outcome {
        let name = event.name();
        let Transition {
            state: next,
            outcome,
        } = std::mem::take(state).apply(event, Utc::now());
        *state = next;
        match &outcome {
            Outcome::Rejected(reason) => {
                log::warn!("{} ignored: {}", name, reason);
            }
            Outcome::Started(id) => {
                log::info!("conversation {} started", id);
                self.updates.send_replace(state.clone());
            }
            Outcome::Applied => {
                log::debug!("{} applied", name);
                self.updates.send_replace(state.clone());
            }
        }
        outcome
    }
}

struct ScheduledEscalation {
    conversation: ConversationId,
    handle: JoinHandle<()>,
}

/// Result of [`Desk::run_turn`].
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Both messages were recorded.
    Replied {
        user: Message,
        reply: Message,
        escalation_scheduled: bool,
    },
    /// The conversation changed while the reply was pending; the reply was dropped.
    Discarded { issued_for: ConversationId },
    /// No current conversation; nothing was recorded.
    NoConversation,
    /// Blank input.
    Ignored,
}

/// The support desk. Generic over the responder so the reply source can be swapped.
pub struct Desk<R: Responder> {
    pipeline: Arc<Pipeline>,
    responder: R,
    shared: Arc<Shared>,
    turn_lock: Mutex<()>,
    scheduled: Mutex<Vec<ScheduledEscalation>>,
}

impl Desk<HeuristicResponder> {
    /// Desk that answers with the heuristic responder over `pipeline`.
    pub fn heuristic(pipeline: Arc<Pipeline>) -> Self {
        let responder = HeuristicResponder::new(Arc::clone(&pipeline));
        Self::new(pipeline, responder)
    }
}

impl<R: Responder> Desk<R> {
    pub fn new(pipeline: Arc<Pipeline>, responder: R) -> Self {
        let (updates, _) = watch::channel(SessionState::new());
        Self {
            pipeline,
            responder,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::new()),
                updates,
            }),
            turn_lock: Mutex::new(()),
            scheduled: Mutex::new(Vec::new()),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Receive every applied state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.updates.subscribe()
    }

    pub async fn snapshot(&self) -> SessionState {
        self.shared.state.lock().await.clone()
    }

    pub async fn analytics(&self) -> AnalyticsSnapshot {
        self.shared.state.lock().await.analytics()
    }

    /// Apply one event. Starting a conversation cancels escalations scheduled for the others.
    pub async fn dispatch(&self, event: Event) -> Outcome {
        let outcome = self.shared.dispatch(event).await;
        if let Outcome::Started(id) = outcome {
            self.cancel_scheduled_except(id).await;
        }
        outcome
    }

    pub async fn start_conversation(&self) -> Option<ConversationId> {
        match self.dispatch(Event::StartConversation).await {
            Outcome::Started(id) => Some(id),
            _ => None,
        }
    }

    pub async fn end_conversation(&self, rating: Option<Rating>) -> Outcome {
        self.dispatch(Event::EndConversation { rating }).await
    }

    pub async fn escalate(&self) -> Outcome {
        self.dispatch(Event::EscalateConversation).await
    }

    /// Run one turn for the current conversation.
    pub async fn run_turn(&self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }
        let _turn = self.turn_lock.lock().await;

        let sentiment = self.pipeline.classify(text);
        let risk = self.pipeline.score(text, &sentiment);

        let (issued_for, user, history) = {
            let mut state = self.shared.state.lock().await;
            let Some(id) = state.current_id() else {
                log::warn!("turn ignored: no current conversation");
                return TurnOutcome::NoConversation;
            };
            let outcome = self.shared.apply_locked(
                &mut state,
                Event::AddMessage(MessagePayload::user(text, sentiment, risk)),
            );
            if !outcome.is_applied() {
                return TurnOutcome::NoConversation;
            }
            let history = state
                .conversation(id)
                .map(|c| c.messages.clone())
                .unwrap_or_default();
            let Some(user) = history.last().cloned() else {
                return TurnOutcome::NoConversation;
            };
            self.shared.apply_locked(&mut state, Event::SetTyping(true));
            (id, user, history)
        };

        let reply = self.responder.respond(text, &sentiment, &history).await;

        let recorded = {
            let mut state = self.shared.state.lock().await;
            let recorded = if state.current_id() == Some(issued_for) {
                self.shared.apply_locked(
                    &mut state,
                    Event::AddMessage(MessagePayload::bot(reply.text, reply.retrieved_docs)),
                );
                state
                    .conversation(issued_for)
                    .and_then(|c| c.messages.last().cloned())
            } else {
                log::warn!(
                    "discarding reply for {}: conversation is no longer current",
                    issued_for
                );
                None
            };
            self.shared.apply_locked(&mut state, Event::SetTyping(false));
            recorded
        };
        let Some(reply) = recorded else {
            return TurnOutcome::Discarded { issued_for };
        };

        let escalation_scheduled = self.should_auto_escalate(&sentiment);
        if escalation_scheduled {
            self.schedule_escalation(issued_for).await;
        }
        TurnOutcome::Replied {
            user,
            reply,
            escalation_scheduled,
        }
    }

    fn should_auto_escalate(&self, sentiment: &Sentiment) -> bool {
        sentiment.emotion == Emotion::Angry
            && sentiment.confidence > self.pipeline.settings.escalation_threshold
    }

    async fn schedule_escalation(&self, id: ConversationId) {
        let delay = Duration::from_millis(self.pipeline.settings.escalation_delay_ms);
        let shared = Arc::clone(&self.shared);
        log::info!("escalation of {} scheduled in {:?}", id, delay);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = shared.state.lock().await;
            if state.current_id() != Some(id) {
                log::info!("escalation of {} skipped: no longer current", id);
                return;
            }
            if shared
                .apply_locked(&mut state, Event::EscalateConversation)
                .is_applied()
            {
                log::info!("conversation {} escalated", id);
            }
        });
        let mut scheduled = self.scheduled.lock().await;
        scheduled.retain(|t| !t.handle.is_finished());
        scheduled.push(ScheduledEscalation {
            conversation: id,
            handle,
        });
    }

    async fn cancel_scheduled_except(&self, keep: ConversationId) {
        let mut scheduled = self.scheduled.lock().await;
        scheduled.retain(|t| {
            if t.conversation == keep {
                return !t.handle.is_finished();
            }
            if !t.handle.is_finished() {
                log::info!("cancelling scheduled escalation of {}", t.conversation);
                t.handle.abort();
            }
            false
        });
    }

    /// Wait for every scheduled escalation to finish (or be cancelled).
    pub async fn settle(&self) {
        let tasks: Vec<ScheduledEscalation> = std::mem::take(&mut *self.scheduled.lock().await);
        for t in tasks {
            let _ = t.handle.await;
        }
    }
}
