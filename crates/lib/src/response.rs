//! Reply synthesis: empathy prefix by emotion, topic body by keyword routing,
//! and a human-agent offer when escalation risk is high.
//!
//! [`synthesize`] is pure. [`Responder`] is the async seam the desk awaits; the
//! heuristic responder simulates composition latency before synthesizing.

use crate::conversation::Message;
use crate::lexicon::Emotion;
use crate::pipeline::Pipeline;
use crate::sentiment::Sentiment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const CONTEXT_EXCERPT_CHARS: usize = 300;

pub const HUMAN_AGENT_OFFER: &str = "I want to ensure you have the best possible experience. If you'd prefer to speak with a human agent, I can arrange that for you right away.";

/// Synthesized bot reply and the titles that grounded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub retrieved_docs: Vec<String>,
}

/// Topic families, in routing priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    AccountAccess,
    Billing,
    Technical,
    Retention,
    General,
}

const TOPIC_KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::AccountAccess, &["password", "login"]),
    (Topic::Billing, &["billing", "payment", "charge"]),
    (Topic::Technical, &["technical", "not working", "error"]),
    (Topic::Retention, &["cancel", "refund"]),
];

impl Topic {
    /// First family with a keyword in the text wins; otherwise General.
    pub fn detect(text: &str) -> Topic {
        let lower = text.to_lowercase();
        TOPIC_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(topic, _)| *topic)
            .unwrap_or(Topic::General)
    }
}

pub fn empathy_prefix(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Angry => "I understand your frustration, and I sincerely apologize for the inconvenience. Let me help resolve this immediately. ",
        Emotion::Frustrated => "I can see this has been frustrating for you. Let me do my best to help you get this sorted out quickly. ",
        Emotion::Confused => "I'd be happy to clarify this for you. Let me break this down step by step. ",
        Emotion::Happy => "I'm glad to help! ",
        Emotion::Neutral => "Thank you for reaching out. I'm here to help. ",
    }
}

fn topic_body(topic: Topic, context: &str) -> String {
    match topic {
        Topic::AccountAccess => "For password issues: You can reset your password by going to the login page and clicking 'Forgot Password'. Enter your email address, and you'll receive a secure reset link. If you don't see the email within a few minutes, please check your spam folder. The link will be valid for 24 hours for security purposes.".to_string(),
        Topic::Billing => "Regarding billing: I can help you with payment concerns. Please check that your payment method is current and has sufficient funds. Payments are processed monthly on your signup anniversary date. If you see unexpected charges, I can review your account details. Would you like me to look into any specific billing questions?".to_string(),
        Topic::Technical => "For technical issues: Let's troubleshoot this together. First, try clearing your browser cache and cookies, then restart your browser. If that doesn't help, try using a different browser or device. Also, ensure your internet connection is stable. If the problem persists, I can escalate this to our technical team for further investigation.".to_string(),
        Topic::Retention => "I understand you're considering changes to your account. I'd love the opportunity to address any concerns first. Could you tell me more about what's not meeting your expectations? We have various options available, and I want to make sure we find the best solution for your needs.".to_string(),
        Topic::General if !context.is_empty() => {
            let excerpt: String = context.chars().take(CONTEXT_EXCERPT_CHARS).collect();
            format!(
                "Based on your question, here's what I can help with: {}... Is there a specific aspect you'd like me to explain further?",
                excerpt
            )
        }
        Topic::General => "I want to make sure I provide you with the most helpful information. Could you provide a bit more detail about what you're looking for? This will help me give you a more targeted response.".to_string(),
    }
}

/// Compose the reply for one user utterance. Depends only on its inputs and the pipeline's static data.
pub fn synthesize(
    pipeline: &Pipeline,
    user_text: &str,
    sentiment: &Sentiment,
    history: &[Message],
) -> Reply {
    let retrieved_docs = pipeline.retrieve(user_text);

    // Matched contents in corpus order.
    let context = pipeline
        .corpus
        .articles()
        .iter()
        .filter(|a| retrieved_docs.contains(&a.title))
        .map(|a| a.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let topic = Topic::detect(user_text);
    let mut text = String::from(empathy_prefix(sentiment.emotion));
    text.push_str(&topic_body(topic, &context));

    let risk = pipeline.score(user_text, sentiment);
    if risk > pipeline.settings.offer_threshold {
        text.push_str("\n\n");
        text.push_str(HUMAN_AGENT_OFFER);
    }
    log::debug!(
        "response: topic {:?}, {} doc(s), risk {:.2}, history {} message(s)",
        topic,
        retrieved_docs.len(),
        risk,
        history.len()
    );

    Reply {
        text,
        retrieved_docs,
    }
}

/// Produces the bot reply for a turn. The desk awaits this between recording the user
/// message and recording the reply.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, user_text: &str, sentiment: &Sentiment, history: &[Message]) -> Reply;
}

/// Heuristic responder: waits the configured response delay, then runs [`synthesize`].
pub struct HeuristicResponder {
    pipeline: Arc<Pipeline>,
}

impl HeuristicResponder {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Responder for HeuristicResponder {
    async fn respond(&self, user_text: &str, sentiment: &Sentiment, history: &[Message]) -> Reply {
        let delay = self.pipeline.settings.response_delay_ms;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.pipeline.synthesize(user_text, sentiment, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::KnowledgeCorpus;
    use crate::sentiment::classify;

    fn reply_for(text: &str) -> Reply {
        let pipeline = Pipeline::builtin();
        pipeline.synthesize(text, &classify(text), &[])
    }

    #[test]
    fn topic_priority_order() {
        assert_eq!(Topic::detect("login and billing"), Topic::AccountAccess);
        assert_eq!(Topic::detect("the payment error"), Topic::Billing);
        assert_eq!(Topic::detect("It is NOT WORKING"), Topic::Technical);
        assert_eq!(Topic::detect("please cancel"), Topic::Retention);
        assert_eq!(Topic::detect("hello there"), Topic::General);
    }

    #[test]
    fn password_question_gets_reset_guidance_without_offer() {
        let r = reply_for("How do I reset my password?");
        assert!(r.text.starts_with(empathy_prefix(Emotion::Neutral)));
        assert!(r.text.contains("For password issues:"));
        assert!(!r.text.contains(HUMAN_AGENT_OFFER));
        assert_eq!(r.retrieved_docs, vec!["Password Reset Process".to_string()]);
    }

    #[test]
    fn complaint_gets_retention_and_offer() {
        let r = reply_for("This is unacceptable, I want a refund and to speak to your manager!");
        assert!(r.text.contains("considering changes to your account"));
        assert!(r.text.ends_with(&format!("\n\n{}", HUMAN_AGENT_OFFER)));
    }

    #[test]
    fn angry_prefix() {
        let r = reply_for("I hate this, it's terrible");
        assert!(r.text.starts_with(empathy_prefix(Emotion::Angry)));
    }

    #[test]
    fn general_branch_quotes_matched_context() {
        let r = reply_for("my browser connection keeps dropping");
        assert_eq!(
            r.retrieved_docs,
            vec!["Technical Support Guidelines".to_string()]
        );
        assert!(r.text.contains("Based on your question, here's what I can help with: Common troubleshooting"));
        let body = r
            .text
            .split("here's what I can help with: ")
            .nth(1)
            .unwrap();
        let excerpt = body.split("...").next().unwrap();
        assert!(excerpt.chars().count() <= CONTEXT_EXCERPT_CHARS);
    }

    #[test]
    fn general_branch_cuts_long_context_at_excerpt_limit() {
        let text = "my account security on the browser connection";
        let r = reply_for(text);
        assert_eq!(r.retrieved_docs.len(), 3);
        let corpus = KnowledgeCorpus::builtin();
        let joined = corpus
            .articles()
            .iter()
            .filter(|a| r.retrieved_docs.contains(&a.title))
            .map(|a| a.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(joined.chars().count() > CONTEXT_EXCERPT_CHARS);
        let excerpt: String = joined.chars().take(CONTEXT_EXCERPT_CHARS).collect();
        assert_eq!(excerpt.chars().count(), CONTEXT_EXCERPT_CHARS);
        assert!(r.text.contains(&format!(
            "here's what I can help with: {}... Is there",
            excerpt
        )));
    }

    #[test]
    fn general_branch_asks_for_detail_when_nothing_matches() {
        let r = reply_for("hi");
        assert!(r.retrieved_docs.is_empty());
        assert!(r.text.contains("Could you provide a bit more detail"));
    }

    #[tokio::test(start_paused = true)]
    async fn heuristic_responder_waits_then_matches_pure_synthesis() {
        let pipeline = Arc::new(Pipeline::builtin());
        let responder = HeuristicResponder::new(Arc::clone(&pipeline));
        let text = "billing question";
        let s = classify(text);
        let start = tokio::time::Instant::now();
        let reply = responder.respond(text, &s, &[]).await;
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert_eq!(reply, pipeline.synthesize(text, &s, &[]));
    }
}
