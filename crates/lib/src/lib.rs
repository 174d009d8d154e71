//! Support desk core: classify a customer utterance, score its escalation risk, retrieve
//! support articles, synthesize a reply, and record the turn in the conversation state machine.

pub mod analytics;
pub mod config;
pub mod conversation;
pub mod corpus;
pub mod desk;
pub mod escalation;
pub mod lexicon;
pub mod pipeline;
pub mod response;
pub mod retrieval;
pub mod sentiment;
