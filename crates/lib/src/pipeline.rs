//! Static resources for the message pipeline: lexicons, corpus, and settings, materialized once at startup.

use crate::config::{self, Config, PipelineConfig};
use crate::conversation::Message;
use crate::corpus::KnowledgeCorpus;
use crate::escalation;
use crate::lexicon::{EmotionLexicon, EscalationLexicon};
use crate::response::{self, Reply};
use crate::retrieval;
use crate::sentiment::{self, Sentiment};
use anyhow::Result;
use std::path::Path;

/// Lexicons, corpus, and settings shared by every turn. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub corpus: KnowledgeCorpus,
    pub emotions: EmotionLexicon,
    pub escalation: EscalationLexicon,
    pub settings: PipelineConfig,
}

impl Pipeline {
    /// Built-in lexicons and corpus with default settings.
    pub fn builtin() -> Self {
        Self {
            corpus: KnowledgeCorpus::builtin(),
            ..Self::default()
        }
    }

    /// Build from loaded config, reading the corpus file when one is configured.
    pub fn from_config(config: &Config, config_path: &Path) -> Result<Self> {
        let corpus = match config::resolve_corpus_path(config, config_path) {
            Some(p) => KnowledgeCorpus::load(&p)?,
            None => KnowledgeCorpus::builtin(),
        };
        let emotions = config
            .lexicon
            .emotions
            .as_ref()
            .map(EmotionLexicon::from_map)
            .unwrap_or_default();
        let escalation = config
            .lexicon
            .escalation_keywords
            .as_ref()
            .map(|k| EscalationLexicon::new(k.as_slice()))
            .unwrap_or_default();
        let mut settings = config.pipeline.clone();
        settings.response_delay_ms = config::resolve_response_delay_ms(config);
        Ok(Self {
            corpus,
            emotions,
            escalation,
            settings,
        })
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        sentiment::classify_with(&self.emotions, text)
    }

    pub fn score(&self, text: &str, sentiment: &Sentiment) -> f64 {
        escalation::score_with(&self.escalation, text, sentiment)
    }

    /// Retrieve up to `settings.retrieval_limit` titles.
    pub fn retrieve(&self, query: &str) -> Vec<String> {
        retrieval::retrieve(query, &self.corpus, self.settings.retrieval_limit)
    }

    pub fn synthesize(&self, user_text: &str, sentiment: &Sentiment, history: &[Message]) -> Reply {
        response::synthesize(self, user_text, sentiment, history)
    }
}
