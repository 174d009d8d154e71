//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.supportdesk/config.json`) and environment.
//! Every field has a default, so an empty `{}` file (or no file) gives the stock assistant.

use crate::lexicon::Emotion;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Turn timing and decision thresholds.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Keyword overrides for the classifier and escalation scorer.
    #[serde(default)]
    pub lexicon: LexiconConfig,

    /// Knowledge corpus source.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// Timing and thresholds for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Simulated time to compose a reply (default 1500). Overridden by SUPPORTDESK_RESPONSE_DELAY_MS.
    #[serde(default = "default_response_delay_ms")]
    pub response_delay_ms: u64,

    /// Delay between the bot reply and the automatic escalation (default 1000).
    #[serde(default = "default_escalation_delay_ms")]
    pub escalation_delay_ms: u64,

    /// Maximum documents retrieved per turn (default 3).
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,

    /// Escalation risk above which the reply offers a human agent (default 0.6).
    #[serde(default = "default_offer_threshold")]
    pub offer_threshold: f64,

    /// Angry-sentiment confidence above which the conversation is escalated (default 0.8).
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: f64,
}

fn default_response_delay_ms() -> u64 {
    1500
}

fn default_escalation_delay_ms() -> u64 {
    1000
}

fn default_retrieval_limit() -> usize {
    crate::retrieval::DEFAULT_LIMIT
}

fn default_offer_threshold() -> f64 {
    0.6
}

fn default_escalation_threshold() -> f64 {
    0.8
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            response_delay_ms: default_response_delay_ms(),
            escalation_delay_ms: default_escalation_delay_ms(),
            retrieval_limit: default_retrieval_limit(),
            offer_threshold: default_offer_threshold(),
            escalation_threshold: default_escalation_threshold(),
        }
    }
}

/// Lexicon overrides. Absent fields keep the built-in keyword sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexiconConfig {
    /// Emotion -> keywords. When set, replaces the whole emotion lexicon; emotions left out score zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotions: Option<HashMap<Emotion, Vec<String>>>,

    /// Replaces the escalation keyword list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_keywords: Option<Vec<String>>,
}

/// Knowledge corpus settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeConfig {
    /// JSON array of articles replacing the built-in corpus. Relative paths are resolved against the config file's parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_path: Option<PathBuf>,
}

/// Resolve the response delay: env SUPPORTDESK_RESPONSE_DELAY_MS overrides config.
pub fn resolve_response_delay_ms(config: &Config) -> u64 {
    std::env::var("SUPPORTDESK_RESPONSE_DELAY_MS")
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(config.pipeline.response_delay_ms)
}

/// Resolve the corpus file, if configured (relative paths resolved against the config file's parent).
pub fn resolve_corpus_path(config: &Config, config_path: &Path) -> Option<PathBuf> {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.knowledge.corpus_path {
        Some(p) if !p.as_os_str().is_empty() => {
            if p.is_absolute() {
                Some(p.clone())
            } else {
                Some(config_parent.join(p))
            }
        }
        _ => None,
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SUPPORTDESK_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".supportdesk").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Create the config directory and write a default `config.json` if missing. Returns the directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let body = serde_json::to_string_pretty(&Config::default())
            .context("serializing default config")?;
        std::fs::write(config_path, body)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.pipeline.response_delay_ms, 1500);
        assert_eq!(config.pipeline.escalation_delay_ms, 1000);
        assert_eq!(config.pipeline.retrieval_limit, 3);
        assert!(config.lexicon.emotions.is_none());
    }

    #[test]
    fn partial_pipeline_and_lexicon() {
        let config: Config = serde_json::from_str(
            r#"{"pipeline":{"offerThreshold":0.5},"lexicon":{"emotions":{"angry":["livid"]},"escalationKeywords":["chargeback"]}}"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.offer_threshold, 0.5);
        assert_eq!(config.pipeline.escalation_threshold, 0.8);
        let emotions = config.lexicon.emotions.unwrap();
        assert_eq!(emotions.get(&Emotion::Angry), Some(&vec!["livid".to_string()]));
        assert_eq!(
            config.lexicon.escalation_keywords,
            Some(vec!["chargeback".to_string()])
        );
    }

    #[test]
    fn resolve_corpus_path_relative_and_absolute() {
        let mut config = Config::default();
        let path = Path::new("/home/user/.supportdesk/config.json");
        assert_eq!(resolve_corpus_path(&config, path), None);
        config.knowledge.corpus_path = Some(PathBuf::from("kb/articles.json"));
        assert_eq!(
            resolve_corpus_path(&config, path),
            Some(PathBuf::from("/home/user/.supportdesk/kb/articles.json"))
        );
        config.knowledge.corpus_path = Some(PathBuf::from("/srv/kb.json"));
        assert_eq!(
            resolve_corpus_path(&config, path),
            Some(PathBuf::from("/srv/kb.json"))
        );
    }

    #[test]
    fn init_writes_loadable_default() {
        let dir = std::env::temp_dir().join(format!("supportdesk-init-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");
        init_config_dir(&path).unwrap();
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.pipeline, PipelineConfig::default());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
