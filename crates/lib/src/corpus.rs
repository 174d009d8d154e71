//! Knowledge corpus: the support articles available for retrieval and browsing.
//!
//! The built-in corpus is used unless `knowledge.corpusPath` points at a JSON array of articles.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One support article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
}

/// Ordered collection of articles. Order is significant: it breaks retrieval ties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeCorpus {
    articles: Vec<Article>,
}

fn article(id: &str, title: &str, content: &str, tags: &[&str], category: &str) -> Article {
    Article {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        category: category.to_string(),
    }
}

impl KnowledgeCorpus {
    /// Build a corpus, rejecting duplicate article ids.
    pub fn new(articles: Vec<Article>) -> Result<Self> {
        let mut seen = HashSet::new();
        for a in &articles {
            if !seen.insert(a.id.as_str()) {
                anyhow::bail!("duplicate article id in corpus: {}", a.id);
            }
        }
        Ok(Self { articles })
    }

    /// The four articles the assistant ships with.
    pub fn builtin() -> Self {
        Self {
            articles: vec![
                article(
                    "1",
                    "Password Reset Process",
                    "To reset your password: 1) Go to login page 2) Click \"Forgot Password\" 3) Enter your email 4) Check your inbox for reset link 5) Follow the instructions in the email",
                    &["password", "reset", "login", "security"],
                    "Account Management",
                ),
                article(
                    "2",
                    "Billing and Payment Issues",
                    "For billing concerns: Check your payment method is valid, ensure sufficient funds, contact billing support if charges appear incorrect. We process payments monthly on your signup date.",
                    &["billing", "payment", "charges", "subscription"],
                    "Billing",
                ),
                article(
                    "3",
                    "Technical Support Guidelines",
                    "Common troubleshooting: Clear browser cache, check internet connection, try different browser, restart your device. For persistent issues, contact our technical support team.",
                    &["troubleshooting", "technical", "browser", "connection"],
                    "Technical Support",
                ),
                article(
                    "4",
                    "Account Security Best Practices",
                    "Secure your account by: Using strong passwords, enabling two-factor authentication, not sharing login credentials, logging out from shared devices, reviewing account activity regularly.",
                    &["security", "account", "2fa", "best practices"],
                    "Security",
                ),
            ],
        }
    }

    /// Load a corpus from a JSON array of articles.
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading corpus from {}", path.display()))?;
        let articles: Vec<Article> = serde_json::from_str(&s)
            .with_context(|| format!("parsing corpus from {}", path.display()))?;
        log::info!("loaded {} article(s) from {}", articles.len(), path.display());
        Self::new(articles).with_context(|| format!("validating corpus {}", path.display()))
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn find_by_title(&self, title: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.title == title)
    }

    /// Distinct categories in corpus order.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for a in &self.articles {
            if !a.category.is_empty() && !out.contains(&a.category.as_str()) {
                out.push(&a.category);
            }
        }
        out
    }

    /// Knowledge-base browsing filter: case-insensitive search over title, content and tags,
    /// restricted to `category` when given. An empty search term matches everything.
    pub fn browse(&self, search: &str, category: Option<&str>) -> Vec<&Article> {
        let needle = search.trim().to_lowercase();
        self.articles
            .iter()
            .filter(|a| {
                needle.is_empty()
                    || a.title.to_lowercase().contains(&needle)
                    || a.content.to_lowercase().contains(&needle)
                    || a.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .filter(|a| category.map_or(true, |c| a.category == c))
            .collect()
    }
}
