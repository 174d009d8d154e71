//! Keyword retrieval over the knowledge corpus.
//!
//! Score per article: +2 when the whole query appears in the title, +1 per query token
//! (longer than 3 chars) found in the content, +1.5 per tag found in the query.

use crate::corpus::KnowledgeCorpus;

pub const DEFAULT_LIMIT: usize = 3;
const TITLE_WEIGHT: f64 = 2.0;
const TOKEN_WEIGHT: f64 = 1.0;
const TAG_WEIGHT: f64 = 1.5;
const MIN_TOKEN_CHARS: usize = 4;

/// Score every article against the query. Returns (article index, score) for all
/// positively scored articles, best first; ties keep corpus order.
pub fn retrieve_scored(query: &str, corpus: &KnowledgeCorpus) -> Vec<(usize, f64)> {
    let query = query.to_lowercase();
    let tokens: Vec<&str> = query
        .split_ascii_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .collect();

    let mut scored: Vec<(usize, f64)> = corpus
        .articles()
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let mut score = 0.0;
            if doc.title.to_lowercase().contains(&query) {
                score += TITLE_WEIGHT;
            }
            let content = doc.content.to_lowercase();
            score += tokens.iter().filter(|t| content.contains(**t)).count() as f64 * TOKEN_WEIGHT;
            score += doc
                .tags
                .iter()
                .filter(|tag| query.contains(tag.to_lowercase().as_str()))
                .count() as f64
                * TAG_WEIGHT;
            (i, score)
        })
        .filter(|(_, score)| *score > 0.0)
        .collect();

    // sort_by is stable, so equal scores stay in corpus order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}

/// Titles of the best `limit` articles for the query, best first. Empty when nothing scores.
pub fn retrieve(query: &str, corpus: &KnowledgeCorpus, limit: usize) -> Vec<String> {
    let titles: Vec<String> = retrieve_scored(query, corpus)
        .into_iter()
        .take(limit)
        .map(|(i, _)| corpus.articles()[i].title.clone())
        .collect();
    log::debug!("retrieval: {} document(s) for query", titles.len());
    titles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Article;

    fn doc(id: &str, title: &str, content: &str, tags: &[&str]) -> Article {
        Article {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            category: String::new(),
        }
    }

    #[test]
    fn password_question_finds_reset_article() {
        let corpus = KnowledgeCorpus::builtin();
        let docs = retrieve("How do I reset my password?", &corpus, DEFAULT_LIMIT);
        assert_eq!(docs.first().map(String::as_str), Some("Password Reset Process"));
    }

    #[test]
    fn nothing_scores_means_empty() {
        let corpus = KnowledgeCorpus::builtin();
        assert!(retrieve("hi", &corpus, DEFAULT_LIMIT).is_empty());
        assert!(retrieve("billing", &corpus, 0).is_empty());
    }

    #[test]
    fn respects_limit_and_score_order() {
        let corpus = KnowledgeCorpus::new(vec![
            doc("1", "Alpha", "shipping", &[]),
            doc("2", "Beta", "shipping returns", &["returns"]),
            doc("3", "Gamma", "shipping", &[]),
            doc("4", "Delta", "unrelated", &[]),
        ])
        .unwrap();
        let scored = retrieve_scored("shipping returns", &corpus);
        assert_eq!(scored, vec![(1, 3.5), (0, 1.0), (2, 1.0)]);
        assert_eq!(
            retrieve("shipping returns", &corpus, 2),
            vec!["Beta".to_string(), "Alpha".to_string()]
        );
    }

    #[test]
    fn title_match_needs_whole_query() {
        let corpus = KnowledgeCorpus::new(vec![doc("1", "Billing Issues", "", &[])]).unwrap();
        assert_eq!(retrieve_scored("billing", &corpus), vec![(0, 2.0)]);
        assert!(retrieve_scored("billing help", &corpus).is_empty());
    }

    #[test]
    fn empty_query_matches_every_title_but_blank_matches_none() {
        let corpus = KnowledgeCorpus::builtin();
        assert_eq!(
            retrieve("", &corpus, DEFAULT_LIMIT),
            vec![
                "Password Reset Process".to_string(),
                "Billing and Payment Issues".to_string(),
                "Technical Support Guidelines".to_string(),
            ]
        );
        assert!(retrieve("   ", &corpus, DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn deterministic_for_same_query() {
        let corpus = KnowledgeCorpus::builtin();
        let q = "my payment failed and the browser shows an error";
        assert_eq!(retrieve(q, &corpus, 3), retrieve(q, &corpus, 3));
        assert!(retrieve(q, &corpus, 3).len() <= 3);
    }
}
