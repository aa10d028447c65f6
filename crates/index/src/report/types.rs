//! Report types.

use crate::types::{Article, Category, Region, ScoredArticle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to one of the articles a report was synthesized from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based position in the ranked input list
    pub number: usize,
    pub article_id: String,
    pub title: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    pub published_at: DateTime<Utc>,
}

impl Citation {
    pub fn new(number: usize, article: &Article) -> Self {
        Self {
            number,
            article_id: article.id.clone(),
            title: article.title.clone(),
            source: article.source.clone(),
            url: article.url.clone(),
            published_at: article.published_at,
        }
    }
}

/// Synthesized answer to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub answer: String,
    pub citations: Vec<Citation>,
}

impl Report {
    /// Answer used when no articles matched, so nothing can be cited.
    pub fn no_information(query: &str) -> Self {
        Self {
            answer: format!(
                "I could not find any recent news coverage about \"{}\".",
                query.trim()
            ),
            citations: Vec::new(),
        }
    }

    /// Answer built from the ranked results alone, for when synthesis is
    /// unavailable. Every result is cited in rank order.
    pub fn fallback(query: &str, articles: &[ScoredArticle]) -> Self {
        let Some(top) = articles.first() else {
            return Self::no_information(query);
        };

        Self {
            answer: format!(
                "Found {} articles related to '{}'. Top result: '{}' from {}.",
                articles.len(),
                query.trim(),
                top.article.title,
                top.article.source
            ),
            citations: articles
                .iter()
                .enumerate()
                .map(|(i, scored)| Citation::new(i + 1, &scored.article))
                .collect(),
        }
    }
}

/// Short digest of a trending bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingDigest {
    pub region: Region,
    pub category: Category,
    pub summary: String,
    /// Articles the digest was written from, best first
    pub article_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::article;

    #[test]
    fn test_fallback_names_top_result() {
        let articles = vec![
            ScoredArticle {
                article: article("s1", "Cricket test series win", Region::India, Category::Sports, 1),
                score: 0.9,
            },
            ScoredArticle {
                article: article("s2", "Kohli scores again", Region::India, Category::Sports, 2),
                score: 0.6,
            },
        ];

        let report = Report::fallback(" cricket ", &articles);
        assert_eq!(
            report.answer,
            "Found 2 articles related to 'cricket'. Top result: 'Cricket test series win' from Wire."
        );
        let cited: Vec<(usize, &str)> = report
            .citations
            .iter()
            .map(|c| (c.number, c.article_id.as_str()))
            .collect();
        assert_eq!(cited, vec![(1, "s1"), (2, "s2")]);
    }

    #[test]
    fn test_fallback_without_results() {
        assert_eq!(Report::fallback("mars", &[]), Report::no_information("mars"));
    }
}
