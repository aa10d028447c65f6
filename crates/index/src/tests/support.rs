//! Deterministic stubs shared by the crate's tests.

use crate::classify::tokens;
use crate::embeddings::EmbeddingProvider;
use crate::types::{Article, Category, Region};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use newsdesk_core::{AppError, AppResult};
use newsdesk_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Article published `hours_ago` before 2024-07-01 12:00 UTC.
pub(crate) fn article(
    id: &str,
    title: &str,
    region: Region,
    category: Category,
    hours_ago: i64,
) -> Article {
    let base = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
    Article {
        id: id.to_string(),
        title: title.to_string(),
        body: String::new(),
        source: "Wire".to_string(),
        url: format!("https://news.example/{}", id),
        region,
        category,
        published_at: base - Duration::hours(hours_ago),
        embedding: None,
        embedding_fingerprint: None,
    }
}

const TOPIC_DIMS: usize = 16;

const TOPICS: [&[&str]; 4] = [
    &[
        "ai", "artificial", "intelligence", "regulation", "policy", "chatbot", "technology",
        "tech", "rules", "algorithm",
    ],
    &[
        "cricket", "test", "series", "match", "wicket", "innings", "kohli", "ipl", "sports",
        "win",
    ],
    &["election", "rally", "parliament", "minister", "vote", "crowds"],
    &["vaccine", "hospital", "health", "clinic"],
];

/// Keyword-topic embedder.
///
/// The first four dimensions count topic keywords; every other word is
/// hashed into the remaining dimensions at half weight, so titles that
/// share a topic cluster and distinct titles stay distinguishable.
#[derive(Debug)]
pub(crate) struct TopicProvider;

impl TopicProvider {
    pub(crate) fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; TOPIC_DIMS];
        for token in tokens(text) {
            match TOPICS.iter().position(|words| words.contains(&token.as_str())) {
                Some(topic) => v[topic] += 1.0,
                None => {
                    let hash = token
                        .bytes()
                        .fold(7u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
                    let dim = TOPICS.len() + (hash as usize % (TOPIC_DIMS - TOPICS.len()));
                    v[dim] += 0.5;
                }
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for TopicProvider {
    fn provider_name(&self) -> &str {
        "topic"
    }

    fn model_name(&self) -> &str {
        "keywords"
    }

    fn dimensions(&self) -> usize {
        TOPIC_DIMS
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Topic embedder that returns a malformed (empty) vector for any text
/// containing `needle`.
#[derive(Debug)]
pub(crate) struct FailingProvider {
    needle: String,
}

impl FailingProvider {
    pub(crate) fn new(needle: &str) -> Self {
        Self {
            needle: needle.to_lowercase(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    fn provider_name(&self) -> &str {
        "topic"
    }

    fn model_name(&self) -> &str {
        "keywords"
    }

    fn dimensions(&self) -> usize {
        TOPIC_DIMS
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_lowercase().contains(&self.needle) {
                    Vec::new()
                } else {
                    TopicProvider::vector(t)
                }
            })
            .collect())
    }
}

/// LLM stub that replays scripted replies and records every request.
///
/// When the script runs out it keeps returning the last reply.
#[derive(Debug)]
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<AppResult<String>>>,
    last: Mutex<Option<String>>,
    pub(crate) requests: Mutex<Vec<LlmRequest>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub(crate) fn new(replies: Vec<AppResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let next = self.replies.lock().unwrap().pop_front();
        let content = match next {
            Some(Ok(text)) => {
                *self.last.lock().unwrap() = Some(text.clone());
                text
            }
            Some(Err(e)) => return Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::Llm("script exhausted".to_string()))?,
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}
