//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use mathroute_core::{
    error::{Result, RouterError},
    CandidatePayload, ChosenSource, KnowledgeRetriever, Question, RetrievalCandidate,
    RouterConfig, RoutingDecision, Session, SessionId, Solution, Source, Topic, WebRetriever,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Payload that passes the output checks without warnings
pub fn worked_payload(answer: &str) -> CandidatePayload {
    CandidatePayload {
        answer: answer.to_string(),
        steps: Some(vec![
            "Subtract 5 from both sides, so 2x = 8.".to_string(),
            "Divide both sides by 2, which gives x = 4.".to_string(),
        ]),
        explanation: "Since both sides stay balanced, x = 4 is the solution.".to_string(),
        references: vec!["kb:test".to_string()],
    }
}

/// Retriever returning a fixed candidate, counting calls
pub struct StubRetriever {
    source: Source,
    relevance: Option<f64>,
    answer: String,
    calls: AtomicUsize,
}

impl StubRetriever {
    pub fn new(source: Source, relevance: Option<f64>) -> Self {
        Self {
            source,
            relevance,
            answer: "x = 4".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_answer(mut self, answer: &str) -> Self {
        self.answer = answer.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn candidate(&self) -> Option<RetrievalCandidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.relevance
            .map(|r| RetrievalCandidate::new(self.source, r, worked_payload(&self.answer)))
    }
}

#[async_trait]
impl KnowledgeRetriever for StubRetriever {
    async fn search(&self, _question: &Question) -> Result<Option<RetrievalCandidate>> {
        Ok(self.candidate())
    }
}

#[async_trait]
impl WebRetriever for StubRetriever {
    async fn search(&self, _question: &Question) -> Result<Option<RetrievalCandidate>> {
        Ok(self.candidate())
    }
}

/// Retriever that answers only after a delay
pub struct SlowRetriever {
    pub source: Source,
    pub delay: Duration,
    pub relevance: f64,
}

impl SlowRetriever {
    async fn candidate(&self) -> Result<Option<RetrievalCandidate>> {
        tokio::time::sleep(self.delay).await;
        Ok(Some(RetrievalCandidate::new(
            self.source,
            self.relevance,
            worked_payload("x = 4"),
        )))
    }
}

#[async_trait]
impl KnowledgeRetriever for SlowRetriever {
    async fn search(&self, _question: &Question) -> Result<Option<RetrievalCandidate>> {
        self.candidate().await
    }
}

#[async_trait]
impl WebRetriever for SlowRetriever {
    async fn search(&self, _question: &Question) -> Result<Option<RetrievalCandidate>> {
        self.candidate().await
    }
}

/// Retriever whose backend is down
pub struct FailingRetriever(pub Source);

impl FailingRetriever {
    fn error(&self) -> RouterError {
        RouterError::RetrievalUnavailable {
            source_name: self.0.to_string(),
            reason: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl KnowledgeRetriever for FailingRetriever {
    async fn search(&self, _question: &Question) -> Result<Option<RetrievalCandidate>> {
        Err(self.error())
    }
}

#[async_trait]
impl WebRetriever for FailingRetriever {
    async fn search(&self, _question: &Question) -> Result<Option<RetrievalCandidate>> {
        Err(self.error())
    }
}

/// Default config with short retrieval timeouts
pub fn fast_config() -> RouterConfig {
    let mut config = RouterConfig::default();
    config.retrieval.knowledge_base_timeout = Duration::from_millis(50);
    config.retrieval.web_search_timeout = Duration::from_millis(50);
    config
}

/// A finished session routed to `source` for `topic`
pub fn routed_session(topic: Topic, source: ChosenSource, confidence: f64) -> Session {
    Session {
        id: SessionId::new(),
        question: Question::new("Solve the equation 2x + 5 = 13", topic, 0.2),
        routing_decision: RoutingDecision {
            chosen_source: source,
            confidence,
            reasoning: "knowledge_base_above_threshold".to_string(),
            topic,
            effective_threshold: 0.75,
            decided_at: Utc::now(),
        },
        solution: Solution {
            answer: "x = 4".to_string(),
            steps: vec!["Subtract 5 from both sides.".to_string()],
            explanation: "Since 2x = 8, x = 4.".to_string(),
            confidence,
            source,
            degraded: source == ChosenSource::None,
            warnings: Vec::new(),
        },
        input_warnings: Vec::new(),
        created_at: Utc::now(),
        feedback_received_at: None,
    }
}

pub const ALGEBRA_QUESTION: &str = "Solve the equation 2x + 5 = 13";
