//! Retrieval collaborators.
//!
//! The routing core only depends on the two traits below. A retriever returns
//! its best candidate, `Ok(None)` when it has nothing relevant, or an error
//! when the backend is unavailable. Callers wrap every call in a timeout and
//! treat errors and timeouts the same way.

pub mod knowledge_base;
pub mod web;

pub use knowledge_base::{InMemoryKnowledgeBase, KnowledgeEntry};
pub use web::{DisabledWebRetriever, HttpWebRetriever};

use crate::error::Result;
use crate::types::{Question, RetrievalCandidate};
use async_trait::async_trait;

/// Curated knowledge base lookup
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn search(&self, question: &Question) -> Result<Option<RetrievalCandidate>>;
}

/// Live web search synthesized into a single candidate
#[async_trait]
pub trait WebRetriever: Send + Sync {
    async fn search(&self, question: &Question) -> Result<Option<RetrievalCandidate>>;
}
