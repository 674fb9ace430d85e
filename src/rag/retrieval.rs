//! Retrieval engine for semantic policy search
//!
//! Embeds a query, runs an exact similarity search against the vector store,
//! and attaches human-readable source labels so every answer can be
//! attributed to a policy document.

use crate::errors::{AgentError, Result};
use crate::gateway::EmbeddingProvider;
use crate::store::{CollectionStatus, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Maximum number of results to retrieve
    pub top_k: usize,
    /// Optional minimum cosine score; results below it are dropped
    pub min_score: Option<f32>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_score: None,
        }
    }
}

/// A retrieved chunk with score and source attribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    /// Source document identifier (filename)
    pub source: String,
    pub chunk_index: usize,
}

/// Retrieval engine over a committed vector collection
pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<VectorStore>,
    params: SearchParams,
    timeout: Duration,
}

impl RetrievalEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<VectorStore>,
        params: SearchParams,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            store,
            params,
            timeout,
        }
    }

    /// Retrieve chunks matching `query` with the default parameters
    pub async fn search(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        self.search_with_params(query, &self.params).await
    }

    /// Retrieve chunks matching `query`
    ///
    /// An empty or whitespace-only query is rejected before any network call.
    /// An empty store yields an empty result rather than an error. The whole
    /// embed-and-search span is bounded by the configured timeout.
    pub async fn search_with_params(
        &self,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<RetrievedChunk>> {
        if query.trim().is_empty() {
            return Err(AgentError::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }
        if params.top_k == 0 {
            return Err(AgentError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.store.status() == CollectionStatus::Building {
            return Err(AgentError::StoreUnavailable(
                "collection is mid-rebuild; re-run ingestion with --rebuild".to_string(),
            ));
        }
        if self.store.is_empty() {
            return Ok(Vec::new());
        }

        let results = tokio::time::timeout(self.timeout, async {
            let vector = self.embedder.embed(query).await?;
            self.store.query(&vector, params.top_k)
        })
        .await
        .map_err(|_| AgentError::RetrievalTimeout {
            duration_ms: self.timeout.as_millis() as u64,
        })??;

        let chunks = results
            .into_iter()
            .filter(|r| params.min_score.map_or(true, |min| r.score >= min))
            .map(|r| {
                let source = r
                    .metadata
                    .get("source")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                let chunk_index = r
                    .metadata
                    .get("chunk_index")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as usize;
                RetrievedChunk {
                    content: r.document,
                    score: r.score,
                    source,
                    chunk_index,
                }
            })
            .collect();

        Ok(chunks)
    }

    /// Number of entries in the underlying collection
    pub fn collection_len(&self) -> usize {
        self.store.len()
    }

    /// Default search parameters
    pub fn params(&self) -> &SearchParams {
        &self.params
    }
}

/// Render retrieved chunks into the attribution format used in prompts and
/// terminal output
pub fn format_results(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return "No relevant policy documents found.".to_string();
    }

    let blocks: Vec<String> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Document {} - Relevance: {:.2} - Source: {}]\n{}",
                i + 1,
                chunk.score,
                chunk.source,
                chunk.content.trim()
            )
        })
        .collect();

    blocks.join("\n---\n")
}
