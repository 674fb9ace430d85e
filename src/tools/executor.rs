//! Tool executor
//!
//! Dispatches a validated (name, args) invocation to the retrieval engine or
//! the eligibility calculator. Bad model-supplied arguments (unparseable
//! dates, blank queries, purchases in the future) come back as failed
//! `ToolResult`s so the response stage has to acknowledge them;
//! infrastructure failures propagate as errors and abort the query.

use crate::eligibility::{self, ReturnWindows};
use crate::errors::{AgentError, Result};
use crate::rag::{format_results, RetrievalEngine, SearchParams};
use crate::tools::registry::ToolRegistry;
use crate::tools::types::ToolResult;
use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;

/// Executes tool invocations against the core components
pub struct ToolExecutor {
    registry: ToolRegistry,
    retrieval: Arc<RetrievalEngine>,
    windows: ReturnWindows,
}

impl ToolExecutor {
    pub fn new(retrieval: Arc<RetrievalEngine>, windows: ReturnWindows) -> Self {
        Self {
            registry: ToolRegistry::new(),
            retrieval,
            windows,
        }
    }

    /// Registered tool schemas
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a tool by name with JSON arguments
    pub async fn execute(&self, name: &str, args: &JsonValue) -> Result<ToolResult> {
        if !self.registry.contains(name) {
            return Err(AgentError::InvalidArgument(format!(
                "unknown tool: {}",
                name
            )));
        }

        let started = Instant::now();
        match name {
            "policy_search" => self.run_policy_search(args, started).await,
            "return_eligibility" => self.run_return_eligibility(args, started),
            _ => unreachable!("registry and dispatch out of sync"),
        }
    }

    async fn run_policy_search(&self, args: &JsonValue, started: Instant) -> Result<ToolResult> {
        let query = match args.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q,
            _ => {
                return Ok(ToolResult::failure(
                    "policy_search".to_string(),
                    "search query must be a non-empty string".to_string(),
                    started.elapsed(),
                ))
            }
        };

        let top_k = args
            .get("top_k")
            .and_then(|v| v.as_u64())
            .map(|k| k as usize)
            .unwrap_or(self.retrieval.params().top_k);

        let params = SearchParams {
            top_k,
            ..self.retrieval.params().clone()
        };
        let chunks = self.retrieval.search_with_params(query, &params).await?;

        Ok(ToolResult::success(
            "policy_search".to_string(),
            format_results(&chunks),
            started.elapsed(),
        ))
    }

    fn run_return_eligibility(&self, args: &JsonValue, started: Instant) -> Result<ToolResult> {
        let purchase_raw = match args.get("purchase_date").and_then(|v| v.as_str()) {
            Some(d) => d,
            None => {
                return Ok(ToolResult::failure(
                    "return_eligibility".to_string(),
                    "purchase_date is required (YYYY-MM-DD)".to_string(),
                    started.elapsed(),
                ))
            }
        };

        let purchase_date = match parse_date(purchase_raw) {
            Ok(d) => d,
            Err(e) => {
                return Ok(ToolResult::failure(
                    "return_eligibility".to_string(),
                    e.to_string(),
                    started.elapsed(),
                ))
            }
        };

        let category = args
            .get("product_category")
            .and_then(|v| v.as_str())
            .unwrap_or("general");

        let as_of = match args.get("as_of").and_then(|v| v.as_str()) {
            Some(raw) => match parse_date(raw) {
                Ok(d) => d,
                Err(e) => {
                    return Ok(ToolResult::failure(
                        "return_eligibility".to_string(),
                        e.to_string(),
                        started.elapsed(),
                    ))
                }
            },
            None => chrono::Local::now().date_naive(),
        };

        match eligibility::evaluate(purchase_date, category, as_of, &self.windows) {
            Ok(verdict) => Ok(ToolResult::success(
                "return_eligibility".to_string(),
                verdict.summary(),
                started.elapsed(),
            )),
            // A future purchase date is the model's extraction going wrong,
            // not an infrastructure fault: surface it as a failed result.
            Err(AgentError::InvalidArgument(msg)) => Ok(ToolResult::failure(
                "return_eligibility".to_string(),
                msg,
                started.elapsed(),
            )),
            Err(e) => Err(e),
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AgentError::InvalidArgument(format!(
            "invalid date '{}'; expected YYYY-MM-DD",
            raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReturnsConfig;
    use crate::gateway::EmbeddingProvider;
    use crate::store::{StoreEntry, VectorStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    const DIM: usize = 4;

    struct UnitEmbedder;

    #[async_trait]
    impl EmbeddingProvider for UnitEmbedder {
        async fn embed(&self, _text: &str) -> crate::errors::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[&str]) -> crate::errors::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    fn seeded_executor() -> (ToolExecutor, TempDir) {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "test", DIM).unwrap();

        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), json!("electronics.md"));
        metadata.insert("chunk_index".to_string(), json!(0));
        store
            .upsert(vec![StoreEntry {
                id: "electronics.md#0".to_string(),
                document: "Electronics may be returned within 15 days.".to_string(),
                embedding: vec![1.0, 0.0, 0.0, 0.0],
                metadata,
            }])
            .unwrap();

        let retrieval = RetrievalEngine::new(
            Arc::new(UnitEmbedder),
            Arc::new(store),
            SearchParams::default(),
            Duration::from_secs(5),
        );
        let executor = ToolExecutor::new(
            Arc::new(retrieval),
            ReturnWindows::new(ReturnsConfig::default()),
        );
        (executor, temp)
    }

    #[tokio::test]
    async fn test_unknown_tool_rejected() {
        let (executor, _temp) = seeded_executor();
        let err = executor.execute("web_fetch", &json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_policy_search_returns_attributed_output() {
        let (executor, _temp) = seeded_executor();

        let result = executor
            .execute("policy_search", &json!({"query": "laptop return window"}))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.contains("Source: electronics.md"));
        assert!(result.output.contains("15 days"));
    }

    #[tokio::test]
    async fn test_policy_search_blank_query_fails_softly() {
        let (executor, _temp) = seeded_executor();

        let result = executor
            .execute("policy_search", &json!({"query": "  "}))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_return_eligibility_verdict() {
        let (executor, _temp) = seeded_executor();

        let result = executor
            .execute(
                "return_eligibility",
                &json!({
                    "purchase_date": "2024-01-01",
                    "product_category": "electronics",
                    "as_of": "2024-01-10",
                }),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.contains("ELIGIBLE FOR RETURN"));
        assert!(result.output.contains("Days Remaining: 6"));
    }

    #[tokio::test]
    async fn test_return_eligibility_bad_date_fails_softly() {
        let (executor, _temp) = seeded_executor();

        let result = executor
            .execute(
                "return_eligibility",
                &json!({"purchase_date": "last Tuesday"}),
            )
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn test_return_eligibility_future_purchase_fails_softly() {
        let (executor, _temp) = seeded_executor();

        let result = executor
            .execute(
                "return_eligibility",
                &json!({
                    "purchase_date": "2024-06-01",
                    "as_of": "2024-01-01",
                }),
            )
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("after the reference date"));
    }

    #[tokio::test]
    async fn test_missing_purchase_date_fails_softly() {
        let (executor, _temp) = seeded_executor();

        let result = executor
            .execute("return_eligibility", &json!({"product_category": "food"}))
            .await
            .unwrap();

        assert!(!result.success);
    }
}
