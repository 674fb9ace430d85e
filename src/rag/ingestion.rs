//! Document ingestion pipeline
//!
//! Loads policy documents from a directory, chunks them, requests embeddings,
//! and writes the result into the vector store as one collection version.
//! Embedding requests for different documents run concurrently (they are
//! independent); store writes are serialized and committed once at the end,
//! so readers never observe a partially rebuilt collection.

use crate::errors::{AgentError, Result};
use crate::gateway::EmbeddingProvider;
use crate::rag::chunker::TextChunker;
use crate::store::{CollectionStatus, StoreEntry, VectorStore};
use futures_util::future::try_join_all;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A raw source document; immutable once ingested
#[derive(Debug, Clone)]
pub struct Document {
    /// Identifier (filename)
    pub id: String,
    pub text: String,
    /// Optional category tag
    pub category: Option<String>,
}

/// Load `.txt`/`.md` documents from a directory, sorted by filename
///
/// A `category: <name>` first line is consumed as the document's category
/// tag. Unsupported file types are skipped with a warning.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(AgentError::InvalidArgument(format!(
            "document directory {} does not exist",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_lowercase().as_str(), "txt" | "md"))
            .unwrap_or(false);

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        if !supported {
            eprintln!("Warning: skipping unsupported document: {}", name);
            continue;
        }

        let raw = fs::read_to_string(&path)?;
        let (category, text) = split_category_header(&raw);

        if text.trim().is_empty() {
            eprintln!("Warning: skipping empty document: {}", name);
            continue;
        }

        documents.push(Document {
            id: name,
            text,
            category,
        });
    }

    if documents.is_empty() {
        return Err(AgentError::InvalidArgument(format!(
            "no usable policy documents in {}",
            dir.display()
        )));
    }

    Ok(documents)
}

/// Consume an optional `category: <name>` first line
fn split_category_header(raw: &str) -> (Option<String>, String) {
    if let Some(first_line) = raw.lines().next() {
        if let Some(value) = first_line.strip_prefix("category:") {
            let category = value.trim().to_lowercase();
            if !category.is_empty() {
                let rest = raw[first_line.len()..].trim_start_matches('\n').to_string();
                return (Some(category), rest);
            }
        }
    }
    (None, raw.to_string())
}

/// Chunks documents, embeds the chunks, and writes the collection
pub struct IngestionPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IngestionPipeline {
    pub fn new(chunker: TextChunker, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { chunker, embedder }
    }

    /// Ingest `documents` into `store`, returning the number of chunks written
    ///
    /// A populated collection is only replaced when `rebuild` is set; a
    /// collection left mid-rebuild by a failed prior run also requires
    /// `rebuild`. Any embedding failure aborts the run and leaves the
    /// collection marked `Building`, so it can never be queried half-built.
    pub async fn ingest(
        &self,
        store: &mut VectorStore,
        documents: &[Document],
        rebuild: bool,
    ) -> Result<usize> {
        if !rebuild {
            if store.status() == CollectionStatus::Building {
                return Err(AgentError::StoreUnavailable(format!(
                    "collection '{}' was left mid-rebuild; re-run ingestion with --rebuild",
                    store.name()
                )));
            }
            if !store.is_empty() {
                return Err(AgentError::InvalidArgument(format!(
                    "collection '{}' already holds {} entries; pass --rebuild to replace it",
                    store.name(),
                    store.len()
                )));
            }
        }

        store.begin_rebuild()?;

        // Chunk everything up front; chunking is cheap and deterministic.
        let chunked: Vec<(&Document, Vec<crate::rag::chunker::Chunk>)> = documents
            .iter()
            .map(|doc| (doc, self.chunker.split(&doc.text)))
            .collect();

        // Embedding requests per document are independent; run them
        // concurrently. Writes stay serialized below.
        let embeddings = try_join_all(chunked.iter().map(|(_, chunks)| {
            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            let embedder = Arc::clone(&self.embedder);
            async move { embedder.embed_batch(&texts).await }
        }))
        .await?;

        let mut written = 0usize;
        for ((doc, chunks), vectors) in chunked.into_iter().zip(embeddings) {
            let entries: Vec<StoreEntry> = chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, embedding)| {
                    let mut metadata = HashMap::new();
                    metadata.insert("source".to_string(), json!(doc.id));
                    metadata.insert("chunk_index".to_string(), json!(chunk.index));
                    metadata.insert("start_offset".to_string(), json!(chunk.start_offset));
                    if let Some(category) = &doc.category {
                        metadata.insert("category".to_string(), json!(category));
                    }
                    StoreEntry {
                        id: format!("{}#{}", doc.id, chunk.index),
                        document: chunk.text,
                        embedding,
                        metadata,
                    }
                })
                .collect();

            written += store.upsert(entries)?;
        }

        store.commit()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    const DIM: usize = 8;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; DIM])
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; DIM]).collect())
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    /// Always fails, like a provider that stays rate limited for the whole run
    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AgentError::Provider("rate limited".to_string()))
        }

        async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Err(AgentError::Provider("rate limited".to_string()))
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    fn pipeline(embedder: Arc<dyn EmbeddingProvider>) -> IngestionPipeline {
        IngestionPipeline::new(TextChunker::new(50, 10).unwrap(), embedder)
    }

    fn sample_documents() -> Vec<Document> {
        vec![
            Document {
                id: "returns.md".to_string(),
                text: "Returns are accepted within the posted window. Items must be unused."
                    .to_string(),
                category: None,
            },
            Document {
                id: "refunds.md".to_string(),
                text: "Refunds are issued to the original payment method within five business days."
                    .to_string(),
                category: Some("general".to_string()),
            },
        ]
    }

    #[tokio::test]
    async fn test_ingest_writes_all_chunks() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "test", DIM).unwrap();

        let count = pipeline(Arc::new(FixedEmbedder))
            .ingest(&mut store, &sample_documents(), false)
            .await
            .unwrap();

        assert!(count > 0);
        assert_eq!(store.len(), count);
        assert_eq!(store.status(), CollectionStatus::Ready);
    }

    #[tokio::test]
    async fn test_ingest_is_idempotent_given_same_inputs() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "test", DIM).unwrap();
        let docs = sample_documents();
        let pipe = pipeline(Arc::new(FixedEmbedder));

        let first = pipe.ingest(&mut store, &docs, false).await.unwrap();
        let second = pipe.ingest(&mut store, &docs, true).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), second);
    }

    #[tokio::test]
    async fn test_populated_store_requires_rebuild_flag() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "test", DIM).unwrap();
        let docs = sample_documents();
        let pipe = pipeline(Arc::new(FixedEmbedder));

        pipe.ingest(&mut store, &docs, false).await.unwrap();
        let err = pipe.ingest(&mut store, &docs, false).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_collection_building() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "test", DIM).unwrap();

        let err = pipeline(Arc::new(FailingEmbedder))
            .ingest(&mut store, &sample_documents(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Provider(_)));
        assert_eq!(store.status(), CollectionStatus::Building);
        assert!(store.query(&vec![1.0; DIM], 1).is_err());
    }

    #[tokio::test]
    async fn test_building_store_requires_rebuild_to_recover() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "test", DIM).unwrap();
        store.begin_rebuild().unwrap();

        let pipe = pipeline(Arc::new(FixedEmbedder));
        let docs = sample_documents();

        let err = pipe.ingest(&mut store, &docs, false).await.unwrap_err();
        assert!(matches!(err, AgentError::StoreUnavailable(_)));

        pipe.ingest(&mut store, &docs, true).await.unwrap();
        assert_eq!(store.status(), CollectionStatus::Ready);
    }

    #[tokio::test]
    async fn test_entries_carry_source_metadata() {
        let temp = TempDir::new().unwrap();
        let mut store = VectorStore::open(temp.path(), "test", DIM).unwrap();

        pipeline(Arc::new(FixedEmbedder))
            .ingest(&mut store, &sample_documents(), false)
            .await
            .unwrap();

        let results = store.query(&vec![1.0; DIM], 100).unwrap();
        assert!(results
            .iter()
            .any(|r| r.metadata.get("source") == Some(&json!("returns.md"))));
        assert!(results
            .iter()
            .any(|r| r.metadata.get("category") == Some(&json!("general"))));
    }

    #[test]
    fn test_load_documents_reads_and_sorts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b_refunds.md"), "Refund policy text.").unwrap();
        fs::write(
            temp.path().join("a_returns.txt"),
            "category: electronics\nReturn policy text.",
        )
        .unwrap();
        fs::write(temp.path().join("ignored.pdf"), "binary").unwrap();

        let docs = load_documents(temp.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a_returns.txt");
        assert_eq!(docs[0].category.as_deref(), Some("electronics"));
        assert_eq!(docs[0].text, "Return policy text.");
        assert_eq!(docs[1].id, "b_refunds.md");
        assert!(docs[1].category.is_none());
    }

    #[test]
    fn test_load_documents_missing_dir_rejected() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert!(load_documents(&missing).is_err());
    }

    #[test]
    fn test_category_header_parsing() {
        let (category, text) = split_category_header("category: Clothing\nBody text");
        assert_eq!(category.as_deref(), Some("clothing"));
        assert_eq!(text, "Body text");

        let (category, text) = split_category_header("No header here");
        assert!(category.is_none());
        assert_eq!(text, "No header here");
    }
}
