//! Persisted vector collection with exact cosine search
//!
//! The collection lives in memory and is persisted as JSON with an atomic
//! temp-file-and-rename write. Scale here is tens to low hundreds of entries,
//! so ranking is exact: cosine similarity against every stored embedding,
//! ties broken by insertion order.
//!
//! Rebuild lifecycle: `begin_rebuild` clears the entries and marks the
//! collection `Building` on disk before any write lands; `commit` flips it
//! back to `Ready`. A `Building` collection refuses queries, so an aborted
//! ingestion run is never silently queryable.

use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Collection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    /// Fully written and queryable
    Ready,
    /// Mid-rebuild (or aborted rebuild); unqueryable
    Building,
}

/// A stored chunk with its embedding and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntry {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, JsonValue>,
}

/// Result of a similarity query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    pub score: f32,
    pub document: String,
    pub metadata: HashMap<String, JsonValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionData {
    name: String,
    dimension: usize,
    status: CollectionStatus,
    generation: String,
    entries: Vec<StoreEntry>,
}

/// Embedded vector store backed by a JSON file
#[derive(Debug)]
pub struct VectorStore {
    path: PathBuf,
    data: CollectionData,
}

impl VectorStore {
    /// Open the collection `name` under `dir`, creating an empty one if absent
    pub fn open(dir: &Path, name: &str, dimension: usize) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", name));

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let data: CollectionData = serde_json::from_str(&contents).map_err(|e| {
                AgentError::StoreUnavailable(format!(
                    "collection file {} is corrupt: {}",
                    path.display(),
                    e
                ))
            })?;
            if data.dimension != dimension {
                return Err(AgentError::StoreUnavailable(format!(
                    "collection '{}' holds {}-dimensional embeddings but {} were requested; re-ingest with --rebuild",
                    name, data.dimension, dimension
                )));
            }
            data
        } else {
            CollectionData {
                name: name.to_string(),
                dimension,
                status: CollectionStatus::Ready,
                generation: Uuid::new_v4().to_string(),
                entries: Vec::new(),
            }
        };

        Ok(Self { path, data })
    }

    /// Drop all entries and mark the collection as mid-rebuild on disk
    pub fn begin_rebuild(&mut self) -> Result<()> {
        self.data.entries.clear();
        self.data.status = CollectionStatus::Building;
        self.data.generation = Uuid::new_v4().to_string();
        self.persist()
    }

    /// Append entries; embedding dimensions are validated against the collection
    pub fn upsert(&mut self, entries: Vec<StoreEntry>) -> Result<usize> {
        for entry in &entries {
            if entry.embedding.len() != self.data.dimension {
                return Err(AgentError::InvalidArgument(format!(
                    "entry '{}' has dimension {} but the collection expects {}",
                    entry.id,
                    entry.embedding.len(),
                    self.data.dimension
                )));
            }
        }

        let count = entries.len();
        self.data.entries.extend(entries);
        self.persist()?;
        Ok(count)
    }

    /// Mark the collection fully written and queryable
    pub fn commit(&mut self) -> Result<()> {
        self.data.status = CollectionStatus::Ready;
        self.persist()
    }

    /// Exact cosine similarity search over every entry
    ///
    /// Returns up to `top_k` results in descending score order; ties keep
    /// insertion order so repeated identical queries are stable. `top_k`
    /// beyond the collection size returns everything.
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryResult>> {
        if top_k == 0 {
            return Err(AgentError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.data.status == CollectionStatus::Building {
            return Err(AgentError::StoreUnavailable(format!(
                "collection '{}' is mid-rebuild; re-run ingestion with --rebuild",
                self.data.name
            )));
        }
        if vector.len() != self.data.dimension {
            return Err(AgentError::InvalidArgument(format!(
                "query vector has dimension {} but the collection expects {}",
                vector.len(),
                self.data.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, cosine_similarity(vector, &entry.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| {
                let entry = &self.data.entries[idx];
                QueryResult {
                    id: entry.id.clone(),
                    score,
                    document: entry.document.clone(),
                    metadata: entry.metadata.clone(),
                }
            })
            .collect())
    }

    /// Remove every entry. Destructive and irreversible.
    pub fn clear(&mut self) -> Result<()> {
        self.data.entries.clear();
        self.data.status = CollectionStatus::Ready;
        self.persist()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.data.entries.len()
    }

    /// Whether the collection holds no entries
    pub fn is_empty(&self) -> bool {
        self.data.entries.is_empty()
    }

    /// Current lifecycle status
    pub fn status(&self) -> CollectionStatus {
        self.data.status
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Configured embedding dimension
    pub fn dimension(&self) -> usize {
        self.data.dimension
    }

    /// Write the collection to disk atomically
    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Cosine similarity in [-1, 1]; zero-magnitude vectors score 0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
