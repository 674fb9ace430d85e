//! Retrieval-augmented generation pipeline
//!
//! Chunking, ingestion into the vector store, and semantic retrieval.

pub mod chunker;
pub mod ingestion;
pub mod retrieval;

pub use chunker::{Chunk, TextChunker};
pub use ingestion::{load_documents, Document, IngestionPipeline};
pub use retrieval::{format_results, RetrievalEngine, RetrievedChunk, SearchParams};
