//! Embedded vector store

pub mod collection;

pub use collection::{CollectionStatus, QueryResult, StoreEntry, VectorStore};
