//! External provider gateways
//!
//! The core treats embeddings and completions as capabilities behind traits;
//! the HTTP implementations target any OpenAI-compatible API.

pub mod completion;
pub mod embedding;

pub use completion::{CompletionProvider, OpenAiCompletion};
pub use embedding::{EmbeddingProvider, OpenAiEmbeddings};
