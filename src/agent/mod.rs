//! Query orchestration
//!
//! A plain three-stage pipeline replaces the multi-agent framework of the
//! original design: analyze the query, gather evidence with the tools,
//! generate the response. Each stage sees only the prior stage's structured
//! output.

pub mod analysis;
pub mod pipeline;

pub use analysis::{extract_json_object, QueryAnalysis, RequestType};
pub use pipeline::{Evidence, SupportPipeline, SupportResponse};
