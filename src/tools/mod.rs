//! Agent-invokable tools
//!
//! The two capabilities the orchestration layer can call: semantic policy
//! search and the return eligibility calculator.

pub mod executor;
pub mod registry;
pub mod types;

pub use executor::ToolExecutor;
pub use registry::ToolRegistry;
pub use types::{ToolResult, ToolSchema};
