//! Tool registry with JSON schemas
//!
//! Tools:
//! - policy_search: semantic search over the policy knowledge base
//! - return_eligibility: deterministic return-window calculation

use crate::tools::types::ToolSchema;
use serde_json::json;
use std::collections::HashMap;

/// Registry of the tools exposed to the orchestration layer
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolSchema>,
}

impl ToolRegistry {
    /// Create new tool registry with all tools
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register_policy_search();
        registry.register_return_eligibility();

        registry
    }

    fn register_policy_search(&mut self) {
        let schema = ToolSchema::new(
            "policy_search",
            "Search the policy knowledge base for information about returns, \
             refunds, eligibility criteria, timeframes, and procedures",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Question or topic to search for in policy documents"
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "Number of documents to retrieve",
                        "default": 3,
                        "minimum": 1
                    }
                },
                "required": ["query"]
            }),
        );
        self.tools.insert("policy_search".to_string(), schema);
    }

    fn register_return_eligibility(&mut self) {
        let schema = ToolSchema::new(
            "return_eligibility",
            "Calculate whether a product return is within the eligible \
             timeframe based on purchase date and product category",
            json!({
                "type": "object",
                "properties": {
                    "purchase_date": {
                        "type": "string",
                        "description": "Purchase date in YYYY-MM-DD format"
                    },
                    "product_category": {
                        "type": "string",
                        "description": "Product category, e.g. general, electronics, clothing, food",
                        "default": "general"
                    },
                    "as_of": {
                        "type": "string",
                        "description": "Reference date in YYYY-MM-DD format (defaults to today)"
                    }
                },
                "required": ["purchase_date"]
            }),
        );
        self.tools.insert("return_eligibility".to_string(), schema);
    }

    /// Get tool schema by name
    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name)
    }

    /// Check if tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get all tool schemas
    pub fn schemas(&self) -> Vec<&ToolSchema> {
        self.tools.values().collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_all_tools_registered() {
        let registry = ToolRegistry::new();
        assert!(registry.contains("policy_search"));
        assert!(registry.contains("return_eligibility"));
    }

    #[test]
    fn test_get_tool_schema() {
        let registry = ToolRegistry::new();

        let schema = registry.get("policy_search").unwrap();
        assert_eq!(schema.name, "policy_search");
        assert_eq!(schema.parameters["required"][0], "query");
    }

    #[test]
    fn test_nonexistent_tool() {
        let registry = ToolRegistry::new();
        assert!(!registry.contains("run_command"));
        assert!(registry.get("run_command").is_none());
    }

    #[test]
    fn test_tool_names_sorted() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.tool_names(),
            vec!["policy_search", "return_eligibility"]
        );
    }
}
