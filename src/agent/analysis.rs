//! Query analysis types and model-output parsing

use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};

/// What the customer is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Return,
    Refund,
    Exchange,
    PolicyQuestion,
    Other,
}

/// Structured reading of a customer query, produced by the analysis stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub request_type: RequestType,
    /// Product category if one was mentioned
    #[serde(default)]
    pub product_category: Option<String>,
    /// Purchase date if one was mentioned (YYYY-MM-DD)
    #[serde(default)]
    pub purchase_date: Option<String>,
    /// Search phrase for the policy knowledge base
    pub search_query: String,
    /// Emotional tone of the query (frustrated, confused, neutral)
    #[serde(default)]
    pub tone: Option<String>,
}

impl QueryAnalysis {
    /// Parse an analysis out of raw model output
    ///
    /// The model is instructed to reply with JSON, but replies routinely
    /// arrive wrapped in prose or code fences, so the text is scanned for
    /// its first complete JSON object before deserializing.
    pub fn from_model_output(text: &str) -> Result<Self> {
        let json = extract_json_object(text).ok_or_else(|| {
            AgentError::MalformedResponse(format!(
                "no JSON object in analysis output: {}",
                truncate(text, 200)
            ))
        })?;

        serde_json::from_str(json).map_err(|e| {
            AgentError::MalformedResponse(format!("unparseable analysis: {}", e))
        })
    }
}

/// Extract the first complete JSON object from `text`
///
/// Single-pass brace matching; braces inside string literals (including
/// escaped quotes) are ignored.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &byte) in bytes.iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match byte {
            b'\\' if in_string => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if !in_string => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_object() {
        let text = r#"{"request_type": "return"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_from_code_fence() {
        let text = "Here is the analysis:\n```json\n{\"request_type\": \"refund\"}\n```";
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"request_type": "refund"}"#)
        );
    }

    #[test]
    fn test_extract_handles_nested_objects() {
        let text = r#"{"outer": {"inner": 1}} trailing"#;
        assert_eq!(extract_json_object(text), Some(r#"{"outer": {"inner": 1}}"#));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"{"note": "braces {inside} a string"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_handles_escaped_quotes() {
        let text = r#"{"quote": "she said \"hello\""}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_none_without_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{unterminated"), None);
    }

    #[test]
    fn test_analysis_from_model_output() {
        let output = r#"```json
{
  "request_type": "return",
  "product_category": "electronics",
  "purchase_date": "2024-01-05",
  "search_query": "electronics return window",
  "tone": "neutral"
}
```"#;

        let analysis = QueryAnalysis::from_model_output(output).unwrap();
        assert_eq!(analysis.request_type, RequestType::Return);
        assert_eq!(analysis.product_category.as_deref(), Some("electronics"));
        assert_eq!(analysis.purchase_date.as_deref(), Some("2024-01-05"));
        assert_eq!(analysis.search_query, "electronics return window");
    }

    #[test]
    fn test_analysis_optional_fields_default() {
        let output = r#"{"request_type": "policy_question", "search_query": "refund timeline"}"#;
        let analysis = QueryAnalysis::from_model_output(output).unwrap();

        assert_eq!(analysis.request_type, RequestType::PolicyQuestion);
        assert!(analysis.product_category.is_none());
        assert!(analysis.purchase_date.is_none());
        assert!(analysis.tone.is_none());
    }

    #[test]
    fn test_analysis_rejects_prose() {
        let err = QueryAnalysis::from_model_output("I think it's a return.").unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)));
    }

    #[test]
    fn test_analysis_rejects_wrong_shape() {
        let err = QueryAnalysis::from_model_output(r#"{"foo": 1}"#).unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)));
    }
}
