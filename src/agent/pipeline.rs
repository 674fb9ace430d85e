//! Customer-support pipeline: analyze -> gather evidence -> generate
//!
//! Three completion-backed stages wired as typed function calls. The first
//! classifies the query into a `QueryAnalysis`, the second invokes the
//! policy-search and eligibility tools, the third folds the evidence into a
//! grounded customer response. Provider failures surface to the caller; the
//! pipeline never fabricates a fallback answer.

use crate::agent::analysis::QueryAnalysis;
use crate::errors::{AgentError, Result};
use crate::gateway::CompletionProvider;
use crate::tools::{ToolExecutor, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const ANALYZE_SYSTEM_PROMPT: &str = "\
You are a customer service analyst for an eCommerce store. Read the customer \
query and respond with ONLY a JSON object of this shape:\n\
{\n\
  \"request_type\": \"return\" | \"refund\" | \"exchange\" | \"policy_question\" | \"other\",\n\
  \"product_category\": string or null (e.g. \"electronics\", \"clothing\", \"food\"),\n\
  \"purchase_date\": string or null (YYYY-MM-DD, only if a date is stated),\n\
  \"search_query\": string (a short phrase to look up in the policy documents),\n\
  \"tone\": string or null (frustrated, confused, neutral)\n\
}\n\
Do not invent dates or categories the customer never mentioned.";

const GENERATE_SYSTEM_PROMPT: &str = "\
You are a customer service representative for an eCommerce store. Answer the \
customer's question directly, in clear and empathetic language, using ONLY \
the policy excerpts and the eligibility verdict provided. Explain relevant \
policies in simple terms, include concrete dates and deadlines when known, \
and offer an alternative when the primary request cannot be fulfilled. If \
the provided material does not answer the question, say so instead of \
guessing.";

/// Evidence gathered for a query: policy excerpts plus an optional verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Formatted policy excerpts with relevance scores and sources
    pub policy_context: String,
    /// Eligibility tool result, when a purchase date was extracted
    pub eligibility: Option<ToolResult>,
}

/// Final pipeline output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportResponse {
    pub answer: String,
    pub analysis: QueryAnalysis,
    pub evidence: Evidence,
}

/// The three-stage query pipeline
pub struct SupportPipeline {
    completion: Arc<dyn CompletionProvider>,
    executor: ToolExecutor,
    verbose: bool,
}

impl SupportPipeline {
    pub fn new(completion: Arc<dyn CompletionProvider>, executor: ToolExecutor) -> Self {
        Self {
            completion,
            executor,
            verbose: false,
        }
    }

    /// Enable progress logging to stderr
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Stage 1: classify the query and extract categories, dates, and a
    /// search phrase
    pub async fn analyze(&self, query: &str) -> Result<QueryAnalysis> {
        if query.trim().is_empty() {
            return Err(AgentError::InvalidArgument(
                "customer query must not be empty".to_string(),
            ));
        }

        let reply = self
            .completion
            .complete(ANALYZE_SYSTEM_PROMPT, query)
            .await?;
        let analysis = QueryAnalysis::from_model_output(&reply)?;

        if self.verbose {
            eprintln!(
                "[ANALYZE] type={:?} category={:?} date={:?}",
                analysis.request_type, analysis.product_category, analysis.purchase_date
            );
        }

        Ok(analysis)
    }

    /// Stage 2: invoke the tools the analysis calls for
    pub async fn gather_evidence(&self, analysis: &QueryAnalysis) -> Result<Evidence> {
        let policy_context = if analysis.search_query.trim().is_empty() {
            "No relevant policy documents found.".to_string()
        } else {
            let result = self
                .executor
                .execute("policy_search", &json!({ "query": analysis.search_query }))
                .await?;
            if result.success {
                result.output
            } else {
                "No relevant policy documents found.".to_string()
            }
        };

        let eligibility = match &analysis.purchase_date {
            Some(date) => {
                let mut args = json!({ "purchase_date": date });
                if let Some(category) = &analysis.product_category {
                    args["product_category"] = json!(category);
                }
                Some(self.executor.execute("return_eligibility", &args).await?)
            }
            None => None,
        };

        if self.verbose {
            eprintln!(
                "[EVIDENCE] policy_context={}B eligibility={}",
                policy_context.len(),
                eligibility
                    .as_ref()
                    .map(|r| if r.success { "ok" } else { "failed" })
                    .unwrap_or("skipped")
            );
        }

        Ok(Evidence {
            policy_context,
            eligibility,
        })
    }

    /// Stage 3: fold the evidence into a grounded customer response
    pub async fn generate(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
        evidence: &Evidence,
    ) -> Result<String> {
        let mut prompt = format!(
            "Customer query: {}\n\nRequest type: {:?}\n",
            query, analysis.request_type
        );
        if let Some(tone) = &analysis.tone {
            prompt.push_str(&format!("Customer tone: {}\n", tone));
        }

        prompt.push_str("\nRelevant policy excerpts:\n");
        prompt.push_str(&evidence.policy_context);

        match &evidence.eligibility {
            Some(result) if result.success => {
                prompt.push_str("\n\nReturn eligibility check:\n");
                prompt.push_str(&result.output);
            }
            Some(result) => {
                prompt.push_str("\n\nReturn eligibility check failed: ");
                prompt.push_str(result.error.as_deref().unwrap_or("unknown error"));
                prompt.push_str(
                    "\nAsk the customer to confirm the purchase date instead of guessing.",
                );
            }
            None => {}
        }

        let reply = self
            .completion
            .complete(GENERATE_SYSTEM_PROMPT, &prompt)
            .await?;
        Ok(reply.trim().to_string())
    }

    /// Run all three stages for a customer query
    pub async fn answer(&self, query: &str) -> Result<SupportResponse> {
        let analysis = self.analyze(query).await?;
        let evidence = self.gather_evidence(&analysis).await?;
        let answer = self.generate(query, &analysis, &evidence).await?;

        Ok(SupportResponse {
            answer,
            analysis,
            evidence,
        })
    }
}
