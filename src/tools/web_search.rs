//! `web_search` tool used by the researcher role
//!
//! Backed by the Serper Google search API. Results are trimmed to title,
//! url and snippet so they fit comfortably in the researcher's context.

use crate::config::WebSearchSection;
use crate::tools::{Tool, ToolContext, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const TOOL_NAME: &str = "web_search";

pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(api_key: String, settings: &WebSearchSection) -> Result<Self, ToolError> {
        if api_key.is_empty() {
            return Err(ToolError::InitializationError(
                "web search API key is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::InitializationError(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            endpoint: settings.endpoint.clone(),
            max_results: settings.max_results.max(1),
        })
    }

    fn build_search_payload(query: &str, num_results: usize, max_results: usize) -> Value {
        json!({
            "q": query,
            "num": num_results.min(max_results),
            "gl": "us",
            "hl": "en"
        })
    }

    fn parse_search_response(search_result: &Value, num_results: usize) -> Vec<Value> {
        search_result
            .get("organic")
            .and_then(Value::as_array)
            .map(|organic| {
                organic
                    .iter()
                    .filter_map(|result| {
                        let title = result.get("title")?.as_str()?;
                        let link = result.get("link")?.as_str()?;
                        let snippet = result.get("snippet").and_then(Value::as_str).unwrap_or("");
                        Some(json!({"title": title, "url": link, "snippet": snippet}))
                    })
                    .take(num_results)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: TOOL_NAME.to_string(),
            description: "Search the web for insurance policy rules, medical necessity \
                          guidelines and regulations relevant to a claim denial"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "num_results": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 20
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(
        &self,
        parameters: &Value,
        _context: &mut ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        let query = parameters["query"]
            .as_str()
            .ok_or_else(|| ToolError::ExecutionError("Query parameter is required".to_string()))?;
        let num_results = parameters
            .get("num_results")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(self.max_results);

        debug!(query, num_results, "Running web search");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&Self::build_search_payload(query, num_results, self.max_results))
            .send()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ToolError::ExecutionError(format!(
                "Search API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let search_result: Value = response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Failed to parse response: {e}")))?;

        Ok(json!({
            "query": query,
            "results": Self::parse_search_response(&search_result, num_results)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let result = WebSearchTool::new(String::new(), &WebSearchSection::default());
        assert!(matches!(result, Err(ToolError::InitializationError(_))));
    }

    #[test]
    fn test_payload_respects_max_results() {
        let payload = WebSearchTool::build_search_payload("cpt 70553 medical necessity", 15, 5);
        assert_eq!(payload["q"], "cpt 70553 medical necessity");
        assert_eq!(payload["num"], 5);
    }

    #[test]
    fn test_parse_skips_incomplete_results() {
        let response = json!({
            "organic": [
                {"title": "Coverage policy", "link": "https://example.com/policy", "snippet": "MRI criteria"},
                {"title": "No link"},
                {"title": "Second", "link": "https://example.com/2"}
            ]
        });

        let results = WebSearchTool::parse_search_response(&response, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["url"], "https://example.com/policy");
        assert_eq!(results[1]["snippet"], "");
    }

    #[test]
    fn test_parse_empty_response() {
        assert!(WebSearchTool::parse_search_response(&json!({}), 5).is_empty());
    }
}
