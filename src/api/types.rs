//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::search::SearchDepth;

/// Request to run a research pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchRequest {
    /// The main topic or question to research
    pub topic: String,

    /// Search depth for web steps (default: basic)
    #[serde(default)]
    pub depth: SearchDepth,
}

/// Request for a standalone academic paper search.
#[derive(Debug, Clone, Deserialize)]
pub struct AcademicSearchRequest {
    pub query: String,
}

/// Request to scrape a single page.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveRequest {
    pub url: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Body of the terminal `error` SSE event.
#[derive(Debug, Clone, Serialize)]
pub struct StreamError {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_request_defaults_to_basic() {
        let req: ResearchRequest = serde_json::from_str(r#"{"topic": "fusion"}"#).unwrap();
        assert_eq!(req.depth, SearchDepth::Basic);

        let req: ResearchRequest =
            serde_json::from_str(r#"{"topic": "fusion", "depth": "advanced"}"#).unwrap();
        assert_eq!(req.depth, SearchDepth::Advanced);
    }

    #[test]
    fn test_x_search_request_rejects_malformed_date() {
        use crate::search::tools::XSearchRequest;

        let req: XSearchRequest = serde_json::from_str(r#"{"query": "@rustlang"}"#).unwrap();
        assert!(req.start_date.is_none() && req.end_date.is_none());

        let bad = serde_json::from_str::<XSearchRequest>(
            r#"{"query": "rust", "startDate": "last tuesday"}"#,
        );
        assert!(bad.is_err());
    }
}
