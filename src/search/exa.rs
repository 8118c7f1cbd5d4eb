//! Exa search client: research papers and X posts.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    AcademicSearchOptions, AcademicSearchProvider, AcademicSearchResponse, PostSearchOptions,
    PostSearchProvider, PostSearchResponse, SearchError, SummaryRequest,
};

const EXA_API_URL: &str = "https://api.exa.ai/search";
const PROVIDER: &str = "Exa";

pub struct ExaClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ExaClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, EXA_API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            base_url,
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, body: &B) -> Result<R, SearchError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|source| SearchError::Http {
                provider: PROVIDER,
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                provider: PROVIDER,
                status,
                body,
            });
        }

        response.json::<R>().await.map_err(|e| SearchError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchRequest<'a> {
    query: &'a str,
    num_results: u32,
    #[serde(rename = "type")]
    search_type: &'static str,
    category: &'a str,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    summary: serde_json::Value,
}

impl<'a> ExaSearchRequest<'a> {
    fn new(query: &'a str, options: &'a AcademicSearchOptions) -> Self {
        let summary = match &options.summary {
            SummaryRequest::Default => serde_json::Value::Bool(true),
            SummaryRequest::Query(q) => serde_json::json!({ "query": q }),
        };
        Self {
            query,
            num_results: options.num_results,
            search_type: "auto",
            category: &options.category,
            contents: ExaContents { summary },
        }
    }
}

/// Keyword search restricted to a set of domains, returning full text.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaPostSearchRequest<'a> {
    query: &'a str,
    num_results: u32,
    #[serde(rename = "type")]
    search_type: &'static str,
    include_domains: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    start_published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_published_date: Option<String>,
    contents: ExaTextContents,
}

#[derive(Debug, Serialize)]
struct ExaTextContents {
    text: bool,
    highlights: bool,
}

fn iso_millis(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl<'a> ExaPostSearchRequest<'a> {
    fn new(query: &'a str, options: &'a PostSearchOptions) -> Self {
        Self {
            query,
            num_results: options.num_results,
            search_type: "keyword",
            include_domains: &options.include_domains,
            start_published_date: options.start_published.as_ref().map(iso_millis),
            end_published_date: options.end_published.as_ref().map(iso_millis),
            contents: ExaTextContents {
                text: true,
                highlights: true,
            },
        }
    }
}

#[async_trait]
impl AcademicSearchProvider for ExaClient {
    async fn search_contents(
        &self,
        query: &str,
        options: &AcademicSearchOptions,
    ) -> Result<AcademicSearchResponse, SearchError> {
        tracing::debug!(
            "Exa search: query={:?} category={:?} num_results={}",
            query,
            options.category,
            options.num_results
        );
        self.post(&ExaSearchRequest::new(query, options)).await
    }
}

#[async_trait]
impl PostSearchProvider for ExaClient {
    async fn search_posts(
        &self,
        query: &str,
        options: &PostSearchOptions,
    ) -> Result<PostSearchResponse, SearchError> {
        tracing::debug!(
            "Exa post search: query={:?} domains={:?} num_results={}",
            query,
            options.include_domains,
            options.num_results
        );
        self.post(&ExaPostSearchRequest::new(query, options)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_default_summary() {
        let options = AcademicSearchOptions::research_papers(3);
        let body = serde_json::to_value(ExaSearchRequest::new("qubits", &options)).unwrap();

        assert_eq!(body["numResults"], 3);
        assert_eq!(body["type"], "auto");
        assert_eq!(body["category"], "research paper");
        assert_eq!(body["contents"]["summary"], true);
    }

    #[test]
    fn test_request_body_query_summary() {
        let options = AcademicSearchOptions {
            num_results: 20,
            category: "research paper".to_string(),
            summary: SummaryRequest::Query("Abstract of the Paper".to_string()),
        };
        let body = serde_json::to_value(ExaSearchRequest::new("qubits", &options)).unwrap();
        assert_eq!(body["contents"]["summary"]["query"], "Abstract of the Paper");
    }

    #[test]
    fn test_post_request_body() {
        let start = "2024-05-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let options = PostSearchOptions {
            num_results: 15,
            include_domains: vec!["twitter.com".to_string(), "x.com".to_string()],
            start_published: Some(start),
            end_published: None,
        };
        let body = serde_json::to_value(ExaPostSearchRequest::new("@rustlang", &options)).unwrap();

        assert_eq!(body["type"], "keyword");
        assert_eq!(body["numResults"], 15);
        assert_eq!(body["includeDomains"], serde_json::json!(["twitter.com", "x.com"]));
        assert_eq!(body["startPublishedDate"], "2024-05-01T00:00:00.000Z");
        assert!(body.get("endPublishedDate").is_none());
        assert_eq!(body["contents"]["text"], true);
        assert_eq!(body["contents"]["highlights"], true);
        assert!(body.get("category").is_none());
    }

    #[test]
    fn test_post_response_parses_camel_case() {
        let body = r#"{"results": [{
            "url": "https://x.com/rustlang/status/1790000000000000000",
            "publishedDate": "2024-05-13T12:00:00.000Z",
            "author": "rustlang",
            "text": "Rust 1.78 is out",
            "highlights": ["Rust 1.78"]
        }]}"#;
        let parsed: PostSearchResponse = serde_json::from_str(body).unwrap();
        let hit = &parsed.results[0];
        assert!(hit.title.is_none());
        assert_eq!(hit.published_date.as_deref(), Some("2024-05-13T12:00:00.000Z"));
        assert_eq!(hit.highlights, vec!["Rust 1.78".to_string()]);
    }

    #[test]
    fn test_response_with_missing_title_and_summary() {
        let body = r#"{"results": [{"url": "https://arxiv.org/abs/1", "id": "x"}]}"#;
        let parsed: AcademicSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results[0].url, "https://arxiv.org/abs/1");
        assert!(parsed.results[0].title.is_none());
        assert!(parsed.results[0].summary.is_none());
    }
}
