//! Tavily web search client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{
    SearchDepth, SearchError, SearchTopic, WebSearchOptions, WebSearchProvider, WebSearchResponse,
};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const PROVIDER: &str = "Tavily";

/// Days of history searched for the `news` topic.
const NEWS_WINDOW_DAYS: u32 = 7;

pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, TAVILY_API_URL.to_string())
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
}

/// Tavily API request body.
#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: SearchDepth,
    topic: SearchTopic,
    max_results: u32,
    include_answer: bool,
    include_raw_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
    #[serde(skip_serializing_if = "no_domains")]
    exclude_domains: &'a [String],
}

fn no_domains(domains: &&[String]) -> bool {
    domains.is_empty()
}

impl<'a> TavilySearchRequest<'a> {
    fn new(api_key: &'a str, query: &'a str, options: &'a WebSearchOptions) -> Self {
        Self {
            api_key,
            query,
            search_depth: options.depth,
            topic: options.topic,
            max_results: options.max_results,
            include_answer: options.include_answer,
            include_raw_content: false,
            days: (options.topic == SearchTopic::News).then_some(NEWS_WINDOW_DAYS),
            exclude_domains: &options.exclude_domains,
        }
    }
}

#[async_trait]
impl WebSearchProvider for TavilyClient {
    async fn search(
        &self,
        query: &str,
        options: &WebSearchOptions,
    ) -> Result<WebSearchResponse, SearchError> {
        let request = TavilySearchRequest::new(&self.api_key, query, options);

        tracing::debug!(
            "Tavily search: query={:?} depth={:?} max_results={}",
            query,
            options.depth,
            options.max_results
        );

        let response = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json")
            .json(&request)
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

        response
            .json::<WebSearchResponse>()
            .await
            .map_err(|e| SearchError::Decode {
                provider: PROVIDER,
                message: e.to_string(),
            })
    }
}
