//! External search providers.
//!
//! Web search goes to Tavily; academic and X post search go to Exa; page
//! scraping goes to Firecrawl. Each sits behind a small trait so the research
//! pipeline and the standalone tools can be driven by test doubles.
//!
//! The `tools` submodule holds the standalone `web_search`,
//! `academic_search`, `x_search` and `retrieve` operations exposed over HTTP.

mod exa;
mod firecrawl;
mod tavily;
pub mod tools;

pub use exa::ExaClient;
pub use firecrawl::FirecrawlClient;
pub use tavily::TavilyClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unreadable response: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
}

/// How hard the web provider should dig.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    #[default]
    General,
    News,
}

/// Parameters for one web search call.
#[derive(Debug, Clone, PartialEq)]
pub struct WebSearchOptions {
    pub depth: SearchDepth,
    pub max_results: u32,
    pub include_answer: bool,
    pub topic: SearchTopic,
    pub exclude_domains: Vec<String>,
}

impl Default for WebSearchOptions {
    fn default() -> Self {
        Self {
            depth: SearchDepth::Basic,
            max_results: 10,
            include_answer: true,
            topic: SearchTopic::General,
            exclude_domains: Vec::new(),
        }
    }
}

/// A raw web search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebHit {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebSearchResponse {
    #[serde(default)]
    pub results: Vec<WebHit>,
    #[serde(default)]
    pub answer: Option<String>,
}

/// What kind of per-result summary to request from the academic provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryRequest {
    /// Provider default summary.
    Default,
    /// Summary guided by a query, e.g. "Abstract of the Paper".
    Query(String),
}

/// Parameters for one academic search call.
#[derive(Debug, Clone, PartialEq)]
pub struct AcademicSearchOptions {
    pub num_results: u32,
    pub category: String,
    pub summary: SummaryRequest,
}

impl AcademicSearchOptions {
    pub const RESEARCH_PAPER: &'static str = "research paper";

    pub fn research_papers(num_results: u32) -> Self {
        Self {
            num_results,
            category: Self::RESEARCH_PAPER.to_string(),
            summary: SummaryRequest::Default,
        }
    }
}

/// A raw academic search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcademicHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcademicSearchResponse {
    #[serde(default)]
    pub results: Vec<AcademicHit>,
}

/// Parameters for a keyword search over social posts.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSearchOptions {
    pub num_results: u32,
    pub include_domains: Vec<String>,
    pub start_published: Option<DateTime<Utc>>,
    pub end_published: Option<DateTime<Utc>>,
}

/// A raw post hit, with its text and highlighted passages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostSearchResponse {
    #[serde(default)]
    pub results: Vec<PostHit>,
}

/// Markdown and metadata of one scraped page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPage {
    pub title: Option<String>,
    pub description: Option<String>,
    pub markdown: Option<String>,
    /// URL the scraper actually fetched, after redirects.
    pub source_url: Option<String>,
    pub language: Option<String>,
}

/// Fields recovered from a page by prompt-driven extraction.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedPage {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        options: &WebSearchOptions,
    ) -> Result<WebSearchResponse, SearchError>;
}

#[async_trait]
pub trait AcademicSearchProvider: Send + Sync {
    async fn search_contents(
        &self,
        query: &str,
        options: &AcademicSearchOptions,
    ) -> Result<AcademicSearchResponse, SearchError>;
}

#[async_trait]
pub trait PostSearchProvider: Send + Sync {
    async fn search_posts(
        &self,
        query: &str,
        options: &PostSearchOptions,
    ) -> Result<PostSearchResponse, SearchError>;
}

#[async_trait]
pub trait ContentScraper: Send + Sync {
    /// Fetch one page as markdown plus metadata.
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, SearchError>;

    /// Ask the provider to pull title, description and main content out of
    /// a page, guided by `prompt`.
    async fn extract(&self, url: &str, prompt: &str) -> Result<ExtractedPage, SearchError>;
}
