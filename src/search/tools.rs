//! Standalone search tools.
//!
//! `web_search` fans several queries out concurrently and joins them;
//! `academic_search` runs one paper search and cleans up the results;
//! `x_search` looks for X posts in a date window; `retrieve` scrapes a single
//! page. None of them is part of the research pipeline, which searches
//! sequentially.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::future::try_join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{
    AcademicSearchOptions, AcademicSearchProvider, ContentScraper, PostSearchOptions,
    PostSearchProvider, ScrapedPage, SearchDepth, SearchError, SearchTopic, SummaryRequest,
    WebHit, WebSearchOptions, WebSearchProvider,
};

const DEFAULT_MAX_RESULTS: u32 = 10;
const ACADEMIC_FETCH_COUNT: u32 = 20;
const ACADEMIC_KEEP_COUNT: usize = 10;
const ABSTRACT_SUMMARY_QUERY: &str = "Abstract of the Paper";

const X_SEARCH_RESULTS: u32 = 15;
const X_SEARCH_WINDOW_DAYS: i64 = 30;
const X_DOMAINS: [&str; 2] = ["twitter.com", "x.com"];

const RETRIEVE_FAILED: &str = "Failed to retrieve content";
const EXTRACT_PROMPT: &str = "Extract the page title, main content, and a brief description.";
const UNTITLED: &str = "Untitled";

/// Multi-query web search request.
///
/// Per-query parameters are matched by index; a missing entry falls back to
/// the first entry, then to the default.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchRequest {
    pub queries: Vec<String>,
    #[serde(default)]
    pub max_results: Vec<u32>,
    #[serde(default)]
    pub topics: Vec<SearchTopic>,
    #[serde(default)]
    pub search_depth: Vec<SearchDepth>,
    #[serde(default)]
    pub exclude_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuerySearch {
    pub query: String,
    pub results: Vec<WebHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebSearchToolResponse {
    pub searches: Vec<QuerySearch>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AcademicPaper {
    pub title: String,
    pub url: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcademicSearchToolResponse {
    pub results: Vec<AcademicPaper>,
}

fn pick<T: Copy>(values: &[T], index: usize, default: T) -> T {
    values
        .get(index)
        .or_else(|| values.first())
        .copied()
        .unwrap_or(default)
}

/// Host (and port, if any) of a URL; the raw string if it does not parse.
pub fn extract_domain(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => raw.to_string(),
        },
        Err(_) => raw.to_string(),
    }
}

/// Keep the first item per URL and per domain.
pub fn dedupe_by_domain_and_url<T>(items: Vec<T>, url_of: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen_urls = HashSet::new();
    let mut seen_domains = HashSet::new();

    items
        .into_iter()
        .filter(|item| {
            let url = url_of(item).to_string();
            let domain = extract_domain(&url);
            if seen_urls.contains(&url) || seen_domains.contains(&domain) {
                return false;
            }
            seen_urls.insert(url);
            seen_domains.insert(domain);
            true
        })
        .collect()
}

/// Run every query concurrently and wait for all of them.
///
/// The first provider error fails the whole call.
pub async fn web_search(
    provider: &dyn WebSearchProvider,
    request: &WebSearchRequest,
) -> Result<WebSearchToolResponse, SearchError> {
    let total = request.queries.len();

    let searches = request.queries.iter().enumerate().map(|(index, query)| {
        let topic = pick(&request.topics, index, SearchTopic::General);
        let options = WebSearchOptions {
            depth: pick(&request.search_depth, index, SearchDepth::Basic),
            max_results: pick(&request.max_results, index, DEFAULT_MAX_RESULTS),
            include_answer: true,
            topic,
            exclude_domains: request.exclude_domains.clone(),
        };

        async move {
            let response = provider.search(query, &options).await?;

            tracing::info!(
                query = %query,
                index,
                total,
                results = response.results.len(),
                "query_completion"
            );

            let results = dedupe_by_domain_and_url(response.results, |hit| hit.url.as_str())
                .into_iter()
                .map(|mut hit| {
                    if topic != SearchTopic::News {
                        hit.published_date = None;
                    }
                    hit
                })
                .collect();

            Ok::<_, SearchError>(QuerySearch {
                query: query.clone(),
                results,
                answer: response.answer,
            })
        }
    });

    Ok(WebSearchToolResponse {
        searches: try_join_all(searches).await?,
    })
}

fn summary_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^Summary:\s*").expect("static regex"))
}

fn bracket_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s\[.*?\]$").expect("static regex"))
}

/// Search research papers, dropping duplicates and results without a summary.
pub async fn academic_search(
    provider: &dyn AcademicSearchProvider,
    query: &str,
) -> Result<AcademicSearchToolResponse, SearchError> {
    let options = AcademicSearchOptions {
        num_results: ACADEMIC_FETCH_COUNT,
        category: AcademicSearchOptions::RESEARCH_PAPER.to_string(),
        summary: SummaryRequest::Query(ABSTRACT_SUMMARY_QUERY.to_string()),
    };
    let response = provider.search_contents(query, &options).await?;

    let mut seen = HashSet::new();
    let results: Vec<AcademicPaper> = response
        .results
        .into_iter()
        .filter_map(|hit| {
            let summary = hit.summary.filter(|s| !s.is_empty())?;
            if !seen.insert(hit.url.clone()) {
                return None;
            }
            let title = hit.title.unwrap_or_default();
            Some(AcademicPaper {
                title: bracket_suffix().replace(&title, "").into_owned(),
                url: hit.url,
                summary: summary_prefix().replace(&summary, "").into_owned(),
            })
        })
        .take(ACADEMIC_KEEP_COUNT)
        .collect();

    tracing::info!(query = %query, results = results.len(), "academic search complete");

    Ok(AcademicSearchToolResponse { results })
}

/// X post search request. Dates are inclusive calendar days (UTC).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XSearchRequest {
    /// Free text; a username goes in as `@username`.
    pub query: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct XPost {
    pub tweet_id: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

fn tweet_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:twitter\.com|x\.com)/\w+/status/(\d+)").expect("static regex")
    })
}

/// Numeric status id of a tweet URL, if it is one.
pub fn extract_tweet_id(url: &str) -> Option<&str> {
    tweet_url()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Search X posts. Without dates the window is the 30 days up to now.
///
/// Hits that are not status URLs (profiles, search pages) are dropped.
pub async fn x_search(
    provider: &dyn PostSearchProvider,
    request: &XSearchRequest,
) -> Result<Vec<XPost>, SearchError> {
    x_search_at(provider, request, Utc::now()).await
}

async fn x_search_at(
    provider: &dyn PostSearchProvider,
    request: &XSearchRequest,
    now: DateTime<Utc>,
) -> Result<Vec<XPost>, SearchError> {
    let start = request
        .start_date
        .map(start_of_day)
        .unwrap_or_else(|| now - chrono::Duration::days(X_SEARCH_WINDOW_DAYS));
    let end = request.end_date.map(start_of_day).unwrap_or(now);

    let options = PostSearchOptions {
        num_results: X_SEARCH_RESULTS,
        include_domains: X_DOMAINS.iter().map(|d| d.to_string()).collect(),
        start_published: Some(start),
        end_published: Some(end),
    };
    let response = provider.search_posts(&request.query, &options).await?;

    let posts: Vec<XPost> = response
        .results
        .into_iter()
        .filter_map(|hit| {
            let tweet_id = extract_tweet_id(&hit.url)?.to_string();
            Some(XPost {
                tweet_id,
                title: hit.title.unwrap_or_default(),
                url: hit.url,
                text: hit.text,
                highlights: hit.highlights,
                published_date: hit.published_date,
                author: hit.author,
            })
        })
        .collect();

    tracing::info!(query = %request.query, posts = posts.len(), "x search complete");

    Ok(posts)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RetrievedPage {
    pub title: String,
    pub content: String,
    pub url: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Either the retrieved page or an error message; never an HTTP failure.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RetrieveResponse {
    Retrieved { results: Vec<RetrievedPage> },
    Failed { error: String },
}

fn is_missing(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, str::is_empty)
}

fn fill(slot: &mut Option<String>, extracted: Option<String>) {
    if is_missing(slot) {
        if let Some(value) = extracted.filter(|v| !v.is_empty()) {
            *slot = Some(value);
        }
    }
}

/// Scrape one page, filling a missing title, description or content from a
/// prompt-driven extraction of the same URL.
pub async fn retrieve(scraper: &dyn ContentScraper, url: &str) -> RetrieveResponse {
    let ScrapedPage {
        mut title,
        mut description,
        markdown: mut content,
        source_url,
        language,
    } = match scraper.scrape(url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!(url, "Retrieve failed: {}", e);
            return RetrieveResponse::Failed {
                error: RETRIEVE_FAILED.to_string(),
            };
        }
    };

    if is_missing(&title) || is_missing(&description) || is_missing(&content) {
        match scraper.extract(url, EXTRACT_PROMPT).await {
            Ok(extracted) => {
                fill(&mut title, extracted.title);
                fill(&mut description, extracted.description);
                fill(&mut content, extracted.content);
            }
            Err(e) => tracing::warn!(url, "Extraction failed, keeping scraped fields: {}", e),
        }
    }

    RetrieveResponse::Retrieved {
        results: vec![RetrievedPage {
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            content: content.unwrap_or_default(),
            url: source_url.unwrap_or_else(|| url.to_string()),
            description: description.unwrap_or_default(),
            language,
        }],
    }
}
