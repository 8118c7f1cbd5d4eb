//! Firecrawl page scraping client.
//!
//! `scrape` is a single request. `extract` starts an asynchronous job and
//! polls it until it completes, fails, or runs out of polls.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ContentScraper, ExtractedPage, ScrapedPage, SearchError};

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";
const PROVIDER: &str = "Firecrawl";

const EXTRACT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const EXTRACT_MAX_POLLS: u32 = 60;

pub struct FirecrawlClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FirecrawlClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, FIRECRAWL_API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn send<R: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<R, SearchError> {
        let response = request
            .bearer_auth(&self.api_key)
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
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<ScrapeMetadata>,
}

#[derive(Debug, Deserialize)]
struct ScrapeMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default, rename = "sourceURL")]
    source_url: Option<String>,
}

fn unsuccessful(error: Option<String>, fallback: &str) -> SearchError {
    SearchError::Decode {
        provider: PROVIDER,
        message: error.unwrap_or_else(|| fallback.to_string()),
    }
}

impl ScrapeResponse {
    /// A scrape without metadata counts as a failure.
    fn into_page(self) -> Result<ScrapedPage, SearchError> {
        let data = match self.data {
            Some(data) if self.success => data,
            _ => return Err(unsuccessful(self.error, "scrape was not successful")),
        };
        let metadata = data
            .metadata
            .ok_or_else(|| unsuccessful(None, "scrape returned no metadata"))?;

        Ok(ScrapedPage {
            title: metadata.title,
            description: metadata.description,
            markdown: data.markdown,
            source_url: metadata.source_url,
            language: metadata.language,
        })
    }
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    urls: [&'a str; 1],
    prompt: &'a str,
    schema: serde_json::Value,
}

fn extract_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "content": {"type": "string"},
            "description": {"type": "string"}
        },
        "required": ["title", "content", "description"]
    })
}

/// Both the job-start reply and each status poll.
#[derive(Debug, Deserialize)]
struct ExtractJob {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<ExtractedPage>,
    #[serde(default)]
    error: Option<String>,
}

impl ExtractJob {
    /// `Some` once the job has finished, `None` while it is still running.
    fn finished(self) -> Result<Option<ExtractedPage>, SearchError> {
        if !self.success {
            return Err(unsuccessful(self.error, "extraction was not successful"));
        }
        match self.status.as_deref() {
            Some("completed") => self
                .data
                .map(Some)
                .ok_or_else(|| unsuccessful(None, "extraction completed without data")),
            Some("failed") | Some("cancelled") => {
                Err(unsuccessful(self.error, "extraction failed"))
            }
            // Older deployments answer synchronously without a status.
            None if self.data.is_some() => Ok(self.data),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ContentScraper for FirecrawlClient {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, SearchError> {
        tracing::debug!("Firecrawl scrape: url={:?}", url);
        let request = self
            .client
            .post(format!("{}/scrape", self.base_url))
            .json(&ScrapeRequest {
                url,
                formats: ["markdown"],
            });
        self.send::<ScrapeResponse>(request).await?.into_page()
    }

    async fn extract(&self, url: &str, prompt: &str) -> Result<ExtractedPage, SearchError> {
        tracing::debug!("Firecrawl extract: url={:?}", url);
        let request = self
            .client
            .post(format!("{}/extract", self.base_url))
            .json(&ExtractRequest {
                urls: [url],
                prompt,
                schema: extract_schema(),
            });
        let started: ExtractJob = self.send(request).await?;
        let id = started.id.clone();
        if let Some(page) = started.finished()? {
            return Ok(page);
        }
        let id = id.ok_or_else(|| unsuccessful(None, "extraction job has no id"))?;

        for _ in 0..EXTRACT_MAX_POLLS {
            tokio::time::sleep(EXTRACT_POLL_INTERVAL).await;
            let poll = self
                .client
                .get(format!("{}/extract/{}", self.base_url, id));
            if let Some(page) = self.send::<ExtractJob>(poll).await?.finished()? {
                return Ok(page);
            }
        }

        tracing::warn!(job = %id, "Firecrawl extraction did not finish in time");
        Err(unsuccessful(None, "extraction did not finish in time"))
    }
}
