//! HTTP API for the research service.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/research` - Run a research pipeline and return the outcome
//! - `POST /api/research/stream` - Run a research pipeline, streaming progress via SSE
//! - `POST /api/search` - Multi-query web search
//! - `POST /api/academic` - Academic paper search
//! - `POST /api/x-search` - X (Twitter) post search
//! - `POST /api/retrieve` - Scrape one page (needs `FIRECRAWL_API_KEY`)

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
