//! # Axon Research
//!
//! Multi-stage research service: a topic goes in, a validated research plan,
//! searched sources, per-source summaries, analyses and a final digest come
//! out.
//!
//! ## Pipeline
//!
//! ```text
//!   topic ──► Plan ──► Validate ──► Search ──► Summarize ──► Analyze ──► Synthesize
//!              │                      │
//!              └── fatal on failure ──┘       (later stages degrade to placeholders)
//! ```
//!
//! ## Modules
//! - `research`: the pipeline stages and progress events
//! - `llm`: chat-completion client and schema-constrained generation
//! - `search`: search providers (Tavily, Exa), the Firecrawl scraper and standalone tools
//! - `api`: HTTP surface
//! - `config`: environment configuration

pub mod api;
pub mod config;
pub mod llm;
pub mod research;
pub mod search;

pub use config::Config;
pub use research::{ResearchError, ResearchOutcome, ResearchPipeline};
