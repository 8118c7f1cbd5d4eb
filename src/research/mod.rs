//! Multi-stage research pipeline.
//!
//! A run goes through these stages in order:
//!
//! 1. **Plan**: the model proposes search queries and analyses for the topic
//! 2. **Validate**: the plan is checked; errors end the run, warnings are logged
//! 3. **Search**: each query runs against web and/or academic providers
//! 4. **Summarize**: each search result is distilled into a scored summary
//! 5. **Analyze**: each requested analysis runs over all summaries
//! 6. **Synthesize**: a final digest is produced
//!
//! Progress is reported through a [`ProgressSink`] while the run is in flight.

mod analyzer;
mod dispatcher;
mod error;
mod events;
mod models;
mod pipeline;
mod planner;
mod retry;
mod schema;
mod summarizer;
mod synthesizer;
mod types;
mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use analyzer::Analyzer;
pub use dispatcher::{derive_steps, result_cap, SearchDispatcher};
pub use error::ResearchError;
pub use events::{
    ChannelSink, EventStatus, NoopSink, ProgressEvent, ProgressPayload, ProgressSink, StageKind,
};
pub use models::{ModelProfile, ModelProvider};
pub use pipeline::{PipelineState, ResearchPipeline};
pub use planner::PlanGenerator;
pub use retry::RetryPolicy;
pub use summarizer::Summarizer;
pub use synthesizer::Synthesizer;
pub use types::*;
pub use validator::{validate, PlanValidation};
