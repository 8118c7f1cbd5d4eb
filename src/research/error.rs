//! Fatal research errors.
//!
//! Only plan generation, plan validation and search provider failures abort
//! a run. Everything downstream of search degrades to placeholders instead.

use thiserror::Error;

use super::pipeline::PipelineState;
use crate::llm::LlmError;
use crate::search::SearchError;

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Plan generation failed: primary: {primary}; fallback: {fallback}")]
    PlanGeneration {
        primary: LlmError,
        fallback: LlmError,
    },

    #[error("Research plan is invalid: {}", errors.join("; "))]
    InvalidPlan { errors: Vec<String> },

    #[error("Search step {step_id} failed: {source}")]
    Search {
        step_id: String,
        #[source]
        source: SearchError,
    },

    #[error("Research timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ResearchError {
    /// Short machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ResearchError::PlanGeneration { .. } => "plan_generation_failed",
            ResearchError::InvalidPlan { .. } => "invalid_plan",
            ResearchError::Search { .. } => "search_failed",
            ResearchError::Timeout(_) => "timeout",
        }
    }

    /// State the run ends in when this error stops it.
    pub fn terminal_state(&self) -> PipelineState {
        match self {
            ResearchError::PlanGeneration { .. } | ResearchError::InvalidPlan { .. } => {
                PipelineState::Failed
            }
            ResearchError::Search { .. } | ResearchError::Timeout(_) => PipelineState::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_plan_lists_errors() {
        let err = ResearchError::InvalidPlan {
            errors: vec!["query 0 too short".into(), "rationale 1 too short".into()],
        };
        assert_eq!(
            err.to_string(),
            "Research plan is invalid: query 0 too short; rationale 1 too short"
        );
        assert_eq!(err.code(), "invalid_plan");
    }

    #[test]
    fn test_search_error_keeps_step_id() {
        let err = ResearchError::Search {
            step_id: "search-web-2".into(),
            source: SearchError::Api {
                provider: "Tavily",
                status: 503,
                body: "unavailable".into(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("search-web-2"));
        assert!(text.contains("503"));
    }
}
