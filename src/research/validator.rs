//! Plan validation.
//!
//! Pure: no I/O, no logging. The caller decides what to do with warnings.

use std::collections::HashSet;

use serde::Serialize;

use super::schema::{MAX_ANALYSES, MIN_ANALYSES, PLAN_QUERY_COUNT};
use super::types::{QuerySource, ResearchPlan};

pub const MIN_QUERY_CHARS: usize = 10;
pub const MIN_RATIONALE_CHARS: usize = 20;
pub const MIN_DISTINCT_PRIORITIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn validate(plan: &ResearchPlan) -> PlanValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if plan.search_queries.len() != PLAN_QUERY_COUNT {
        errors.push(format!(
            "Plan must contain exactly {} search queries, found {}",
            PLAN_QUERY_COUNT,
            plan.search_queries.len()
        ));
    }

    let analyses = plan.required_analyses.len();
    if !(MIN_ANALYSES..=MAX_ANALYSES).contains(&analyses) {
        errors.push(format!(
            "Plan must contain {}-{} analyses, found {}",
            MIN_ANALYSES, MAX_ANALYSES, analyses
        ));
    }

    for (i, query) in plan.search_queries.iter().enumerate() {
        if query.query.chars().count() < MIN_QUERY_CHARS {
            errors.push(format!(
                "Query {} is too short (minimum {} characters): {:?}",
                i, MIN_QUERY_CHARS, query.query
            ));
        }
        if query.rationale.chars().count() < MIN_RATIONALE_CHARS {
            errors.push(format!(
                "Rationale for query {} is too short (minimum {} characters)",
                i, MIN_RATIONALE_CHARS
            ));
        }
        if !(1..=5).contains(&query.priority) {
            errors.push(format!(
                "Query {} has priority {}, expected 1-5",
                i, query.priority
            ));
        }
    }

    let priorities: HashSet<u8> = plan.search_queries.iter().map(|q| q.priority).collect();
    if priorities.len() < MIN_DISTINCT_PRIORITIES {
        warnings.push(format!(
            "Only {} distinct priorities; consider spreading queries over at least {}",
            priorities.len(),
            MIN_DISTINCT_PRIORITIES
        ));
    }

    let has_source = |source| plan.search_queries.iter().any(|q| q.source == source);
    if !has_source(QuerySource::Web) && !has_source(QuerySource::Academic) {
        warnings.push("No query explicitly targets web or academic sources".to_string());
    }

    PlanValidation {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}
