//! JSON schemas for the model-generated research artifacts.

use serde_json::{json, Value};

use super::types::{AnalysisBody, FinalSummary, QuerySummary, ResearchPlan};
use crate::llm::StructuredOutput;

pub const PLAN_QUERY_COUNT: usize = 5;
pub const MIN_ANALYSES: usize = 2;
pub const MAX_ANALYSES: usize = 4;

fn string_list(min: usize, max: Option<usize>) -> Value {
    let mut schema = json!({"type": "array", "items": {"type": "string"}, "minItems": min});
    if let Some(max) = max {
        schema["maxItems"] = json!(max);
    }
    schema
}

fn unit_score() -> Value {
    json!({"type": "number", "minimum": 0, "maximum": 1})
}

impl StructuredOutput for ResearchPlan {
    const NAME: &'static str = "research_plan";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "searchQueries": {
                    "type": "array",
                    "minItems": PLAN_QUERY_COUNT,
                    "maxItems": PLAN_QUERY_COUNT,
                    "items": {
                        "type": "object",
                        "properties": {
                            "query": {"type": "string"},
                            "rationale": {"type": "string"},
                            "source": {"type": "string", "enum": ["web", "academic", "both"]},
                            "priority": {"type": "integer", "minimum": 1, "maximum": 5},
                            "expectedInsights": string_list(2, Some(4))
                        },
                        "required": ["query", "rationale", "source", "priority", "expectedInsights"]
                    }
                },
                "requiredAnalyses": {
                    "type": "array",
                    "minItems": MIN_ANALYSES,
                    "maxItems": MAX_ANALYSES,
                    "items": {
                        "type": "object",
                        "properties": {
                            "type": {"type": "string"},
                            "description": {"type": "string"},
                            "importance": {"type": "integer", "minimum": 1, "maximum": 5},
                            "focusAreas": string_list(2, Some(4))
                        },
                        "required": ["type", "description", "importance", "focusAreas"]
                    }
                }
            },
            "required": ["searchQueries", "requiredAnalyses"]
        })
    }
}

impl StructuredOutput for QuerySummary {
    const NAME: &'static str = "query_summary";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "mainFindings": {
                    "type": "array",
                    "minItems": 1,
                    "maxItems": 5,
                    "items": {
                        "type": "object",
                        "properties": {
                            "finding": {"type": "string"},
                            "confidence": unit_score(),
                            "supportingSources": string_list(0, None),
                            "potentialBiases": string_list(0, None)
                        },
                        "required": ["finding", "confidence", "supportingSources", "potentialBiases"]
                    }
                },
                "contrastingViewpoints": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "viewpoint": {"type": "string"},
                            "evidenceStrength": unit_score(),
                            "sourceQuality": unit_score(),
                            "limitations": string_list(0, None)
                        },
                        "required": ["viewpoint", "evidenceStrength", "sourceQuality", "limitations"]
                    }
                },
                "informationGaps": string_list(0, None),
                "sourceEvaluation": {
                    "type": "object",
                    "properties": {
                        "credibilityScore": unit_score(),
                        "diversityScore": unit_score(),
                        "recencyScore": unit_score()
                    },
                    "required": ["credibilityScore", "diversityScore", "recencyScore"]
                },
                "metaAnalysis": {
                    "type": "object",
                    "properties": {
                        "relevanceToQuery": unit_score(),
                        "coverageBreadth": unit_score(),
                        "keyTakeaways": string_list(1, Some(3))
                    },
                    "required": ["relevanceToQuery", "coverageBreadth", "keyTakeaways"]
                }
            },
            "required": [
                "mainFindings",
                "contrastingViewpoints",
                "informationGaps",
                "sourceEvaluation",
                "metaAnalysis"
            ]
        })
    }
}

impl StructuredOutput for AnalysisBody {
    const NAME: &'static str = "analysis";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "findings": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "insight": {"type": "string"},
                            "evidence": string_list(0, None),
                            "confidence": unit_score()
                        },
                        "required": ["insight", "evidence", "confidence"]
                    }
                },
                "implications": string_list(0, None),
                "limitations": string_list(0, None)
            },
            "required": ["findings", "implications", "limitations"]
        })
    }
}

impl StructuredOutput for FinalSummary {
    const NAME: &'static str = "final_summary";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "keyFindings": {
                    "type": "array",
                    "minItems": 3,
                    "maxItems": 5,
                    "items": {
                        "type": "object",
                        "properties": {
                            "finding": {"type": "string"},
                            "importance": {"type": "integer", "minimum": 1, "maximum": 5}
                        },
                        "required": ["finding", "importance"]
                    }
                },
                "consensusPoints": string_list(1, None),
                "disagreements": string_list(0, None),
                "practicalImplications": string_list(1, Some(3)),
                "plainTextSummary": {"type": "string", "minLength": 100, "maxLength": 500}
            },
            "required": [
                "keyFindings",
                "consensusPoints",
                "disagreements",
                "practicalImplications",
                "plainTextSummary"
            ]
        })
    }
}
