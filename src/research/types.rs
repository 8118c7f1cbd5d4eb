//! Data model of a research run.
//!
//! Everything here serializes with camelCase keys; the same shapes are
//! requested from the model, streamed in progress events and returned to
//! HTTP callers.

use serde::{Deserialize, Serialize};

use crate::search::SearchDepth;

/// Where a planned query should be searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuerySource {
    Web,
    Academic,
    Both,
}

/// One planned search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanQuery {
    pub query: String,
    pub rationale: String,
    pub source: QuerySource,
    /// 1 (most important) to 5.
    pub priority: u8,
    pub expected_insights: Vec<String>,
}

/// One analysis the plan asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredAnalysis {
    #[serde(rename = "type")]
    pub analysis_type: String,
    pub description: String,
    pub importance: u8,
    pub focus_areas: Vec<String>,
}

/// Structured research plan. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPlan {
    pub search_queries: Vec<PlanQuery>,
    pub required_analyses: Vec<RequiredAnalysis>,
}

/// Which provider a search step goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Web,
    Academic,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Web => "web",
            SearchKind::Academic => "academic",
        }
    }
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete search derived from a plan query. Borrows the query from the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchStep<'a> {
    /// `search-{web|academic}-{queryIndex}`
    pub id: String,
    pub kind: SearchKind,
    pub query_index: usize,
    pub query: &'a PlanQuery,
}

/// A normalized search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    pub source: SearchKind,
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Output of one executed search step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub query_index: usize,
    pub query: PlanQuery,
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainFinding {
    pub finding: String,
    pub confidence: f64,
    pub supporting_sources: Vec<String>,
    pub potential_biases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContrastingViewpoint {
    pub viewpoint: String,
    pub evidence_strength: f64,
    pub source_quality: f64,
    pub limitations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEvaluation {
    pub credibility_score: f64,
    pub diversity_score: f64,
    pub recency_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaAnalysis {
    pub relevance_to_query: f64,
    pub coverage_breadth: f64,
    pub key_takeaways: Vec<String>,
}

/// Confidence-scored distillation of one search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySummary {
    pub main_findings: Vec<MainFinding>,
    #[serde(default)]
    pub contrasting_viewpoints: Vec<ContrastingViewpoint>,
    #[serde(default)]
    pub information_gaps: Vec<String>,
    pub source_evaluation: SourceEvaluation,
    pub meta_analysis: MetaAnalysis,
}

impl QuerySummary {
    /// Placeholder used when summarization fails.
    pub fn fallback() -> Self {
        Self {
            main_findings: vec![MainFinding {
                finding: "Error analyzing search results".to_string(),
                confidence: 0.1,
                supporting_sources: Vec::new(),
                potential_biases: vec!["Automated summary unavailable".to_string()],
            }],
            contrasting_viewpoints: Vec::new(),
            information_gaps: vec!["Summary generation failed for this query".to_string()],
            source_evaluation: SourceEvaluation {
                credibility_score: 0.5,
                diversity_score: 0.5,
                recency_score: 0.5,
            },
            meta_analysis: MetaAnalysis {
                relevance_to_query: 0.5,
                coverage_breadth: 0.5,
                key_takeaways: vec!["Error generating analysis".to_string()],
            },
        }
    }
}

/// A summary paired with the search it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizedResult {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub summary: QuerySummary,
    /// True when `summary` is the placeholder.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFinding {
    pub insight: String,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

/// The part of an analysis the model produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisBody {
    pub findings: Vec<AnalysisFinding>,
    pub implications: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
}

/// Result of one required analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(rename = "type")]
    pub analysis_type: String,
    pub findings: Vec<AnalysisFinding>,
    pub implications: Vec<String>,
    pub limitations: Vec<String>,
    pub degraded: bool,
}

impl AnalysisResult {
    pub fn from_body(analysis_type: &str, body: AnalysisBody) -> Self {
        Self {
            analysis_type: analysis_type.to_string(),
            findings: body.findings,
            implications: body.implications,
            limitations: body.limitations,
            degraded: false,
        }
    }

    /// Placeholder used when both models failed.
    pub fn placeholder(analysis_type: &str) -> Self {
        Self {
            analysis_type: analysis_type.to_string(),
            findings: vec![AnalysisFinding {
                insight: format!("The {} analysis failed to complete", analysis_type),
                evidence: Vec::new(),
                confidence: 0.0,
            }],
            implications: vec!["Analysis failed; no implications could be drawn".to_string()],
            limitations: vec!["Both the primary and the fallback model failed".to_string()],
            degraded: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFinding {
    pub finding: String,
    pub importance: u8,
}

/// Short user-facing digest of the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSummary {
    pub key_findings: Vec<KeyFinding>,
    pub consensus_points: Vec<String>,
    #[serde(default)]
    pub disagreements: Vec<String>,
    pub practical_implications: Vec<String>,
    pub plain_text_summary: String,
}

impl FinalSummary {
    /// Deterministic digest used when synthesis fails.
    pub fn fallback() -> Self {
        Self {
            key_findings: vec![
                KeyFinding {
                    finding: "Automated synthesis of the research was unavailable".to_string(),
                    importance: 3,
                },
                KeyFinding {
                    finding: "Individual search summaries remain available for review".to_string(),
                    importance: 2,
                },
                KeyFinding {
                    finding: "Analyses were produced from the collected sources".to_string(),
                    importance: 2,
                },
            ],
            consensus_points: vec![
                "Review the individual summaries and analyses for details".to_string(),
            ],
            disagreements: Vec::new(),
            practical_implications: vec![
                "Treat these results as preliminary until a full synthesis is available"
                    .to_string(),
            ],
            plain_text_summary: "Research completed with partial results. The automated \
                                 synthesis step did not finish, so the key points below are \
                                 generic. Review the individual search summaries and analyses \
                                 for the detailed findings on this topic."
                .to_string(),
        }
    }
}

/// Everything a successful run produces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchOutcome {
    pub topic: String,
    pub depth: SearchDepth,
    pub plan: ResearchPlan,
    pub results: Vec<SearchResult>,
    pub summaries: Vec<SummarizedResult>,
    pub analyses: Vec<AnalysisResult>,
    pub final_summary: FinalSummary,
    /// True when `final_summary` is the fallback digest.
    pub final_summary_degraded: bool,
    pub completed_steps: usize,
    pub total_steps: usize,
}

impl ResearchOutcome {
    /// Number of stage outputs replaced by a placeholder.
    pub fn degraded_count(&self) -> usize {
        self.summaries.iter().filter(|s| s.degraded).count()
            + self.analyses.iter().filter(|a| a.degraded).count()
            + usize::from(self.final_summary_degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_deserializes_camel_case() {
        let json = r#"{
            "searchQueries": [{
                "query": "quantum error correction 2024",
                "rationale": "Error correction is the main scaling bottleneck",
                "source": "both",
                "priority": 1,
                "expectedInsights": ["logical qubit counts", "threshold results"]
            }],
            "requiredAnalyses": [{
                "type": "trend",
                "description": "How fast logical qubits improve",
                "importance": 4,
                "focusAreas": ["hardware", "codes"]
            }]
        }"#;
        let plan: ResearchPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.search_queries[0].source, QuerySource::Both);
        assert_eq!(plan.required_analyses[0].analysis_type, "trend");
        assert_eq!(plan.required_analyses[0].focus_areas.len(), 2);
    }

    #[test]
    fn test_fallback_summary_text_length() {
        let len = FinalSummary::fallback().plain_text_summary.chars().count();
        assert!((100..=500).contains(&len), "length was {}", len);
    }

    #[test]
    fn test_placeholder_analysis_has_zero_confidence() {
        let result = AnalysisResult::placeholder("comparative");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].confidence, 0.0);
        assert!(result.findings[0].insight.contains("failed"));
        assert!(result.degraded);
    }

    #[test]
    fn test_search_result_serializes_type_tag() {
        let result = SearchResult {
            kind: SearchKind::Academic,
            query_index: 2,
            query: PlanQuery {
                query: "q".into(),
                rationale: "r".into(),
                source: QuerySource::Academic,
                priority: 3,
                expected_insights: vec![],
            },
            items: vec![],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], "academic");
        assert_eq!(value["queryIndex"], 2);
    }
}
