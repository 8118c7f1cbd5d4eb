//! Cross-summary analyses requested by the plan.

use super::events::{ProgressEvent, ProgressPayload, ProgressSink, StageKind};
use super::models::{ModelProfile, ModelProvider};
use super::retry::RetryPolicy;
use super::types::{AnalysisBody, AnalysisResult, RequiredAnalysis, SummarizedResult};
use crate::llm::LlmError;

const PRIMARY_TEMPERATURE: f64 = 0.5;
const FALLBACK_TEMPERATURE: f64 = 0.3;

pub struct Analyzer {
    models: ModelProvider,
    retry: RetryPolicy,
}

impl Analyzer {
    pub fn new(models: ModelProvider) -> Self {
        Self {
            models,
            retry: RetryPolicy::ANALYSIS,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run each required analysis in plan order.
    ///
    /// `on_analysis_done` is called after each analysis' completed event.
    pub async fn analyze(
        &self,
        analyses: &[RequiredAnalysis],
        summaries: &[SummarizedResult],
        sink: &dyn ProgressSink,
        mut on_analysis_done: impl FnMut(),
    ) -> Vec<AnalysisResult> {
        let summaries_json =
            serde_json::to_string_pretty(summaries).unwrap_or_else(|_| "[]".to_string());
        let mut results = Vec::with_capacity(analyses.len());

        for (index, analysis) in analyses.iter().enumerate() {
            let id = format!("analysis-{}", index);
            let kind = analysis.analysis_type.as_str();

            sink.emit(
                ProgressEvent::running(
                    id.clone(),
                    StageKind::Analysis,
                    format!("Analyzing {}", kind),
                    format!("Analyzing {}...", kind),
                )
                .with_payload(ProgressPayload::AnalysisStarted {
                    analysis_type: kind.to_string(),
                }),
            );

            let prompt = analysis_prompt(analysis, &summaries_json);
            let result = match self.run_analysis(&prompt, kind).await {
                Ok(body) => AnalysisResult::from_body(kind, body),
                Err(e) => {
                    tracing::error!(analysis = kind, "Both models failed, using placeholder: {}", e);
                    AnalysisResult::placeholder(kind)
                }
            };

            sink.emit(
                ProgressEvent::completed(
                    id,
                    StageKind::Analysis,
                    format!("Analysis of {} complete", kind),
                    if result.degraded {
                        "Analysis failed"
                    } else {
                        "Analysis complete"
                    },
                )
                .with_payload(ProgressPayload::AnalysisCompleted {
                    analysis_type: kind.to_string(),
                    findings: result.findings.clone(),
                }),
            );

            results.push(result);
            on_analysis_done();
        }

        results
    }

    async fn run_analysis(&self, prompt: &str, kind: &str) -> Result<AnalysisBody, LlmError> {
        let primary = self
            .retry
            .run("analysis", || {
                self.models
                    .generate::<AnalysisBody>(ModelProfile::Primary, prompt, PRIMARY_TEMPERATURE)
            })
            .await;

        match primary {
            Ok(body) => Ok(body),
            Err(e) => {
                tracing::warn!(analysis = kind, "Primary model failed ({}), trying fallback", e);
                self.models
                    .generate::<AnalysisBody>(ModelProfile::Fallback, prompt, FALLBACK_TEMPERATURE)
                    .await
            }
        }
    }
}

fn analysis_prompt(analysis: &RequiredAnalysis, summaries_json: &str) -> String {
    format!(
        "Perform a {kind} analysis of the research summaries below.\n\
         {description}\n\
         Focus areas: {focus}\n\
         \n\
         Consider every source and its reliability. Report findings as insights with \
         supporting evidence and a confidence between 0 and 1, then the implications and \
         the limitations of the analysis.\n\
         \n\
         Summaries:\n{summaries}",
        kind = analysis.analysis_type,
        description = analysis.description,
        focus = analysis.focus_areas.join(", "),
        summaries = summaries_json,
    )
}
