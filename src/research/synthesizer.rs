//! Final synthesis over all summaries and analyses.

use super::events::{ProgressEvent, ProgressPayload, ProgressSink, StageKind};
use super::models::{ModelProfile, ModelProvider};
use super::types::{AnalysisResult, FinalSummary, SummarizedResult};

const TEMPERATURE: f64 = 0.1;
const EVENT_ID: &str = "final-summary";

pub struct Synthesizer {
    models: ModelProvider,
}

impl Synthesizer {
    pub fn new(models: ModelProvider) -> Self {
        Self { models }
    }

    /// Never fails; returns `FinalSummary::fallback()` and `true` when the
    /// model call does.
    pub async fn synthesize(
        &self,
        topic: &str,
        summaries: &[SummarizedResult],
        analyses: &[AnalysisResult],
        sink: &dyn ProgressSink,
    ) -> (FinalSummary, bool) {
        sink.emit(ProgressEvent::running(
            EVENT_ID,
            StageKind::Summary,
            "Final Summary",
            "Synthesizing research findings...",
        ));

        let prompt = synthesis_prompt(topic, summaries, analyses);
        let (summary, degraded) = match self
            .models
            .generate::<FinalSummary>(ModelProfile::Primary, &prompt, TEMPERATURE)
            .await
        {
            Ok(summary) => (summary, false),
            Err(e) => {
                tracing::warn!("Final synthesis failed, using fallback summary: {}", e);
                (FinalSummary::fallback(), true)
            }
        };

        sink.emit(
            ProgressEvent::completed(
                EVENT_ID,
                StageKind::Summary,
                "Final Summary",
                if degraded {
                    "Final summary unavailable, showing placeholder"
                } else {
                    "Final summary ready"
                },
            )
            .with_payload(ProgressPayload::FinalSummary {
                final_summary: summary.clone(),
            }),
        );

        (summary, degraded)
    }
}

fn synthesis_prompt(
    topic: &str,
    summaries: &[SummarizedResult],
    analyses: &[AnalysisResult],
) -> String {
    let summaries = serde_json::to_string(summaries).unwrap_or_else(|_| "[]".to_string());
    let analyses = serde_json::to_string(analyses).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Write the final summary of the research on \"{topic}\".\n\
         \n\
         Give 3-5 key findings ranked by importance (1-5), the points the sources agree on, \
         notable disagreements, 1-3 practical implications, and a plain-language summary of \
         100 to 500 characters.\n\
         \n\
         Summaries:\n{summaries}\n\
         \n\
         Analyses:\n{analyses}",
        topic = topic,
        summaries = summaries,
        analyses = analyses,
    )
}
