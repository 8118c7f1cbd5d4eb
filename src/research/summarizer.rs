//! Per-result summarization.

use super::events::{ProgressEvent, ProgressPayload, ProgressSink, StageKind};
use super::models::{ModelProfile, ModelProvider};
use super::types::{QuerySummary, SearchResult, SummarizedResult};

const TEMPERATURE: f64 = 0.1;

pub struct Summarizer {
    models: ModelProvider,
}

impl Summarizer {
    pub fn new(models: ModelProvider) -> Self {
        Self { models }
    }

    /// Summarize each result in order. Failures become the fallback summary.
    pub async fn summarize(
        &self,
        results: &[SearchResult],
        sink: &dyn ProgressSink,
    ) -> Vec<SummarizedResult> {
        let mut summaries = Vec::with_capacity(results.len());

        for (index, result) in results.iter().enumerate() {
            let query = result.query.query.clone();
            let (summary, degraded) = match self.summarize_one(result).await {
                Ok(summary) => (summary, false),
                Err(e) => {
                    tracing::warn!(
                        query = %query,
                        kind = %result.kind,
                        "Summary failed, using fallback: {}",
                        e
                    );
                    (QuerySummary::fallback(), true)
                }
            };

            let message = if degraded {
                "Summary unavailable, showing placeholder"
            } else {
                "Summary generated"
            };
            sink.emit(
                ProgressEvent::completed(
                    format!("summary-{}", index),
                    StageKind::Summary,
                    format!("Summarized {} results for \"{}\"", result.kind, query),
                    message,
                )
                .with_payload(ProgressPayload::Summary {
                    query: query.clone(),
                    summary: summary.clone(),
                }),
            );

            summaries.push(SummarizedResult {
                query,
                kind: result.kind,
                summary,
                degraded,
            });
        }

        summaries
    }

    async fn summarize_one(&self, result: &SearchResult) -> Result<QuerySummary, crate::llm::LlmError> {
        let prompt = summary_prompt(result);
        self.models
            .generate::<QuerySummary>(ModelProfile::Primary, &prompt, TEMPERATURE)
            .await
    }
}

fn summary_prompt(result: &SearchResult) -> String {
    let items = serde_json::to_string_pretty(&result.items).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Analyze the following {kind} search results for the query \"{query}\".\n\
         Rationale for the search: {rationale}\n\
         \n\
         Extract 1-5 main findings with a confidence between 0 and 1, the sources that \
         support them and any potential biases. Note contrasting viewpoints and information \
         gaps, evaluate the credibility, diversity and recency of the sources, and give 1-3 \
         key takeaways.\n\
         \n\
         Search results:\n{items}",
        kind = result.kind,
        query = result.query.query,
        rationale = result.query.rationale,
        items = items,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::research::events::EventStatus;
    use crate::research::testing::{self, RecordingSink, ScriptedLlm};
    use crate::research::types::{PlanQuery, QuerySource, SearchItem, SearchKind};
    use std::sync::Arc;

    fn result(query: &str, items: usize) -> SearchResult {
        SearchResult {
            kind: SearchKind::Web,
            query_index: 0,
            query: PlanQuery {
                query: query.to_string(),
                rationale: "Why this query matters to the topic".to_string(),
                source: QuerySource::Web,
                priority: 2,
                expected_insights: vec![],
            },
            items: (0..items)
                .map(|i| SearchItem {
                    source: SearchKind::Web,
                    title: format!("title {}", i),
                    url: format!("https://example.com/{}", i),
                    content: format!("content {}", i),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_summarizes_each_result_in_order() {
        let llm = Arc::new(ScriptedLlm::new().reply("query_summary", testing::summary_json()));
        let summarizer = Summarizer::new(testing::models(llm.clone()));
        let sink = RecordingSink::default();

        let summaries = summarizer
            .summarize(&[result("first query", 2), result("second query", 1)], &sink)
            .await;

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].query, "first query");
        assert!(!summaries[1].degraded);

        let calls = llm.calls_for("query_summary");
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.temperature == Some(0.1)));
        assert!(calls[0].prompt.contains("https://example.com/1"));

        let events = sink.events();
        assert_eq!(sink.ids(), vec!["summary-0", "summary-1"]);
        assert!(events.iter().all(|e| e.status == EventStatus::Completed));
        assert_eq!(events[0].message, "Summary generated");
    }

    #[tokio::test]
    async fn test_failure_uses_fallback_and_continues() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .queue(
                    "query_summary",
                    testing::PRIMARY,
                    Err(LlmError::server_error(502, "bad gateway")),
                )
                .reply("query_summary", testing::summary_json()),
        );
        let summarizer = Summarizer::new(testing::models(llm));
        let sink = RecordingSink::default();

        let summaries = summarizer
            .summarize(&[result("first query", 2), result("second query", 2)], &sink)
            .await;

        assert!(summaries[0].degraded);
        assert_eq!(summaries[0].summary, QuerySummary::fallback());
        assert!(!summaries[1].degraded);

        let events = sink.events();
        assert_ne!(events[0].message, events[1].message);
    }
}
