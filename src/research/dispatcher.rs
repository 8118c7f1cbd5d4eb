//! Search step derivation and sequential execution.

use std::sync::Arc;

use super::error::ResearchError;
use super::events::{ProgressEvent, ProgressPayload, ProgressSink};
use super::types::{PlanQuery, QuerySource, ResearchPlan, SearchItem, SearchKind, SearchResult, SearchStep};
use crate::search::{
    AcademicSearchOptions, AcademicSearchProvider, SearchDepth, WebSearchOptions,
    WebSearchProvider,
};

const WEB_RESULT_CAP: u32 = 10;
const ACADEMIC_RESULT_CAP: u32 = 5;

/// Expand plan queries into search steps, in plan order.
///
/// A `both` query yields a web step followed by an academic step.
pub fn derive_steps(plan: &ResearchPlan) -> Vec<SearchStep<'_>> {
    plan.search_queries
        .iter()
        .enumerate()
        .flat_map(|(index, query)| {
            let kinds: &[SearchKind] = match query.source {
                QuerySource::Web => &[SearchKind::Web],
                QuerySource::Academic => &[SearchKind::Academic],
                QuerySource::Both => &[SearchKind::Web, SearchKind::Academic],
            };
            kinds.iter().map(move |&kind| SearchStep {
                id: format!("search-{}-{}", kind, index),
                kind,
                query_index: index,
                query,
            })
        })
        .collect()
}

/// `clamp(6 - priority, 1, upper)`; higher priority (lower number) fetches more.
pub fn result_cap(kind: SearchKind, priority: u8) -> u32 {
    let upper = match kind {
        SearchKind::Web => WEB_RESULT_CAP,
        SearchKind::Academic => ACADEMIC_RESULT_CAP,
    };
    (6 - i64::from(priority)).clamp(1, i64::from(upper)) as u32
}

fn running_title(step: &SearchStep<'_>) -> String {
    match step.kind {
        SearchKind::Web => format!("Searching the web for \"{}\"", step.query.query),
        SearchKind::Academic => format!("Searching academic papers for \"{}\"", step.query.query),
    }
}

fn completed_title(step: &SearchStep<'_>) -> String {
    match step.kind {
        SearchKind::Web => format!("Searched the web for \"{}\"", step.query.query),
        SearchKind::Academic => format!("Searched academic papers for \"{}\"", step.query.query),
    }
}

fn source_label(query: &PlanQuery) -> &'static str {
    match query.source {
        QuerySource::Web => "web",
        QuerySource::Academic => "academic",
        QuerySource::Both => "both",
    }
}

pub struct SearchDispatcher {
    web: Arc<dyn WebSearchProvider>,
    academic: Arc<dyn AcademicSearchProvider>,
}

impl SearchDispatcher {
    pub fn new(web: Arc<dyn WebSearchProvider>, academic: Arc<dyn AcademicSearchProvider>) -> Self {
        Self { web, academic }
    }

    /// Run every step one at a time. The first provider error aborts.
    ///
    /// `on_step_done` is called after each step's completed event.
    pub async fn run_steps(
        &self,
        steps: &[SearchStep<'_>],
        depth: SearchDepth,
        sink: &dyn ProgressSink,
        mut on_step_done: impl FnMut(),
    ) -> Result<Vec<SearchResult>, ResearchError> {
        let mut results = Vec::with_capacity(steps.len());

        for step in steps {
            sink.emit(
                ProgressEvent::running(
                    step.id.clone(),
                    step.kind.into(),
                    running_title(step),
                    format!("Searching {} sources...", source_label(step.query)),
                )
                .with_payload(ProgressPayload::SearchStarted {
                    query: step.query.query.clone(),
                }),
            );

            let items = self.run_step(step, depth).await.map_err(|source| {
                tracing::error!(step = %step.id, "Search step failed: {}", source);
                ResearchError::Search {
                    step_id: step.id.clone(),
                    source,
                }
            })?;

            tracing::info!(step = %step.id, results = items.len(), "Search step complete");

            sink.emit(
                ProgressEvent::completed(
                    step.id.clone(),
                    step.kind.into(),
                    completed_title(step),
                    format!("Found {} results", items.len()),
                )
                .with_payload(ProgressPayload::SearchCompleted {
                    query: step.query.query.clone(),
                    results: items.clone(),
                }),
            );

            results.push(SearchResult {
                kind: step.kind,
                query_index: step.query_index,
                query: step.query.clone(),
                items,
            });
            on_step_done();
        }

        Ok(results)
    }

    async fn run_step(
        &self,
        step: &SearchStep<'_>,
        depth: SearchDepth,
    ) -> Result<Vec<SearchItem>, crate::search::SearchError> {
        let cap = result_cap(step.kind, step.query.priority);

        let mut items: Vec<SearchItem> = match step.kind {
            SearchKind::Web => {
                let options = WebSearchOptions {
                    depth,
                    max_results: cap,
                    include_answer: true,
                    ..WebSearchOptions::default()
                };
                self.web
                    .search(&step.query.query, &options)
                    .await?
                    .results
                    .into_iter()
                    .map(|hit| SearchItem {
                        source: SearchKind::Web,
                        title: hit.title,
                        url: hit.url,
                        content: hit.content,
                    })
                    .collect()
            }
            SearchKind::Academic => {
                let options = AcademicSearchOptions::research_papers(cap);
                self.academic
                    .search_contents(&step.query.query, &options)
                    .await?
                    .results
                    .into_iter()
                    .map(|hit| SearchItem {
                        source: SearchKind::Academic,
                        title: hit.title.unwrap_or_default(),
                        url: hit.url,
                        content: hit.summary.unwrap_or_default(),
                    })
                    .collect()
            }
        };

        // Providers treat the limit as a hint.
        items.truncate(cap as usize);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::events::{EventStatus, StageKind};
    use crate::research::testing::{self, RecordingSink, StubSearch};
    use crate::search::{SearchTopic, SummaryRequest};

    fn plan() -> ResearchPlan {
        serde_json::from_value(testing::plan_json()).unwrap()
    }

    #[test]
    fn test_both_yields_web_then_academic() {
        let plan = plan();
        let steps = derive_steps(&plan);

        let ids: Vec<_> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "search-web-0",
                "search-academic-0",
                "search-web-1",
                "search-academic-2",
                "search-web-3",
                "search-web-4",
            ]
        );
        for (i, query) in plan.search_queries.iter().enumerate() {
            let count = steps.iter().filter(|s| s.query_index == i).count();
            let expected = if query.source == QuerySource::Both { 2 } else { 1 };
            assert_eq!(count, expected);
        }
    }

    #[test]
    fn test_result_caps() {
        assert_eq!(result_cap(SearchKind::Web, 1), 5);
        assert_eq!(result_cap(SearchKind::Web, 5), 1);
        assert_eq!(result_cap(SearchKind::Web, 0), 6);
        assert_eq!(result_cap(SearchKind::Web, 9), 1);
        assert_eq!(result_cap(SearchKind::Academic, 0), 5);
        assert_eq!(result_cap(SearchKind::Academic, 3), 3);
    }

    #[tokio::test]
    async fn test_runs_steps_in_order_and_caps_results() {
        let plan = plan();
        let steps = derive_steps(&plan);
        let search = Arc::new(StubSearch::with_hits(8));
        let dispatcher = SearchDispatcher::new(search.clone(), search.clone());
        let sink = RecordingSink::default();
        let mut done = 0;

        let results = dispatcher
            .run_steps(&steps, SearchDepth::Advanced, &sink, || done += 1)
            .await
            .unwrap();

        assert_eq!(done, 6);
        assert_eq!(results.len(), 6);
        for (step, result) in steps.iter().zip(&results) {
            assert_eq!(result.kind, step.kind);
            assert!(result.items.len() as u32 <= result_cap(step.kind, step.query.priority));
            assert!(result.items.iter().all(|item| item.source == step.kind));
        }

        let calls = search.calls();
        assert_eq!(calls[0], (SearchKind::Web, plan.search_queries[0].query.clone(), 5));
        assert_eq!(calls[1], (SearchKind::Academic, plan.search_queries[0].query.clone(), 5));

        let web_options = search.web_options();
        assert_eq!(web_options.len(), 4);
        assert!(web_options.iter().all(|o| o.depth == SearchDepth::Advanced));
        assert!(web_options.iter().all(|o| o.include_answer));
        assert!(web_options.iter().all(|o| o.topic == SearchTopic::General));
        assert!(web_options.iter().all(|o| o.exclude_domains.is_empty()));
        assert_eq!(
            search.academic_options(),
            vec![
                AcademicSearchOptions {
                    num_results: 5,
                    category: "research paper".to_string(),
                    summary: SummaryRequest::Default,
                },
                AcademicSearchOptions {
                    num_results: 3,
                    category: "research paper".to_string(),
                    summary: SummaryRequest::Default,
                },
            ]
        );

        let events = sink.events();
        assert_eq!(events.len(), 12);
        assert_eq!(events[0].status, EventStatus::Running);
        assert_eq!(events[0].message, "Searching both sources...");
        assert_eq!(events[1].id, "search-web-0");
        assert_eq!(events[1].message, "Found 5 results");
        assert!(events[1].overwrite);
        assert_eq!(events[2].kind, StageKind::Academic);
    }

    #[tokio::test]
    async fn test_provider_error_aborts_after_running_event() {
        let plan = plan();
        let steps = derive_steps(&plan);
        let search = Arc::new(StubSearch::failing_on(3, "logical qubit"));
        let dispatcher = SearchDispatcher::new(search.clone(), search.clone());
        let sink = RecordingSink::default();

        let err = dispatcher
            .run_steps(&steps, SearchDepth::Basic, &sink, || {})
            .await
            .unwrap_err();

        match err {
            ResearchError::Search { step_id, .. } => assert_eq!(step_id, "search-web-1"),
            other => panic!("unexpected error: {}", other),
        }
        let events = sink.events();
        let last = events.last().unwrap();
        assert_eq!(last.id, "search-web-1");
        assert_eq!(last.status, EventStatus::Running);
        assert_eq!(search.calls().len(), 3);
    }
}
