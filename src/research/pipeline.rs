//! Research run orchestration.
//!
//! Stages run strictly in sequence and each stage's output is complete
//! before the next one starts. Plan generation, plan validation and search
//! failures end the run; the later stages substitute placeholders instead.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::analyzer::Analyzer;
use super::dispatcher::{derive_steps, SearchDispatcher};
use super::error::ResearchError;
use super::events::{ProgressEvent, ProgressPayload, ProgressSink, StageKind};
use super::models::ModelProvider;
use super::planner::PlanGenerator;
use super::summarizer::Summarizer;
use super::synthesizer::Synthesizer;
use super::types::ResearchOutcome;
use super::validator;
use crate::search::{AcademicSearchProvider, SearchDepth, WebSearchProvider};

const PLAN_EVENT_ID: &str = "research-plan";
const PROGRESS_EVENT_ID: &str = "research-progress";

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Planning,
    Validating,
    Searching,
    Summarizing,
    Analyzing,
    Synthesizing,
    Done,
    /// Plan generation or validation failed.
    Failed,
    /// A search provider failed or the run timed out.
    Aborted,
}

impl PipelineState {
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Planning, Validating)
                | (Validating, Searching)
                | (Searching, Summarizing)
                | (Summarizing, Analyzing)
                | (Analyzing, Synthesizing)
                | (Synthesizing, Done)
                | (Planning, Failed)
                | (Validating, Failed)
                | (Searching, Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::Failed | PipelineState::Aborted
        )
    }
}

/// Single-writer run accumulator.
#[derive(Debug)]
struct RunTracker {
    state: PipelineState,
    completed_steps: usize,
    total_steps: usize,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            state: PipelineState::Planning,
            completed_steps: 0,
            total_steps: 0,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!("Research state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: ResearchError) -> ResearchError {
        let next = error.terminal_state();
        self.transition(next);
        error
    }
}

pub struct ResearchPipeline {
    planner: PlanGenerator,
    dispatcher: SearchDispatcher,
    summarizer: Summarizer,
    analyzer: Analyzer,
    synthesizer: Synthesizer,
}

impl ResearchPipeline {
    pub fn new(
        models: ModelProvider,
        web: Arc<dyn WebSearchProvider>,
        academic: Arc<dyn AcademicSearchProvider>,
    ) -> Self {
        Self {
            planner: PlanGenerator::new(models.clone()),
            dispatcher: SearchDispatcher::new(web, academic),
            summarizer: Summarizer::new(models.clone()),
            analyzer: Analyzer::new(models.clone()),
            synthesizer: Synthesizer::new(models),
        }
    }

    /// Run the whole pipeline for `topic`, reporting progress to `sink`.
    pub async fn run(
        &self,
        topic: &str,
        depth: SearchDepth,
        sink: &dyn ProgressSink,
    ) -> Result<ResearchOutcome, ResearchError> {
        let span = tracing::info_span!("research", run_id = %Uuid::new_v4(), depth = ?depth);
        self.run_inner(topic, depth, sink).instrument(span).await
    }

    async fn run_inner(
        &self,
        topic: &str,
        depth: SearchDepth,
        sink: &dyn ProgressSink,
    ) -> Result<ResearchOutcome, ResearchError> {
        let mut tracker = RunTracker::new();
        tracing::info!(topic, "Starting research");

        sink.emit(ProgressEvent::running(
            PLAN_EVENT_ID,
            StageKind::Plan,
            "Research Plan",
            "Creating research plan...",
        ));

        let plan = match self.planner.generate(topic).await {
            Ok(plan) => plan,
            Err(e) => return Err(tracker.fail(e)),
        };

        tracker.transition(PipelineState::Validating);
        let validation = validator::validate(&plan);
        for warning in &validation.warnings {
            tracing::warn!("Plan warning: {}", warning);
        }
        if !validation.is_valid {
            tracing::error!(errors = ?validation.errors, "Plan failed validation");
            return Err(tracker.fail(ResearchError::InvalidPlan {
                errors: validation.errors,
            }));
        }

        let steps = derive_steps(&plan);
        tracker.total_steps = steps.len() + plan.required_analyses.len();

        sink.emit(
            ProgressEvent::completed(
                PLAN_EVENT_ID,
                StageKind::Plan,
                "Research Plan",
                "Research plan created",
            )
            .with_payload(ProgressPayload::Plan {
                plan: plan.clone(),
                total_steps: tracker.total_steps,
            }),
        );
        tracing::info!(
            queries = plan.search_queries.len(),
            steps = steps.len(),
            analyses = plan.required_analyses.len(),
            "Research plan ready"
        );

        tracker.transition(PipelineState::Searching);
        let searched = self
            .dispatcher
            .run_steps(&steps, depth, sink, || tracker.completed_steps += 1)
            .await;
        let results = match searched {
            Ok(results) => results,
            Err(e) => return Err(tracker.fail(e)),
        };

        tracker.transition(PipelineState::Summarizing);
        let summaries = self.summarizer.summarize(&results, sink).await;

        tracker.transition(PipelineState::Analyzing);
        let analyses = self
            .analyzer
            .analyze(&plan.required_analyses, &summaries, sink, || {
                tracker.completed_steps += 1
            })
            .await;

        tracker.transition(PipelineState::Synthesizing);
        let (final_summary, final_summary_degraded) = self
            .synthesizer
            .synthesize(topic, &summaries, &analyses, sink)
            .await;

        tracker.transition(PipelineState::Done);
        sink.emit(
            ProgressEvent::completed(
                PROGRESS_EVENT_ID,
                StageKind::Progress,
                "Research Progress",
                format!(
                    "Research complete: {}/{} steps finished",
                    tracker.completed_steps, tracker.total_steps
                ),
            )
            .with_payload(ProgressPayload::Progress {
                completed_steps: tracker.completed_steps,
                total_steps: tracker.total_steps,
                is_complete: true,
            }),
        );

        drop(steps);
        let outcome = ResearchOutcome {
            topic: topic.to_string(),
            depth,
            plan,
            results,
            summaries,
            analyses,
            final_summary,
            final_summary_degraded,
            completed_steps: tracker.completed_steps,
            total_steps: tracker.total_steps,
        };
        tracing::info!(
            completed = outcome.completed_steps,
            total = outcome.total_steps,
            degraded = outcome.degraded_count(),
            "Research complete"
        );

        Ok(outcome)
    }
}
