//! Progress events streamed while a research run is in flight.
//!
//! Each event carries a stable `id`. A given id is emitted at most twice,
//! `running` then `completed`, and the terminal event has `overwrite` set so
//! a consumer keyed by id can replace the earlier entry in place.

use serde::Serialize;
use tokio::sync::mpsc;

use super::types::{
    AnalysisFinding, FinalSummary, QuerySummary, ResearchPlan, SearchItem, SearchKind,
};

/// Stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Plan,
    Web,
    Academic,
    Summary,
    Analysis,
    Progress,
}

impl From<SearchKind> for StageKind {
    fn from(kind: SearchKind) -> Self {
        match kind {
            SearchKind::Web => StageKind::Web,
            SearchKind::Academic => StageKind::Academic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Running,
    Completed,
}

/// Stage-specific data attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProgressPayload {
    Plan {
        plan: ResearchPlan,
        #[serde(rename = "totalSteps")]
        total_steps: usize,
    },
    SearchStarted {
        query: String,
    },
    SearchCompleted {
        query: String,
        results: Vec<SearchItem>,
    },
    Summary {
        query: String,
        summary: QuerySummary,
    },
    AnalysisStarted {
        #[serde(rename = "analysisType")]
        analysis_type: String,
    },
    AnalysisCompleted {
        #[serde(rename = "analysisType")]
        analysis_type: String,
        findings: Vec<AnalysisFinding>,
    },
    FinalSummary {
        #[serde(rename = "finalSummary")]
        final_summary: FinalSummary,
    },
    Progress {
        #[serde(rename = "completedSteps")]
        completed_steps: usize,
        #[serde(rename = "totalSteps")]
        total_steps: usize,
        #[serde(rename = "isComplete")]
        is_complete: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StageKind,
    pub status: EventStatus,
    pub title: String,
    pub message: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    #[serde(flatten)]
    pub payload: Option<ProgressPayload>,
    pub overwrite: bool,
}

impl ProgressEvent {
    pub fn running(
        id: impl Into<String>,
        kind: StageKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            status: EventStatus::Running,
            title: title.into(),
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            payload: None,
            overwrite: false,
        }
    }

    pub fn completed(
        id: impl Into<String>,
        kind: StageKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: EventStatus::Completed,
            overwrite: true,
            ..Self::running(id, kind, title, message)
        }
    }

    pub fn with_payload(mut self, payload: ProgressPayload) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Write-only destination for progress events.
///
/// `emit` must not block the pipeline; dropping events when nobody listens
/// is acceptable.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that forwards events over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("progress receiver dropped; event discarded");
        }
    }
}

/// Sink for callers that only want the final outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, event: ProgressEvent) {
        tracing::trace!(id = %event.id, status = ?event.status, "progress");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_event_sets_overwrite() {
        let running = ProgressEvent::running("search-web-0", StageKind::Web, "t", "m");
        let completed = ProgressEvent::completed("search-web-0", StageKind::Web, "t", "m");
        assert!(!running.overwrite);
        assert!(completed.overwrite);
        assert_eq!(completed.status, EventStatus::Completed);
    }

    #[test]
    fn test_event_serializes_flat_payload() {
        let event = ProgressEvent::completed(
            "research-progress",
            StageKind::Progress,
            "Research Progress",
            "Research complete: 7/7 steps finished",
        )
        .with_payload(ProgressPayload::Progress {
            completed_steps: 7,
            total_steps: 7,
            is_complete: true,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["completedSteps"], 7);
        assert_eq!(value["isComplete"], true);
        assert_eq!(value["overwrite"], true);
    }

    #[test]
    fn test_event_without_payload() {
        let event = ProgressEvent::running("research-plan", StageKind::Plan, "Research Plan", "…");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "plan");
        assert!(value.get("plan").is_none());
    }

    #[tokio::test]
    async fn test_channel_sink_survives_dropped_receiver() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.emit(ProgressEvent::running("a", StageKind::Plan, "t", "m"));
        assert_eq!(rx.recv().await.unwrap().id, "a");

        drop(rx);
        sink.emit(ProgressEvent::running("b", StageKind::Plan, "t", "m"));
    }
}
