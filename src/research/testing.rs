//! Test doubles for driving the pipeline without network access.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::events::{ProgressEvent, ProgressSink};
use super::models::ModelProvider;
use super::types::SearchKind;
use crate::config::ModelProfiles;
use crate::llm::{
    ChatMessage, ChatOptions, ChatResponse, LlmClient, LlmError, ResponseFormat,
};
use crate::search::{
    AcademicHit, AcademicSearchOptions, AcademicSearchProvider, AcademicSearchResponse, PostHit,
    PostSearchOptions, PostSearchProvider, PostSearchResponse, SearchError, WebHit,
    WebSearchOptions, WebSearchProvider, WebSearchResponse,
};

pub const PRIMARY: &str = "test/primary";
pub const FALLBACK: &str = "test/fallback";

#[derive(Debug, Clone)]
pub struct LlmCall {
    pub model: String,
    pub schema: String,
    pub temperature: Option<f64>,
    pub prompt: String,
}

type Reply = Result<Value, LlmError>;

/// LLM double that answers by requested schema name.
///
/// Queued replies for a `(schema, model)` pair are used first, then the
/// schema's default reply. Anything unscripted fails with a server error.
#[derive(Default)]
pub struct ScriptedLlm {
    queued: Mutex<HashMap<(String, String), VecDeque<Reply>>>,
    defaults: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<LlmCall>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, schema: &str, value: Value) -> Self {
        self.defaults
            .lock()
            .unwrap()
            .insert(schema.to_string(), Ok(value));
        self
    }

    pub fn fail(self, schema: &str, error: LlmError) -> Self {
        self.defaults
            .lock()
            .unwrap()
            .insert(schema.to_string(), Err(error));
        self
    }

    pub fn queue(self, schema: &str, model: &str, reply: Reply) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry((schema.to_string(), model.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<LlmCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, schema: &str) -> Vec<LlmCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.schema == schema)
            .collect()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let schema = match &options.response_format {
            Some(ResponseFormat::JsonSchema { json_schema }) => json_schema.name.clone(),
            _ => String::new(),
        };
        self.calls.lock().unwrap().push(LlmCall {
            model: model.to_string(),
            schema: schema.clone(),
            temperature: options.temperature,
            prompt: messages.last().map(|m| m.content.clone()).unwrap_or_default(),
        });

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&(schema.clone(), model.to_string()))
            .and_then(|q| q.pop_front());
        let reply = match queued {
            Some(reply) => reply,
            None => self
                .defaults
                .lock()
                .unwrap()
                .get(&schema)
                .cloned()
                .unwrap_or_else(|| Err(LlmError::server_error(500, "no scripted reply"))),
        };

        reply.map(|value| ChatResponse {
            content: Some(value.to_string()),
            finish_reason: Some("stop".to_string()),
            usage: None,
            model: Some(model.to_string()),
        })
    }
}

pub fn models(llm: Arc<ScriptedLlm>) -> ModelProvider {
    ModelProvider::new(
        llm,
        ModelProfiles {
            primary: PRIMARY.to_string(),
            fallback: FALLBACK.to_string(),
        },
    )
}

/// Search double serving `hits` results per call (capped by the request)
/// and failing any query that contains `fail_on`.
#[derive(Default)]
pub struct StubSearch {
    pub hits: usize,
    pub fail_on: Option<String>,
    calls: Mutex<Vec<(SearchKind, String, u32)>>,
    web_options: Mutex<Vec<WebSearchOptions>>,
    academic_options: Mutex<Vec<AcademicSearchOptions>>,
}

impl StubSearch {
    pub fn with_hits(hits: usize) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    pub fn failing_on(hits: usize, query: &str) -> Self {
        Self {
            hits,
            fail_on: Some(query.to_string()),
            ..Self::default()
        }
    }

    /// `(kind, query, requested limit)` per call, in call order.
    pub fn calls(&self) -> Vec<(SearchKind, String, u32)> {
        self.calls.lock().unwrap().clone()
    }

    /// Full options of every web call, in call order.
    pub fn web_options(&self) -> Vec<WebSearchOptions> {
        self.web_options.lock().unwrap().clone()
    }

    /// Full options of every academic call, in call order.
    pub fn academic_options(&self) -> Vec<AcademicSearchOptions> {
        self.academic_options.lock().unwrap().clone()
    }

    fn check(&self, kind: SearchKind, query: &str, limit: u32) -> Result<(), SearchError> {
        self.calls
            .lock()
            .unwrap()
            .push((kind, query.to_string(), limit));
        match &self.fail_on {
            Some(needle) if query.contains(needle.as_str()) => Err(SearchError::Api {
                provider: "stub",
                status: 503,
                body: "provider unavailable".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl WebSearchProvider for StubSearch {
    async fn search(
        &self,
        query: &str,
        options: &WebSearchOptions,
    ) -> Result<WebSearchResponse, SearchError> {
        self.web_options.lock().unwrap().push(options.clone());
        self.check(SearchKind::Web, query, options.max_results)?;
        let results = (0..self.hits)
            .map(|i| WebHit {
                title: format!("{} result {}", query, i),
                url: format!("https://site{}.example/{}", i, i),
                content: format!("Web content {} about {}", i, query),
                published_date: None,
            })
            .collect();
        Ok(WebSearchResponse {
            results,
            answer: None,
        })
    }
}

#[async_trait]
impl AcademicSearchProvider for StubSearch {
    async fn search_contents(
        &self,
        query: &str,
        options: &AcademicSearchOptions,
    ) -> Result<AcademicSearchResponse, SearchError> {
        self.academic_options.lock().unwrap().push(options.clone());
        self.check(SearchKind::Academic, query, options.num_results)?;
        let results = (0..self.hits)
            .map(|i| AcademicHit {
                title: Some(format!("Paper {} on {}", i, query)),
                url: format!("https://arxiv.org/abs/{}", i),
                summary: Some(format!("Abstract {}", i)),
            })
            .collect();
        Ok(AcademicSearchResponse { results })
    }
}

/// Posts alternate between status URLs and profile URLs. Post searches are
/// not recorded in `calls`.
#[async_trait]
impl PostSearchProvider for StubSearch {
    async fn search_posts(
        &self,
        query: &str,
        _options: &PostSearchOptions,
    ) -> Result<PostSearchResponse, SearchError> {
        let results = (0..self.hits)
            .map(|i| PostHit {
                title: Some(format!("Post {} about {}", i, query)),
                url: if i % 2 == 0 {
                    format!("https://x.com/user{}/status/{}", i, 1000 + i)
                } else {
                    format!("https://x.com/user{}", i)
                },
                text: Some(format!("Post text {}", i)),
                highlights: Vec::new(),
                published_date: None,
                author: Some(format!("user{}", i)),
            })
            .collect();
        Ok(PostSearchResponse { results })
    }
}

/// Sink that keeps every event in order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.id).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Five queries (one `both`), priorities 1-5, two analyses.
pub fn plan_json() -> Value {
    let query = |q: &str, source: &str, priority: u8| {
        json!({
            "query": q,
            "rationale": "Needed to cover a core aspect of the topic",
            "source": source,
            "priority": priority,
            "expectedInsights": ["recent results", "open problems"]
        })
    };
    json!({
        "searchQueries": [
            query("quantum error correction milestones 2024", "both", 1),
            query("logical qubit demonstrations", "web", 2),
            query("surface code threshold experiments", "academic", 3),
            query("quantum advantage claims 2024", "web", 4),
            query("quantum hardware roadmap announcements", "web", 5)
        ],
        "requiredAnalyses": [
            {
                "type": "trend",
                "description": "How hardware capability evolved during the year",
                "importance": 5,
                "focusAreas": ["qubit counts", "error rates"]
            },
            {
                "type": "comparative",
                "description": "Compare approaches of the major hardware vendors",
                "importance": 3,
                "focusAreas": ["superconducting", "trapped ion"]
            }
        ]
    })
}

pub fn summary_json() -> Value {
    json!({
        "mainFindings": [{
            "finding": "Logical qubits with below-threshold error rates were demonstrated",
            "confidence": 0.8,
            "supportingSources": ["https://site0.example/0"],
            "potentialBiases": []
        }],
        "contrastingViewpoints": [],
        "informationGaps": ["Long-term stability"],
        "sourceEvaluation": {"credibilityScore": 0.8, "diversityScore": 0.6, "recencyScore": 0.9},
        "metaAnalysis": {
            "relevanceToQuery": 0.9,
            "coverageBreadth": 0.7,
            "keyTakeaways": ["Error correction crossed an important threshold"]
        }
    })
}

pub fn analysis_json() -> Value {
    json!({
        "findings": [{
            "insight": "Error rates fell faster than qubit counts grew",
            "evidence": ["Vendor announcements", "Peer reviewed results"],
            "confidence": 0.7
        }],
        "implications": ["Fault tolerance timelines moved earlier"],
        "limitations": ["Vendor claims are not independently verified"]
    })
}

pub fn final_summary_json() -> Value {
    json!({
        "keyFindings": [
            {"finding": "Below-threshold logical qubits were shown", "importance": 5},
            {"finding": "Hardware roadmaps accelerated", "importance": 4},
            {"finding": "Advantage claims remain contested", "importance": 3}
        ],
        "consensusPoints": ["Error correction is the central scaling problem"],
        "disagreements": ["Timing of useful quantum advantage"],
        "practicalImplications": ["Expect early fault-tolerant prototypes"],
        "plainTextSummary": "In 2024 quantum computing advanced mainly through error correction: \
                             several groups showed logical qubits that outperform their physical \
                             parts, while claims of practical advantage stayed disputed."
    })
}

/// An LLM that answers every stage successfully.
pub fn happy_llm() -> ScriptedLlm {
    ScriptedLlm::new()
        .reply("research_plan", plan_json())
        .reply("query_summary", summary_json())
        .reply("analysis", analysis_json())
        .reply("final_summary", final_summary_json())
}
