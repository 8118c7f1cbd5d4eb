//! HTTP route handlers.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::llm::OpenRouterClient;
use crate::research::{
    ChannelSink, ModelProvider, NoopSink, ResearchError, ResearchOutcome, ResearchPipeline,
};
use crate::search::tools::{
    academic_search, retrieve, web_search, x_search, AcademicSearchToolResponse,
    RetrieveResponse, WebSearchRequest, WebSearchToolResponse, XPost, XSearchRequest,
};
use crate::search::{
    AcademicSearchProvider, ContentScraper, ExaClient, FirecrawlClient, PostSearchProvider,
    SearchError, TavilyClient, WebSearchProvider,
};

use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<ResearchPipeline>,
    pub web: Arc<dyn WebSearchProvider>,
    pub academic: Arc<dyn AcademicSearchProvider>,
    pub posts: Arc<dyn PostSearchProvider>,
    /// `None` when no Firecrawl key is configured.
    pub scraper: Option<Arc<dyn ContentScraper>>,
}

impl AppState {
    /// Wire the production clients from configuration.
    pub fn from_config(config: Config) -> Self {
        let llm = Arc::new(OpenRouterClient::new(config.api_key.clone()));
        let models = ModelProvider::new(llm, config.models.clone());
        let web: Arc<dyn WebSearchProvider> =
            Arc::new(TavilyClient::new(config.tavily_api_key.clone()));
        let exa = Arc::new(ExaClient::new(config.exa_api_key.clone()));
        let academic: Arc<dyn AcademicSearchProvider> = exa.clone();
        let posts: Arc<dyn PostSearchProvider> = exa;
        let scraper = config.firecrawl_api_key.clone().map(|key| {
            Arc::new(FirecrawlClient::new(key)) as Arc<dyn ContentScraper>
        });
        if scraper.is_none() {
            tracing::warn!("FIRECRAWL_API_KEY not set, /api/retrieve is disabled");
        }

        Self {
            pipeline: Arc::new(ResearchPipeline::new(
                models,
                Arc::clone(&web),
                Arc::clone(&academic),
            )),
            web,
            academic,
            posts,
            scraper,
            config,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/research", post(research))
        .route("/api/research/stream", post(research_stream))
        .route("/api/search", post(search))
        .route("/api/academic", post(academic))
        .route("/api/x-search", post(x_posts))
        .route("/api/retrieve", post(retrieve_page))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn research_error_status(error: &ResearchError) -> StatusCode {
    match error {
        ResearchError::PlanGeneration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        ResearchError::InvalidPlan { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ResearchError::Search { .. } => StatusCode::BAD_GATEWAY,
        ResearchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn search_error_response(error: SearchError) -> (StatusCode, String) {
    tracing::error!("Search failed: {}", error);
    (StatusCode::BAD_GATEWAY, error.to_string())
}

fn require_topic(topic: &str) -> Result<(), (StatusCode, String)> {
    if topic.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "topic must not be empty".to_string()));
    }
    Ok(())
}

/// Run the pipeline to completion and return the outcome.
async fn research(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResearchRequest>,
) -> Result<Json<ResearchOutcome>, (StatusCode, String)> {
    require_topic(&req.topic)?;
    let limit = state.config.research_timeout;

    let result = match tokio::time::timeout(
        limit,
        state.pipeline.run(&req.topic, req.depth, &NoopSink),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(ResearchError::Timeout(limit)),
    };

    result.map(Json).map_err(|e| {
        tracing::error!(code = e.code(), "Research failed: {}", e);
        (research_error_status(&e), e.to_string())
    })
}

fn sse_event(name: &str, data: &impl Serialize) -> Option<Event> {
    match Event::default().event(name).json_data(data) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Failed to encode {} event: {}", name, e);
            None
        }
    }
}

/// Run the pipeline and stream its progress events via SSE.
///
/// Emits one `research_update` per progress event, then either `done` with
/// the outcome or `error`.
async fn research_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResearchRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    require_topic(&req.topic)?;

    let (sink, mut rx) = ChannelSink::channel();
    let (done_tx, done_rx) = oneshot::channel();
    let pipeline = Arc::clone(&state.pipeline);
    let limit = state.config.research_timeout;

    tokio::spawn(async move {
        let result = match tokio::time::timeout(limit, pipeline.run(&req.topic, req.depth, &sink))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ResearchError::Timeout(limit)),
        };
        // The sink drops here, which ends the event stream before the result is read.
        drop(sink);
        let _ = done_tx.send(result);
    });

    let stream = async_stream::stream! {
        while let Some(update) = rx.recv().await {
            if let Some(event) = sse_event("research_update", &update) {
                yield Ok(event);
            }
        }

        let terminal = match done_rx.await {
            Ok(Ok(outcome)) => sse_event("done", &outcome),
            Ok(Err(e)) => {
                tracing::error!(code = e.code(), "Research failed: {}", e);
                sse_event("error", &StreamError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => sse_event("error", &StreamError {
                code: "internal".to_string(),
                message: "research task ended unexpectedly".to_string(),
            }),
        };
        if let Some(event) = terminal {
            yield Ok(event);
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

/// Standalone multi-query web search.
async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WebSearchRequest>,
) -> Result<Json<WebSearchToolResponse>, (StatusCode, String)> {
    if req.queries.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "queries must not be empty".to_string()));
    }
    web_search(state.web.as_ref(), &req)
        .await
        .map(Json)
        .map_err(search_error_response)
}

/// Standalone academic paper search.
async fn academic(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AcademicSearchRequest>,
) -> Result<Json<AcademicSearchToolResponse>, (StatusCode, String)> {
    if req.query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }
    academic_search(state.academic.as_ref(), &req.query)
        .await
        .map(Json)
        .map_err(search_error_response)
}

/// Standalone X post search.
async fn x_posts(
    State(state): State<Arc<AppState>>,
    Json(req): Json<XSearchRequest>,
) -> Result<Json<Vec<XPost>>, (StatusCode, String)> {
    if req.query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }
    x_search(state.posts.as_ref(), &req)
        .await
        .map(Json)
        .map_err(search_error_response)
}

/// Scrape one page. Scrape failures come back as `{"error": ...}` with 200.
async fn retrieve_page(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, (StatusCode, String)> {
    let Some(scraper) = state.scraper.as_ref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "retrieve is not configured: FIRECRAWL_API_KEY is not set".to_string(),
        ));
    };
    if let Err(e) = url::Url::parse(&req.url) {
        return Err((StatusCode::BAD_REQUEST, format!("invalid url: {}", e)));
    }
    Ok(Json(retrieve(scraper.as_ref(), &req.url).await))
}
