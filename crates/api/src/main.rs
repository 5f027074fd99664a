use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use extract::{ApiResponse, ExtractError, ExtractRequest, Extractor, OpenAiClient};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod metrics;

use config::AppConfig;
use metrics::{Metrics, MetricsSnapshot, TimedOperation};

#[derive(Clone)]
struct AppState {
    /// `None` while no API key is configured.
    extractor: Option<Arc<Extractor>>,
    metrics: Arc<Metrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    extraction: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("Failed to read configuration")?;

    let extractor = match &config.openai.api_key {
        Some(api_key) => {
            let llm = OpenAiClient::new(
                config.openai.base_url.clone(),
                api_key.clone(),
                config.openai.request_timeout(),
            )?
            .with_sampling(config.openai.temperature, config.openai.max_tokens);
            Some(Arc::new(Extractor::new(Arc::new(llm), config.openai.model)))
        }
        None => {
            warn!("OPENAI_API_KEY is not set, extraction requests will fail");
            None
        }
    };

    let state = AppState {
        extractor,
        metrics: Metrics::new(),
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!(model = %config.openai.model, "Server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    // Preflight requests are answered by the CORS layer.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route("/extract-info", post(extract_info))
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn extract_info(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse>) {
    let request_id = Uuid::new_v4();
    let timer = TimedOperation::start();

    match run_extraction(&state, &body).await {
        Ok(response) => {
            let rows = response.data().map(|d| d.info.len()).unwrap_or(0);
            state.metrics.record_success(timer.elapsed(), rows);
            info!(%request_id, rows, elapsed_ms = timer.elapsed().as_millis() as u64, "Extraction succeeded");
            (StatusCode::OK, Json(response))
        }
        Err(e) => {
            state.metrics.record_failure();
            error!(%request_id, status = e.status_code(), error = %e, "Extraction failed");
            let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ApiResponse::Failure(e.to_string())))
        }
    }
}

async fn run_extraction(state: &AppState, body: &[u8]) -> Result<ApiResponse, ExtractError> {
    let extractor = state.extractor.as_ref().ok_or(ExtractError::MissingApiKey)?;

    let request: ExtractRequest = serde_json::from_slice(body)
        .map_err(|e| ExtractError::Validation(format!("Invalid request body: {}", e)))?;

    let data = extractor.handle(request).await?;
    Ok(ApiResponse::Success(data))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let extraction = if state.extractor.is_some() {
        "ok"
    } else {
        "error: no API key configured"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        extraction: extraction.to_string(),
    })
}

async fn get_stats(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
