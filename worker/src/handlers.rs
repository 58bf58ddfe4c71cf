use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::{
    object_url, store, wordcount, ErrorResponse, HealthResponse, MapResponse, ReduceQuery,
    ReduceResponse, StoreError, WorkerStats, FINAL_OUTPUT_KEY,
};
use serde::Deserialize;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

pub fn build_mapper_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/map", get(map_chunk))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn build_reducer_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/reduce", get(reduce_outputs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- errores HTTP ---------------- */

/// Cualquier error se devuelve como `{"error": "..."}` con su status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

async fn stats(State(state): State<AppState>) -> Json<WorkerStats> {
    Json(state.stats())
}

// Todos opcionales: si falta alguno respondemos 400 con nuestro formato de error
#[derive(Debug, Deserialize)]
struct MapParams {
    bucket: Option<String>,
    key: Option<String>,
    output_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReduceParams {
    bucket: Option<String>,
    keys: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// Lee un chunk, cuenta palabras y deja el conteo parcial en output_key
async fn map_chunk(
    State(state): State<AppState>,
    Query(params): Query<MapParams>,
) -> Result<Json<MapResponse>, ApiError> {
    state.metrics.started();
    let result = run_map(&state, params).await;
    state.metrics.finished(result.is_ok());
    result.map(Json)
}

async fn run_map(state: &AppState, params: MapParams) -> Result<MapResponse, ApiError> {
    let (Some(bucket), Some(key), Some(output_key)) = (
        required(params.bucket),
        required(params.key),
        required(params.output_key),
    ) else {
        return Err(ApiError::bad_request(
            "bucket, key, and output_key query params required",
        ));
    };

    let started = Instant::now();

    // 1) Bajar el chunk
    let bytes = state.store.get(&bucket, &key).await.map_err(|e| {
        warn!("no pude leer {}/{}: {}", bucket, key, e);
        ApiError::internal(format!("failed to get object: {e}"))
    })?;
    let text = String::from_utf8_lossy(&bytes);

    // 2) Contar
    let counts = wordcount::count_words(&text);
    let total_words = wordcount::raw_token_count(&text) as u64;

    // 3) Subir el conteo parcial
    store::put_json(state.store.as_ref(), &bucket, &output_key, &counts)
        .await
        .map_err(|e| ApiError::internal(format!("failed to upload results: {e}")))?;

    info!(
        "map {} -> {} ({} palabras, {} únicas) en {:?}",
        key,
        output_key,
        total_words,
        counts.len(),
        started.elapsed()
    );

    Ok(MapResponse {
        message: "map complete".to_string(),
        output: object_url(&bucket, &output_key),
        unique_words: counts.len() as u64,
        total_words,
    })
}

// Suma todos los conteos parciales y escribe el conteo final
async fn reduce_outputs(
    State(state): State<AppState>,
    Query(params): Query<ReduceParams>,
) -> Result<Json<ReduceResponse>, ApiError> {
    state.metrics.started();
    let result = run_reduce(&state, params).await;
    state.metrics.finished(result.is_ok());
    result.map(Json)
}

async fn run_reduce(state: &AppState, params: ReduceParams) -> Result<ReduceResponse, ApiError> {
    let (Some(bucket), Some(keys)) = (required(params.bucket), required(params.keys)) else {
        return Err(ApiError::bad_request("bucket and keys query params required"));
    };

    let query = ReduceQuery { bucket, keys };
    let keys = query.key_list();
    if keys.is_empty() {
        return Err(ApiError::bad_request("bucket and keys query params required"));
    }

    let started = Instant::now();
    let mut final_counts = wordcount::WordCounts::new();

    for key in &keys {
        let partial: wordcount::WordCounts = store::get_json(state.store.as_ref(), &query.bucket, key)
            .await
            .map_err(|e| match e {
                StoreError::Io { .. } => ApiError::internal(format!("failed to parse {key}: {e}")),
                other => ApiError::internal(format!("failed to get {key}: {other}")),
            })?;
        wordcount::merge_counts(&mut final_counts, partial);
    }

    store::put_json(state.store.as_ref(), &query.bucket, FINAL_OUTPUT_KEY, &final_counts)
        .await
        .map_err(|e| ApiError::internal(format!("failed to upload final results: {e}")))?;

    info!(
        "reduce de {} parciales -> {} ({} únicas) en {:?}",
        keys.len(),
        FINAL_OUTPUT_KEY,
        final_counts.len(),
        started.elapsed()
    );

    Ok(ReduceResponse {
        message: "reduce complete".to_string(),
        output: object_url(&query.bucket, FINAL_OUTPUT_KEY),
        unique_words: final_counts.len() as u64,
        mappers_processed: keys.len() as u64,
    })
}
