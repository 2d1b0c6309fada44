//! Peer/competitor routes: manual CRUD, batch screening, LLM regeneration.

use axum::{
    extract::{Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use dashboard_store::PeerRecord;
use peer_screener::{BatchOutcome, ScreenOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::financial_routes::require_symbol;
use crate::{ApiError, AppState};

/// Symbols screened concurrently per batch chunk.
const DEFAULT_BATCH_SIZE: usize = 5;

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Deserialize)]
pub struct ManageQuery {
    pub symbol: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPeersRequest {
    pub symbol: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub peers: Vec<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub symbols: Vec<String>,
    pub batch_size: Option<usize>,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub symbol: Option<String>,
}

#[derive(Serialize)]
pub struct PeerListResponse {
    pub total: i64,
    pub records: Vec<PeerRecord>,
}

pub fn competitor_routes() -> Router<AppState> {
    Router::new()
        .route("/api/competitors/manage", get(get_peers))
        .route("/api/competitors/manage", post(upsert_peers))
        .route("/api/competitors/manage", delete(delete_peers))
        .route("/api/competitors/batch", post(screen_batch))
        .route("/api/competitors/generate", post(generate_with_llm))
}

async fn get_peers(
    State(state): State<AppState>,
    Query(query): Query<ManageQuery>,
) -> Result<Json<Value>, ApiError> {
    if query.symbol.is_some() {
        let symbol = require_symbol(&query.symbol)?;
        let record = state
            .peers
            .get(&symbol)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no peers stored for {}", symbol)))?;
        return Ok(Json(serde_json::to_value(record).map_err(anyhow::Error::from)?));
    }

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);
    let records = state.peers.search(query.search.as_deref(), limit, offset).await?;
    let total = state.peers.count().await?;

    Ok(Json(
        serde_json::to_value(PeerListResponse { total, records }).map_err(anyhow::Error::from)?,
    ))
}

async fn upsert_peers(
    State(state): State<AppState>,
    Json(request): Json<UpsertPeersRequest>,
) -> Result<Json<PeerRecord>, ApiError> {
    let symbol = require_symbol(&request.symbol)?;

    let saved = state
        .peers
        .upsert(&PeerRecord {
            symbol,
            name: request.name,
            peers: request.peers,
            sector: request.sector,
            industry: request.industry,
            updated_at: Utc::now(),
        })
        .await?;

    Ok(Json(saved))
}

async fn delete_peers(
    State(state): State<AppState>,
    Query(query): Query<ManageQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = require_symbol(&query.symbol)?;

    if state.peers.delete(&symbol).await? {
        Ok(Json(json!({ "deleted": symbol })))
    } else {
        Err(ApiError::NotFound(format!("no peers stored for {}", symbol)))
    }
}

async fn screen_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchOutcome>, ApiError> {
    if request.symbols.is_empty() {
        return Err(ApiError::BadRequest("symbols is required".to_string()));
    }

    let batch_size = request.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).clamp(1, 20);
    let outcome = state.screener()?.screen_batch(&request.symbols, batch_size).await;

    Ok(Json(outcome))
}

async fn generate_with_llm(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<ScreenOutcome>, ApiError> {
    let symbol = require_symbol(&request.symbol)?;
    let llm = state.llm()?.clone();
    let outcome = state.screener()?.regenerate_with_llm(&llm, &symbol).await?;
    Ok(Json(outcome))
}
