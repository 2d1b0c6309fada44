//! Finboard API server.
//!
//! Thin axum layer over the provider client, the response cache, the
//! extraction pipelines, and the peer store. Handlers validate input, pick a
//! component, and return its payload; errors funnel through [`ApiError`] into
//! the `{ "error": ..., "details": ... }` envelope.

pub mod competitor_routes;
pub mod financial_routes;
pub mod kpi_routes;
pub mod sentiment_routes;
pub mod stock_routes;
pub mod waitlist_routes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Duration;
use dashboard_core::DashboardError;
use dashboard_store::{DashboardDb, PeerStore, ResponseCache, Waitlist};
use fmp_client::FmpClient;
use llm_client::{LlmClient, LlmConfig, LlmError};
use market_data::{MarketData, SystemClock, UniverseCache};
use peer_screener::PeerScreener;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// How often expired cache rows are purged.
const CACHE_SWEEP_INTERVAL_SECS: u64 = 3600;

#[derive(Clone)]
pub struct AppState {
    pub market: Option<Arc<MarketData>>,
    pub screener: Option<Arc<PeerScreener>>,
    pub llm: Option<Arc<LlmClient>>,
    pub peers: PeerStore,
    pub waitlist: Waitlist,
    pub universe: Arc<UniverseCache>,
}

impl AppState {
    /// Provider-backed components exist only when FMP_API_KEY is set.
    pub fn market(&self) -> Result<&Arc<MarketData>, ApiError> {
        self.market.as_ref().ok_or(ApiError::MissingApiKey)
    }

    pub fn screener(&self) -> Result<&Arc<PeerScreener>, ApiError> {
        self.screener.as_ref().ok_or(ApiError::MissingApiKey)
    }

    pub fn llm(&self) -> Result<&Arc<LlmClient>, ApiError> {
        self.llm.as_ref().ok_or(ApiError::MissingApiKey)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Upstream request failed")]
    Upstream(#[from] DashboardError),

    #[error("LLM request failed")]
    Llm(#[from] LlmError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            ApiError::MissingApiKey => (StatusCode::INTERNAL_SERVER_ERROR, None),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            ApiError::Upstream(e) => (StatusCode::INTERNAL_SERVER_ERROR, Some(e.to_string())),
            ApiError::Llm(e) => (StatusCode::INTERNAL_SERVER_ERROR, Some(e.to_string())),
            ApiError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, Some(e.to_string())),
        };

        let mut body = serde_json::Map::new();
        body.insert("error".to_string(), self.to_string().into());
        if let Some(details) = details {
            body.insert("details".to_string(), details.into());
        }

        (status, Json(serde_json::Value::Object(body))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(financial_routes::financial_routes())
        .merge(stock_routes::stock_routes())
        .merge(kpi_routes::kpi_routes())
        .merge(competitor_routes::competitor_routes())
        .merge(sentiment_routes::sentiment_routes())
        .merge(waitlist_routes::waitlist_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:finboard.db".to_string());
    let db = DashboardDb::new(&database_url).await?;
    let cache = ResponseCache::new(db.pool().clone());
    let peers = PeerStore::new(db.pool().clone());
    let waitlist = Waitlist::new(db.pool().clone());

    let fmp_key = std::env::var("FMP_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let market = fmp_key
        .clone()
        .map(|key| Arc::new(MarketData::new(FmpClient::new(key), cache.clone())));
    if market.is_none() {
        tracing::warn!("FMP_API_KEY not set; provider-backed routes will return errors");
    }

    let screener = fmp_key
        .map(|key| Arc::new(PeerScreener::new(FmpClient::new(key), peers.clone())));

    let llm = std::env::var("PERPLEXITY_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .map(|key| Arc::new(LlmClient::new(key, LlmConfig::default())));
    if llm.is_none() {
        tracing::warn!("PERPLEXITY_API_KEY not set; LLM-backed routes will return errors");
    }

    let universe = Arc::new(UniverseCache::new(Duration::hours(24), Arc::new(SystemClock)));

    // Expired cache rows are ignored on read; this keeps the table from
    // growing without bound.
    let sweep_cache = cache.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(CACHE_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match sweep_cache.sweep_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!("swept {} expired cache rows", removed),
                Err(e) => tracing::warn!("cache sweep failed: {}", e),
            }
        }
    });

    let state = AppState {
        market,
        screener,
        llm,
        peers,
        waitlist,
        universe,
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on port {}", port);
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
