//! Provider proxy routes.
//!
//! Each handler resolves through the read-through cache and returns the
//! provider payload verbatim.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{ApiError, AppState};

#[derive(Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

#[derive(Deserialize)]
pub struct StatementQuery {
    pub symbol: Option<String>,
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_statement_limit")]
    pub limit: u32,
}

fn default_period() -> String {
    "annual".to_string()
}

fn default_statement_limit() -> u32 {
    20
}

#[derive(Deserialize)]
pub struct NewsQuery {
    pub symbol: Option<String>,
    #[serde(default = "default_news_limit")]
    pub limit: u32,
}

fn default_news_limit() -> u32 {
    20
}

#[derive(Deserialize)]
pub struct TranscriptQuery {
    pub symbol: Option<String>,
    pub quarter: Option<u8>,
    pub year: Option<i32>,
}

pub fn financial_routes() -> Router<AppState> {
    Router::new()
        .route("/api/financial/quote", get(get_quote))
        .route("/api/financial/profile", get(get_profile))
        .route("/api/financial/ratios", get(get_ratios))
        .route("/api/financial/income-statement", get(get_income_statement))
        .route("/api/financial/news", get(get_news))
        .route("/api/financial/transcript", get(get_transcript))
}

pub(crate) fn require_symbol(symbol: &Option<String>) -> Result<String, ApiError> {
    match symbol.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_uppercase()),
        _ => Err(ApiError::BadRequest("symbol is required".to_string())),
    }
}

fn validate_period(period: &str) -> Result<(), ApiError> {
    match period {
        "annual" | "quarter" => Ok(()),
        _ => Err(ApiError::BadRequest(
            "period must be annual or quarter".to_string(),
        )),
    }
}

async fn get_quote(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = require_symbol(&query.symbol)?;
    Ok(Json(state.market()?.quote(&symbol).await?))
}

async fn get_profile(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = require_symbol(&query.symbol)?;
    Ok(Json(state.market()?.profile(&symbol).await?))
}

async fn get_ratios(
    State(state): State<AppState>,
    Query(query): Query<StatementQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = require_symbol(&query.symbol)?;
    validate_period(&query.period)?;
    Ok(Json(
        state
            .market()?
            .ratios(&symbol, &query.period, query.limit)
            .await?,
    ))
}

async fn get_income_statement(
    State(state): State<AppState>,
    Query(query): Query<StatementQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = require_symbol(&query.symbol)?;
    validate_period(&query.period)?;
    Ok(Json(
        state
            .market()?
            .income_statement(&symbol, &query.period, query.limit)
            .await?,
    ))
}

async fn get_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = require_symbol(&query.symbol)?;
    Ok(Json(state.market()?.news_raw(&symbol, query.limit).await?))
}

async fn get_transcript(
    State(state): State<AppState>,
    Query(query): Query<TranscriptQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = require_symbol(&query.symbol)?;
    Ok(Json(
        state
            .market()?
            .transcript(&symbol, query.quarter, query.year)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_symbol_normalizes() {
        assert_eq!(require_symbol(&Some(" aapl ".to_string())).unwrap(), "AAPL");
        assert!(require_symbol(&Some("  ".to_string())).is_err());
        assert!(require_symbol(&None).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(validate_period("annual").is_ok());
        assert!(validate_period("quarter").is_ok());
        assert!(validate_period("weekly").is_err());
    }
}
