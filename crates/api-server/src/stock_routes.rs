//! Per-symbol chart and segmentation routes.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use dashboard_core::{PricePoint, StockListing, Timeframe};
use segment_analysis::{SegmentAggregator, SegmentEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ApiError, AppState};

const UNIVERSE_KEY: &str = "all";

#[derive(Deserialize)]
pub struct PriceQuery {
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

fn default_timeframe() -> String {
    "1M".to_string()
}

#[derive(Serialize)]
pub struct PriceSeriesResponse {
    pub symbol: String,
    pub timeframe: &'static str,
    pub points: Vec<PricePoint>,
}

#[derive(Serialize)]
pub struct SegmentResponse {
    pub symbol: String,
    pub segments: Vec<SegmentEntry>,
}

#[derive(Serialize)]
pub struct UniverseResponse {
    pub cached: bool,
    pub count: usize,
    pub listings: Vec<StockListing>,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stock/universe", get(get_universe))
        .route("/api/stock/:symbol/price", get(get_price))
        .route("/api/stock/:symbol/revenue-segments", get(get_revenue_segments))
        .route("/api/stock/:symbol/geographic-segments", get(get_geographic_segments))
}

/// The provider reports bars newest first, daily history under a
/// `historical` key and intraday as a bare array. Charts read oldest first.
fn reshape_price_payload(payload: &Value) -> Vec<PricePoint> {
    let rows = payload
        .get("historical")
        .and_then(Value::as_array)
        .or_else(|| payload.as_array());

    let mut points: Vec<PricePoint> = match rows {
        Some(rows) => rows
            .iter()
            .filter_map(|row| serde_json::from_value(row.clone()).ok())
            .collect(),
        None => Vec::new(),
    };

    points.reverse();
    points
}

async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceSeriesResponse>, ApiError> {
    let symbol = symbol.trim().to_uppercase();
    let timeframe = Timeframe::parse(&query.timeframe).ok_or_else(|| {
        ApiError::BadRequest("timeframe must be one of 1D, 5D, 1M, 3M, 6M, 1Y, 5Y".to_string())
    })?;

    let payload = state.market()?.price_history(&symbol, timeframe).await?;
    let points = reshape_price_payload(&payload);

    Ok(Json(PriceSeriesResponse {
        symbol,
        timeframe: timeframe.as_str(),
        points,
    }))
}

async fn get_revenue_segments(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let symbol = symbol.trim().to_uppercase();
    let payload = state.market()?.revenue_segments(&symbol).await?;
    let segments = SegmentAggregator::new().aggregate(&payload);
    Ok(Json(SegmentResponse { symbol, segments }))
}

async fn get_geographic_segments(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let symbol = symbol.trim().to_uppercase();
    let payload = state.market()?.geographic_segments(&symbol).await?;
    let segments = SegmentAggregator::new().aggregate(&payload);
    Ok(Json(SegmentResponse { symbol, segments }))
}

async fn get_universe(State(state): State<AppState>) -> Result<Json<UniverseResponse>, ApiError> {
    if let Some(listings) = state.universe.get(UNIVERSE_KEY) {
        return Ok(Json(UniverseResponse {
            cached: true,
            count: listings.len(),
            listings,
        }));
    }

    let listings = state.market()?.stock_list().await?;
    state.universe.put(UNIVERSE_KEY, listings.clone());

    Ok(Json(UniverseResponse {
        cached: false,
        count: listings.len(),
        listings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reshape_daily_history() {
        let payload = json!({
            "symbol": "AAPL",
            "historical": [
                { "date": "2024-01-05", "open": 181.9, "high": 182.8, "low": 180.2, "close": 181.2, "volume": 62_000_000.0 },
                { "date": "2024-01-04", "open": 182.1, "high": 183.1, "low": 180.9, "close": 181.9, "volume": 71_000_000.0 }
            ]
        });

        let points = reshape_price_payload(&payload);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, "2024-01-04");
        assert_eq!(points[1].close, 181.2);
    }

    #[test]
    fn test_reshape_intraday_array() {
        let payload = json!([
            { "date": "2024-01-05 15:55:00", "open": 181.0, "high": 181.3, "low": 180.9, "close": 181.2, "volume": 900_000.0 },
            { "date": "2024-01-05 15:50:00", "open": 180.8, "high": 181.1, "low": 180.7, "close": 181.0, "volume": 750_000.0 }
        ]);

        let points = reshape_price_payload(&payload);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, "2024-01-05 15:50:00");
    }

    #[test]
    fn test_reshape_skips_malformed_rows() {
        let payload = json!({
            "historical": [
                { "date": "2024-01-05", "open": 181.9, "high": 182.8, "low": 180.2, "close": 181.2 },
                { "date": "2024-01-04" }
            ]
        });

        let points = reshape_price_payload(&payload);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].volume, None);
    }

    #[test]
    fn test_reshape_unrecognized_shape_is_empty() {
        assert!(reshape_price_payload(&json!({ "message": "no data" })).is_empty());
    }
}
