//! Read-through caching over the provider client.
//!
//! Every fetch checks the relational cache first and writes the fresh payload
//! back on a miss. A failing cache layer never blocks a request: read and
//! write errors are logged and the call degrades to a direct provider fetch.

pub mod universe;

pub use universe::{Clock, SystemClock, UniverseCache};

use chrono::Duration;
use dashboard_core::{DashboardError, NewsArticle, StockListing, Timeframe};
use dashboard_store::ResponseCache;
use fmp_client::FmpClient;
use serde_json::Value;
use std::future::Future;

/// Default freshness window for provider payloads.
const DEFAULT_TTL_HOURS: i64 = 24;

/// Intraday prices go stale fast; keep them for minutes, not hours.
const INTRADAY_TTL_MINUTES: i64 = 5;

pub struct MarketData {
    client: FmpClient,
    cache: ResponseCache,
}

impl MarketData {
    pub fn new(client: FmpClient, cache: ResponseCache) -> Self {
        Self { client, cache }
    }

    pub fn client(&self) -> &FmpClient {
        &self.client
    }

    async fn cached_fetch<F>(
        &self,
        ticker: &str,
        endpoint: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Value, DashboardError>
    where
        F: Future<Output = Result<Value, DashboardError>>,
    {
        match self.cache.get(ticker, endpoint).await {
            Ok(Some(data)) => return Ok(data),
            Ok(None) => {}
            Err(e) => tracing::warn!("cache read failed for {}:{}: {}", ticker, endpoint, e),
        }

        let data = fetch.await?;

        if let Err(e) = self.cache.put(ticker, endpoint, &data, ttl).await {
            tracing::warn!("cache write failed for {}:{}: {}", ticker, endpoint, e);
        }

        Ok(data)
    }

    fn default_ttl() -> Duration {
        Duration::hours(DEFAULT_TTL_HOURS)
    }

    pub async fn quote(&self, symbol: &str) -> Result<Value, DashboardError> {
        self.cached_fetch(symbol, "quote", Self::default_ttl(), self.client.quote(symbol))
            .await
    }

    pub async fn profile(&self, symbol: &str) -> Result<Value, DashboardError> {
        self.cached_fetch(symbol, "profile", Self::default_ttl(), self.client.profile_raw(symbol))
            .await
    }

    pub async fn ratios(&self, symbol: &str, period: &str, limit: u32) -> Result<Value, DashboardError> {
        let endpoint = format!("ratios:{}:{}", period, limit);
        self.cached_fetch(
            symbol,
            &endpoint,
            Self::default_ttl(),
            self.client.ratios(symbol, period, limit),
        )
        .await
    }

    pub async fn income_statement(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Value, DashboardError> {
        let endpoint = format!("income-statement:{}:{}", period, limit);
        self.cached_fetch(
            symbol,
            &endpoint,
            Self::default_ttl(),
            self.client.income_statement(symbol, period, limit),
        )
        .await
    }

    /// Price history for a chart timeframe. Intraday timeframes come from the
    /// intraday endpoint with a short TTL; the rest from daily history.
    pub async fn price_history(&self, symbol: &str, timeframe: Timeframe) -> Result<Value, DashboardError> {
        if let Some(interval) = timeframe.intraday_interval() {
            let endpoint = format!("intraday:{}", interval);
            self.cached_fetch(
                symbol,
                &endpoint,
                Duration::minutes(INTRADAY_TTL_MINUTES),
                self.client.intraday_prices(symbol, interval),
            )
            .await
        } else {
            let days = timeframe.lookback_days();
            let endpoint = format!("history:{}", days);
            self.cached_fetch(
                symbol,
                &endpoint,
                Self::default_ttl(),
                self.client.historical_prices(symbol, days),
            )
            .await
        }
    }

    pub async fn revenue_segments(&self, symbol: &str) -> Result<Value, DashboardError> {
        self.cached_fetch(
            symbol,
            "revenue-segments",
            Self::default_ttl(),
            self.client.revenue_product_segments(symbol),
        )
        .await
    }

    pub async fn geographic_segments(&self, symbol: &str) -> Result<Value, DashboardError> {
        self.cached_fetch(
            symbol,
            "geographic-segments",
            Self::default_ttl(),
            self.client.revenue_geographic_segments(symbol),
        )
        .await
    }

    pub async fn news_raw(&self, symbol: &str, limit: u32) -> Result<Value, DashboardError> {
        let endpoint = format!("news:{}", limit);
        self.cached_fetch(
            symbol,
            &endpoint,
            Self::default_ttl(),
            self.client.news_raw(symbol, limit),
        )
        .await
    }

    /// Recent news decoded into typed articles.
    pub async fn news(&self, symbol: &str, limit: u32) -> Result<Vec<NewsArticle>, DashboardError> {
        let raw = self.news_raw(symbol, limit).await?;
        serde_json::from_value(raw)
            .map_err(|e| DashboardError::InvalidData(format!("news decode: {}", e)))
    }

    pub async fn transcript(
        &self,
        symbol: &str,
        quarter: Option<u8>,
        year: Option<i32>,
    ) -> Result<Value, DashboardError> {
        let endpoint = format!(
            "transcript:{}:{}",
            quarter.map(|q| q.to_string()).unwrap_or_else(|| "latest".to_string()),
            year.map(|y| y.to_string()).unwrap_or_else(|| "latest".to_string()),
        );
        self.cached_fetch(
            symbol,
            &endpoint,
            Self::default_ttl(),
            self.client.transcript(symbol, quarter, year),
        )
        .await
    }

    /// The full listed-stock universe, uncached here; callers hold it in the
    /// process-lifetime [`UniverseCache`].
    pub async fn stock_list(&self) -> Result<Vec<StockListing>, DashboardError> {
        self.client.stock_list().await
    }
}
