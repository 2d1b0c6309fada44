use dashboard_core::{
    CompanyProfile, DashboardError, NewsArticle, ScreenerEntry, StockListing,
};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const BASE_URL: &str = "https://financialmodelingprep.com/api";

/// Transcripts can be multi-megabyte documents; everything else relies on the
/// HTTP client's default behavior.
const TRANSCRIPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Thin client for the financial-data provider's REST API.
///
/// Requests are single-shot: a non-2xx status surfaces as an error and is
/// never retried here. Callers decide whether a failure is fatal.
#[derive(Clone)]
pub struct FmpClient {
    api_key: String,
    client: Client,
}

/// Filters for the stock screener endpoint.
#[derive(Debug, Clone, Default)]
pub struct ScreenerQuery {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap_more_than: Option<f64>,
    pub limit: u32,
}

impl FmpClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, DashboardError> {
        let api_key = std::env::var("FMP_API_KEY")
            .map_err(|_| DashboardError::MissingConfig("FMP_API_KEY is not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Issue a GET against `path` (relative to the API base) and parse the
    /// body as JSON. The API key is appended to every request.
    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value, DashboardError> {
        let url = format!("{}{}", BASE_URL, path);

        let mut request = self.client.get(&url).query(&[("apikey", self.api_key.as_str())]);
        for (key, value) in params {
            request = request.query(&[(*key, value.as_str())]);
        }
        if path.starts_with("/v3/earning_call_transcript") {
            request = request.timeout(TRANSCRIPT_TIMEOUT);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DashboardError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DashboardError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DashboardError::ApiError(e.to_string()))
    }

    /// Real-time quote payload, returned verbatim.
    pub async fn quote(&self, symbol: &str) -> Result<Value, DashboardError> {
        self.get_json(&format!("/v3/quote/{}", symbol), &[]).await
    }

    /// Company profile payload, returned verbatim.
    pub async fn profile_raw(&self, symbol: &str) -> Result<Value, DashboardError> {
        self.get_json(&format!("/v3/profile/{}", symbol), &[]).await
    }

    /// Company profile decoded into its typed form. The provider wraps the
    /// profile in a single-element array.
    pub async fn profile(&self, symbol: &str) -> Result<CompanyProfile, DashboardError> {
        let raw = self.profile_raw(symbol).await?;
        let profiles: Vec<CompanyProfile> = serde_json::from_value(raw)
            .map_err(|e| DashboardError::InvalidData(format!("profile decode: {}", e)))?;
        profiles
            .into_iter()
            .next()
            .ok_or_else(|| DashboardError::InvalidData(format!("no profile for {}", symbol)))
    }

    /// Financial ratios for a symbol.
    pub async fn ratios(&self, symbol: &str, period: &str, limit: u32) -> Result<Value, DashboardError> {
        self.get_json(
            &format!("/v3/ratios/{}", symbol),
            &[("period", period.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// Income statements for a symbol.
    pub async fn income_statement(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Value, DashboardError> {
        self.get_json(
            &format!("/v3/income-statement/{}", symbol),
            &[("period", period.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// Daily OHLCV history, newest first, bounded to `days` rows.
    pub async fn historical_prices(&self, symbol: &str, days: u32) -> Result<Value, DashboardError> {
        self.get_json(
            &format!("/v3/historical-price-full/{}", symbol),
            &[("timeseries", days.to_string())],
        )
        .await
    }

    /// Intraday OHLCV chart at the given interval ("5min", "30min", ...).
    pub async fn intraday_prices(&self, symbol: &str, interval: &str) -> Result<Value, DashboardError> {
        self.get_json(&format!("/v3/historical-chart/{}/{}", interval, symbol), &[])
            .await
    }

    /// Revenue segmentation by product, as reported. The nested shape varies
    /// across companies and API versions; callers aggregate it heuristically.
    pub async fn revenue_product_segments(&self, symbol: &str) -> Result<Value, DashboardError> {
        self.get_json(
            "/v4/revenue-product-segmentation",
            &[("symbol", symbol.to_string()), ("structure", "flat".to_string())],
        )
        .await
    }

    /// Revenue segmentation by geography, as reported.
    pub async fn revenue_geographic_segments(&self, symbol: &str) -> Result<Value, DashboardError> {
        self.get_json(
            "/v4/revenue-geographic-segmentation",
            &[("symbol", symbol.to_string()), ("structure", "flat".to_string())],
        )
        .await
    }

    /// Recent news articles for a symbol, returned verbatim.
    pub async fn news_raw(&self, symbol: &str, limit: u32) -> Result<Value, DashboardError> {
        self.get_json(
            "/v3/stock_news",
            &[("tickers", symbol.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// Recent news articles decoded into their typed form.
    pub async fn news(&self, symbol: &str, limit: u32) -> Result<Vec<NewsArticle>, DashboardError> {
        let raw = self.news_raw(symbol, limit).await?;
        serde_json::from_value(raw)
            .map_err(|e| DashboardError::InvalidData(format!("news decode: {}", e)))
    }

    /// Earnings-call transcript. The only call with a client-side timeout.
    pub async fn transcript(
        &self,
        symbol: &str,
        quarter: Option<u8>,
        year: Option<i32>,
    ) -> Result<Value, DashboardError> {
        let mut params = Vec::new();
        if let Some(q) = quarter {
            params.push(("quarter", q.to_string()));
        }
        if let Some(y) = year {
            params.push(("year", y.to_string()));
        }
        self.get_json(&format!("/v3/earning_call_transcript/{}", symbol), &params)
            .await
    }

    /// Run the stock screener with the given filters.
    pub async fn screener(&self, query: &ScreenerQuery) -> Result<Vec<ScreenerEntry>, DashboardError> {
        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(sector) = &query.sector {
            params.push(("sector", sector.clone()));
        }
        if let Some(industry) = &query.industry {
            params.push(("industry", industry.clone()));
        }
        if let Some(floor) = query.market_cap_more_than {
            params.push(("marketCapMoreThan", format!("{:.0}", floor)));
        }

        let raw = self.get_json("/v3/stock-screener", &params).await?;
        serde_json::from_value(raw)
            .map_err(|e| DashboardError::InvalidData(format!("screener decode: {}", e)))
    }

    /// Full listed-stock universe.
    pub async fn stock_list(&self) -> Result<Vec<StockListing>, DashboardError> {
        let raw = self.get_json("/v3/stock/list", &[]).await?;
        serde_json::from_value(raw)
            .map_err(|e| DashboardError::InvalidData(format!("stock list decode: {}", e)))
    }
}
