use serde::{Deserialize, Serialize};

/// Company profile from the provider's `/v3/profile` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub mkt_cap: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub exchange_short_name: Option<String>,
}

/// One row from the provider's stock screener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerEntry {
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub exchange_short_name: Option<String>,
}

/// One entry from the provider's full stock list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockListing {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub exchange_short_name: Option<String>,
    #[serde(default, rename = "type")]
    pub listing_type: Option<String>,
}

/// A news article from the provider's stock-news feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default)]
    pub symbol: Option<String>,
    pub title: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One OHLCV point as the provider reports it (daily or intraday).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// Chart timeframe requested by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    Day1,
    Day5,
    Month1,
    Month3,
    Month6,
    Year1,
    Year5,
}

impl Timeframe {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "1D" => Some(Timeframe::Day1),
            "5D" => Some(Timeframe::Day5),
            "1M" => Some(Timeframe::Month1),
            "3M" => Some(Timeframe::Month3),
            "6M" => Some(Timeframe::Month6),
            "1Y" => Some(Timeframe::Year1),
            "5Y" => Some(Timeframe::Year5),
            _ => None,
        }
    }

    /// Lookback window in calendar days for daily-bar timeframes.
    pub fn lookback_days(&self) -> u32 {
        match self {
            Timeframe::Day1 => 1,
            Timeframe::Day5 => 5,
            Timeframe::Month1 => 30,
            Timeframe::Month3 => 90,
            Timeframe::Month6 => 180,
            Timeframe::Year1 => 365,
            Timeframe::Year5 => 1825,
        }
    }

    /// Intraday chart interval, when this timeframe is served from the
    /// intraday endpoint instead of daily history.
    pub fn intraday_interval(&self) -> Option<&'static str> {
        match self {
            Timeframe::Day1 => Some("5min"),
            Timeframe::Day5 => Some("30min"),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Day1 => "1D",
            Timeframe::Day5 => "5D",
            Timeframe::Month1 => "1M",
            Timeframe::Month3 => "3M",
            Timeframe::Month6 => "6M",
            Timeframe::Year1 => "1Y",
            Timeframe::Year5 => "5Y",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse() {
        assert_eq!(Timeframe::parse("1m"), Some(Timeframe::Month1));
        assert_eq!(Timeframe::parse("5Y"), Some(Timeframe::Year5));
        assert_eq!(Timeframe::parse("2W"), None);
    }

    #[test]
    fn test_intraday_mapping() {
        assert_eq!(Timeframe::Day1.intraday_interval(), Some("5min"));
        assert_eq!(Timeframe::Month3.intraday_interval(), None);
        assert_eq!(Timeframe::Month3.lookback_days(), 90);
    }

    #[test]
    fn test_profile_decodes_provider_payload() {
        let raw = serde_json::json!({
            "symbol": "AAPL",
            "companyName": "Apple Inc.",
            "sector": "Technology",
            "industry": "Consumer Electronics",
            "mktCap": 2.8e12,
            "price": 182.5,
            "exchangeShortName": "NASDAQ",
            "ipoDate": "1980-12-12"
        });
        let profile: CompanyProfile = serde_json::from_value(raw).unwrap();
        assert_eq!(profile.symbol, "AAPL");
        assert_eq!(profile.industry.as_deref(), Some("Consumer Electronics"));
        assert_eq!(profile.mkt_cap, Some(2.8e12));
    }
}
