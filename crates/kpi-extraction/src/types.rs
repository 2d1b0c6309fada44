use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Broad grouping for an extracted metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiCategory {
    Operational,
    Customer,
    Financial,
    Efficiency,
    Growth,
}

impl KpiCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "operational" => Some(KpiCategory::Operational),
            "customer" => Some(KpiCategory::Customer),
            "financial" => Some(KpiCategory::Financial),
            "efficiency" => Some(KpiCategory::Efficiency),
            "growth" => Some(KpiCategory::Growth),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiUnit {
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "percentage")]
    Percentage,
}

impl KpiUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "count" => Some(KpiUnit::Count),
            "usd" | "$" | "dollars" => Some(KpiUnit::Usd),
            "percentage" | "percent" | "%" => Some(KpiUnit::Percentage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingPeriod {
    Quarterly,
    Annual,
    Monthly,
}

impl ReportingPeriod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quarterly" | "quarter" | "q" => Some(ReportingPeriod::Quarterly),
            "annual" | "annually" | "fy" | "year" => Some(ReportingPeriod::Annual),
            "monthly" | "month" => Some(ReportingPeriod::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Pattern,
    Llm,
    Table,
    Manual,
}

/// A metric pulled out of a financial document.
///
/// Ephemeral: built per extraction call and returned in the response, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedKpi {
    pub symbol: String,
    pub kpi_type: String,
    pub display_name: String,
    pub category: KpiCategory,
    pub value: f64,
    pub unit: KpiUnit,
    pub period: ReportingPeriod,
    pub date: Option<NaiveDate>,
    /// Verbatim snippet the value was read from.
    pub source_text: String,
    pub source_document: Option<String>,
    pub extraction_method: ExtractionMethod,
    pub confidence: f64,
    pub validated: bool,
    pub quality_score: f64,
    pub anomaly_flags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_serializes_usd_uppercase() {
        assert_eq!(serde_json::to_string(&KpiUnit::Usd).unwrap(), "\"USD\"");
        assert_eq!(serde_json::to_string(&KpiUnit::Count).unwrap(), "\"count\"");
    }

    #[test]
    fn test_period_parse_aliases() {
        assert_eq!(ReportingPeriod::parse("FY"), Some(ReportingPeriod::Annual));
        assert_eq!(ReportingPeriod::parse("quarter"), Some(ReportingPeriod::Quarterly));
        assert_eq!(ReportingPeriod::parse("weekly"), None);
    }
}
