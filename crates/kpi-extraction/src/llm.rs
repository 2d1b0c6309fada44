//! LLM-based KPI extraction.
//!
//! Builds an instruction prompt with industry- and document-specific hints,
//! demands JSON-only output against a fixed schema, and defensively parses
//! the model's answer through the shared recovery parser.

use chrono::Utc;
use llm_client::{extract_json_object, LlmClient, LlmError, LlmResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ExtractedKpi, ExtractionMethod, KpiCategory, KpiUnit, ReportingPeriod};

/// Upper bound on document characters sent to the model. Truncation keeps
/// the head of the document, where filings put the operating highlights.
const MAX_PROMPT_CHARS: usize = 24_000;

const KPI_SYSTEM_PROMPT: &str = "You are a financial analyst extracting key performance \
indicators from company documents. Respond with JSON only, no prose, no code fences, \
matching exactly the schema in the user message.";

const TECHNOLOGY_HINTS: &[&str] = &[
    "monthly active users",
    "daily active users",
    "annual recurring revenue",
    "net revenue retention",
    "cloud revenue growth",
];

const RETAIL_HINTS: &[&str] = &[
    "same-store sales growth",
    "store count",
    "e-commerce penetration",
    "inventory turnover",
    "average transaction value",
];

const GAMING_HINTS: &[&str] = &[
    "monthly active users",
    "bookings",
    "average revenue per paying user",
    "paying user conversion",
];

const TELECOM_HINTS: &[&str] = &[
    "postpaid subscribers",
    "churn rate",
    "average revenue per user",
    "broadband additions",
];

const STREAMING_HINTS: &[&str] = &[
    "paid subscribers",
    "average revenue per membership",
    "content spend",
    "engagement hours",
];

const GENERIC_HINTS: &[&str] = &[
    "revenue growth",
    "gross margin",
    "operating margin",
    "customer count",
];

fn industry_hints(industry: Option<&str>) -> &'static [&'static str] {
    let industry = industry.unwrap_or("").to_lowercase();
    if industry.contains("tech") || industry.contains("software") {
        TECHNOLOGY_HINTS
    } else if industry.contains("retail") {
        RETAIL_HINTS
    } else if industry.contains("gaming") || industry.contains("game") {
        GAMING_HINTS
    } else if industry.contains("telecom") {
        TELECOM_HINTS
    } else if industry.contains("streaming") || industry.contains("entertainment") {
        STREAMING_HINTS
    } else {
        GENERIC_HINTS
    }
}

fn document_hint(document_type: Option<&str>) -> &'static str {
    match document_type.unwrap_or("").to_lowercase().as_str() {
        "10-k" => "This is an annual report; prefer full-year operating metrics and segment disclosures.",
        "10-q" => "This is a quarterly report; prefer quarter-over-quarter operating metrics.",
        "earnings-release" => "This is an earnings release; prefer headline metrics and forward guidance.",
        "investor-presentation" => "This is an investor presentation; prefer growth and cohort metrics.",
        _ => "Extract whichever operating metrics the document states explicitly.",
    }
}

fn build_user_prompt(
    text: &str,
    symbol: &str,
    industry: Option<&str>,
    document_type: Option<&str>,
) -> String {
    let hints = industry_hints(industry).join(", ");
    format!(
        "Extract the key performance indicators for {} from the document below. {}\n\
         Metrics commonly reported by comparable companies: {}.\n\
         Only report values stated in the document; never infer or compute.\n\
         Respond with: {{ \"kpis\": [{{ \"type\": string, \"displayName\": string, \
         \"value\": number, \"unit\": \"count\"|\"USD\"|\"percentage\", \
         \"period\": \"quarterly\"|\"annual\"|\"monthly\", \"sourceText\": string, \
         \"confidence\": number, \"category\": \"operational\"|\"customer\"|\"financial\"|\"efficiency\"|\"growth\" }}] }}\n\n\
         Document text:\n{}",
        symbol.to_uppercase(),
        document_hint(document_type),
        hints,
        truncate_chars(text, MAX_PROMPT_CHARS),
    )
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Deserialize)]
struct KpiPayload {
    #[serde(default)]
    kpis: Vec<RawLlmKpi>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLlmKpi {
    #[serde(rename = "type")]
    kpi_type: Option<String>,
    display_name: Option<String>,
    value: Option<f64>,
    unit: Option<String>,
    period: Option<String>,
    source_text: Option<String>,
    confidence: Option<f64>,
    category: Option<String>,
}

/// Result of one LLM extraction call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmExtraction {
    pub kpis: Vec<ExtractedKpi>,
    /// Arithmetic mean of the per-KPI confidences; 0 for an empty set.
    pub overall_confidence: f64,
}

/// Convert a parsed model payload into stamped metrics.
pub fn parse_extraction(value: &Value, symbol: &str) -> LlmResult<LlmExtraction> {
    let payload: KpiPayload = serde_json::from_value(value.clone())
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let now = Utc::now();
    let symbol = symbol.to_uppercase();
    let mut kpis = Vec::new();

    for raw in payload.kpis {
        let kpi_type = match raw.kpi_type {
            Some(t) if !t.is_empty() => t,
            _ => continue,
        };
        let value = match raw.value {
            Some(v) if v.is_finite() => v,
            _ => continue,
        };
        let confidence = raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0);

        kpis.push(ExtractedKpi {
            symbol: symbol.clone(),
            display_name: raw.display_name.unwrap_or_else(|| kpi_type.clone()),
            kpi_type,
            category: raw
                .category
                .as_deref()
                .and_then(KpiCategory::parse)
                .unwrap_or(KpiCategory::Operational),
            value,
            unit: raw
                .unit
                .as_deref()
                .and_then(KpiUnit::parse)
                .unwrap_or(KpiUnit::Count),
            period: raw
                .period
                .as_deref()
                .and_then(ReportingPeriod::parse)
                .unwrap_or(ReportingPeriod::Quarterly),
            date: None,
            source_text: raw.source_text.unwrap_or_default(),
            source_document: None,
            extraction_method: ExtractionMethod::Llm,
            confidence,
            validated: false,
            quality_score: confidence,
            anomaly_flags: Vec::new(),
            created_at: now,
            updated_at: now,
        });
    }

    let overall_confidence = if kpis.is_empty() {
        0.0
    } else {
        kpis.iter().map(|k| k.confidence).sum::<f64>() / kpis.len() as f64
    };

    Ok(LlmExtraction {
        kpis,
        overall_confidence,
    })
}

pub struct LlmKpiExtractor {
    client: LlmClient,
}

impl LlmKpiExtractor {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    pub async fn extract(
        &self,
        text: &str,
        symbol: &str,
        industry: Option<&str>,
        document_type: Option<&str>,
    ) -> LlmResult<LlmExtraction> {
        let prompt = build_user_prompt(text, symbol, industry, document_type);
        let output = self.client.chat(KPI_SYSTEM_PROMPT, &prompt).await?;
        let value = extract_json_object(&output)?;
        parse_extraction(&value, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_extraction_stamps_metadata() {
        let value = json!({
            "kpis": [
                {
                    "type": "subscribers",
                    "displayName": "Paid Subscribers",
                    "value": 260.3e6,
                    "unit": "count",
                    "period": "quarterly",
                    "sourceText": "260.3 million paid subscribers",
                    "confidence": 0.9,
                    "category": "customer"
                },
                {
                    "type": "arpu",
                    "value": 11.76,
                    "unit": "USD",
                    "confidence": 0.7
                }
            ]
        });

        let extraction = parse_extraction(&value, "nflx").unwrap();
        assert_eq!(extraction.kpis.len(), 2);

        let first = &extraction.kpis[0];
        assert_eq!(first.symbol, "NFLX");
        assert_eq!(first.extraction_method, ExtractionMethod::Llm);
        assert_eq!(first.category, KpiCategory::Customer);
        assert!(!first.validated);
        assert_eq!(first.quality_score, 0.9);

        // Missing fields fall back to defaults.
        let second = &extraction.kpis[1];
        assert_eq!(second.display_name, "arpu");
        assert_eq!(second.unit, KpiUnit::Usd);
        assert_eq!(second.period, ReportingPeriod::Quarterly);

        let expected = (0.9 + 0.7) / 2.0;
        assert!((extraction.overall_confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_parse_extraction_empty_set() {
        let extraction = parse_extraction(&json!({ "kpis": [] }), "AAPL").unwrap();
        assert!(extraction.kpis.is_empty());
        assert_eq!(extraction.overall_confidence, 0.0);
    }

    #[test]
    fn test_entries_without_type_or_value_are_skipped() {
        let value = json!({
            "kpis": [
                { "displayName": "Mystery", "value": 12.0 },
                { "type": "stores" }
            ]
        });
        let extraction = parse_extraction(&value, "AAPL").unwrap();
        assert!(extraction.kpis.is_empty());
    }

    #[test]
    fn test_industry_hint_selection() {
        assert_eq!(industry_hints(Some("Consumer Electronics Technology")), TECHNOLOGY_HINTS);
        assert_eq!(industry_hints(Some("Specialty Retail")), RETAIL_HINTS);
        assert_eq!(industry_hints(Some("Entertainment")), STREAMING_HINTS);
        assert_eq!(industry_hints(None), GENERIC_HINTS);
    }

    #[test]
    fn test_prompt_embeds_document_hint() {
        let prompt = build_user_prompt("text", "aapl", None, Some("10-K"));
        assert!(prompt.contains("annual report"));
        assert!(prompt.contains("AAPL"));
    }
}
