//! KPI extraction routes.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use kpi_extraction::{
    ExtractedKpi, ExtractionMethod, LlmKpiExtractor, PatternKpiExtractor, ReportingPeriod,
};
use serde::{Deserialize, Serialize};

use crate::financial_routes::require_symbol;
use crate::{ApiError, AppState};

pub fn kpi_routes() -> Router<AppState> {
    Router::new()
        .route("/api/kpi/extract-simple", post(extract_simple))
        .route("/api/kpi/extract-llm", post(extract_llm))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternExtractionResponse {
    pub symbol: String,
    pub extraction_method: ExtractionMethod,
    pub count: usize,
    pub kpis: Vec<ExtractedKpi>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmExtractionResponse {
    pub symbol: String,
    pub extraction_method: ExtractionMethod,
    pub count: usize,
    pub overall_confidence: f64,
    pub kpis: Vec<ExtractedKpi>,
}

#[derive(Default)]
struct SimpleExtractForm {
    file_text: Option<String>,
    file_name: Option<String>,
    symbol: Option<String>,
    document_type: Option<String>,
    report_date: Option<String>,
    fiscal_period: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<SimpleExtractForm, ApiError> {
    let mut form = SimpleExtractForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable file field: {}", e)))?;
                form.file_text = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            "symbol" | "documentType" | "reportDate" | "fiscalPeriod" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable {} field: {}", name, e)))?;
                match name.as_str() {
                    "symbol" => form.symbol = Some(value),
                    "documentType" => form.document_type = Some(value),
                    "reportDate" => form.report_date = Some(value),
                    _ => form.fiscal_period = Some(value),
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn extract_simple(
    State(_state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PatternExtractionResponse>, ApiError> {
    let form = read_form(multipart).await?;

    let text = form
        .file_text
        .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    let symbol = require_symbol(&form.symbol)?;

    let date = form
        .report_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
    let period = form
        .fiscal_period
        .as_deref()
        .and_then(ReportingPeriod::parse)
        .unwrap_or(ReportingPeriod::Quarterly);
    let source_document = form.document_type.clone().or(form.file_name);

    let mut kpis = PatternKpiExtractor::new().extract(&text);
    for kpi in &mut kpis {
        kpi.symbol = symbol.clone();
        kpi.date = date;
        kpi.period = period;
        kpi.source_document = source_document.clone();
    }

    Ok(Json(PatternExtractionResponse {
        symbol,
        extraction_method: ExtractionMethod::Pattern,
        count: kpis.len(),
        kpis,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmExtractRequest {
    pub text: Option<String>,
    pub symbol: Option<String>,
    pub industry: Option<String>,
    pub document_type: Option<String>,
}

async fn extract_llm(
    State(state): State<AppState>,
    Json(request): Json<LlmExtractRequest>,
) -> Result<Json<LlmExtractionResponse>, ApiError> {
    let text = match request.text.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return Err(ApiError::BadRequest("text is required".to_string())),
    };
    let symbol = require_symbol(&request.symbol)?;

    let llm = state.llm()?;
    let extraction = LlmKpiExtractor::new(llm.as_ref().clone())
        .extract(
            &text,
            &symbol,
            request.industry.as_deref(),
            request.document_type.as_deref(),
        )
        .await?;

    Ok(Json(LlmExtractionResponse {
        symbol,
        extraction_method: ExtractionMethod::Llm,
        count: extraction.kpis.len(),
        overall_confidence: extraction.overall_confidence,
        kpis: extraction.kpis,
    }))
}
