//! Pattern-based KPI extraction.
//!
//! An ordered list of templates, each carrying one or more regexes with a
//! numeric capture group and an optional unit-suffix group. Templates are
//! scanned in declaration order over the full text; near-duplicate values
//! for the same KPI type collapse to the earliest match.

use chrono::Utc;
use regex::Regex;

use crate::types::{ExtractedKpi, ExtractionMethod, KpiCategory, KpiUnit, ReportingPeriod};

/// Upper bound on scanned characters per call. Filing sections can run to
/// megabytes; bounding the scan keeps regex cost predictable.
const MAX_SCAN_CHARS: usize = 100_000;

const PATTERN_CONFIDENCE: f64 = 0.85;

/// Two values of the same KPI type within this relative distance are
/// considered the same observation.
const DEDUP_RELATIVE_TOLERANCE: f64 = 0.01;

const NUMBER: &str = r"(\d[\d,]*(?:\.\d+)?)";
const SUFFIX: &str = r"(?:\s*(million|billion|thousand|bil|[MBK])\b)?";

struct KpiTemplate {
    kpi_type: &'static str,
    display_name: &'static str,
    category: KpiCategory,
    unit: KpiUnit,
    patterns: Vec<Regex>,
}

pub struct PatternKpiExtractor {
    templates: Vec<KpiTemplate>,
}

impl Default for PatternKpiExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternKpiExtractor {
    pub fn new() -> Self {
        let template = |kpi_type, display_name, category, unit, sources: &[String]| KpiTemplate {
            kpi_type,
            display_name,
            category,
            unit,
            patterns: sources
                .iter()
                .map(|s| Regex::new(s).expect("KPI pattern must compile"))
                .collect(),
        };

        let templates = vec![
            template(
                "subscribers",
                "Subscribers",
                KpiCategory::Customer,
                KpiUnit::Count,
                &[
                    format!(r"(?i){NUMBER}{SUFFIX}\s+(?:global\s+|paid\s+|total\s+)?subscribers"),
                    format!(r"(?i)subscriber\s+base\s+of\s+{NUMBER}{SUFFIX}"),
                ],
            ),
            template(
                "paid_memberships",
                "Paid Memberships",
                KpiCategory::Customer,
                KpiUnit::Count,
                &[format!(r"(?i){NUMBER}{SUFFIX}\s+paid\s+(?:net\s+)?memberships")],
            ),
            template(
                "monthly_active_users",
                "Monthly Active Users",
                KpiCategory::Customer,
                KpiUnit::Count,
                &[
                    format!(r"(?i){NUMBER}{SUFFIX}\s+monthly\s+active\s+users"),
                    format!(r"(?i)MAUs?\s+(?:of|reached|grew\s+to)\s+{NUMBER}{SUFFIX}"),
                ],
            ),
            template(
                "daily_active_users",
                "Daily Active Users",
                KpiCategory::Customer,
                KpiUnit::Count,
                &[
                    format!(r"(?i){NUMBER}{SUFFIX}\s+daily\s+active\s+users"),
                    format!(r"(?i)DAUs?\s+(?:of|reached|grew\s+to)\s+{NUMBER}{SUFFIX}"),
                ],
            ),
            template(
                "average_revenue_per_user",
                "Average Revenue Per User",
                KpiCategory::Financial,
                KpiUnit::Usd,
                &[format!(
                    r"(?i)(?:ARPU|average\s+revenue\s+per\s+user)\s+(?:of|was|at)\s+\$?{NUMBER}"
                )],
            ),
            template(
                "churn_rate",
                "Churn Rate",
                KpiCategory::Customer,
                KpiUnit::Percentage,
                &[format!(r"(?i)churn\s+(?:rate\s+)?(?:of\s+|was\s+|at\s+)?{NUMBER}\s*%")],
            ),
            template(
                "gross_margin",
                "Gross Margin",
                KpiCategory::Efficiency,
                KpiUnit::Percentage,
                &[format!(
                    r"(?i)gross\s+margin\s+(?:of\s+|was\s+|at\s+|expanded\s+to\s+)?{NUMBER}\s*%"
                )],
            ),
            template(
                "operating_margin",
                "Operating Margin",
                KpiCategory::Efficiency,
                KpiUnit::Percentage,
                &[format!(
                    r"(?i)operating\s+margin\s+(?:of\s+|was\s+|at\s+|expanded\s+to\s+)?{NUMBER}\s*%"
                )],
            ),
            template(
                "revenue_growth",
                "Revenue Growth",
                KpiCategory::Growth,
                KpiUnit::Percentage,
                &[format!(
                    r"(?i)revenue\s+(?:grew|increased|rose|was\s+up)\s+(?:by\s+)?{NUMBER}\s*%"
                )],
            ),
            template(
                "retail_stores",
                "Retail Stores",
                KpiCategory::Operational,
                KpiUnit::Count,
                &[format!(
                    r"(?i){NUMBER}{SUFFIX}\s+(?:retail\s+|company-operated\s+)?stores"
                )],
            ),
            template(
                "employees",
                "Employees",
                KpiCategory::Operational,
                KpiUnit::Count,
                &[format!(r"(?i){NUMBER}{SUFFIX}\s+(?:full-time\s+)?employees")],
            ),
        ];

        Self { templates }
    }

    /// Scan `text` and return the deduplicated metric list. The caller stamps
    /// symbol, document, date, and fiscal period.
    pub fn extract(&self, text: &str) -> Vec<ExtractedKpi> {
        let text = truncate_chars(text, MAX_SCAN_CHARS);
        let now = Utc::now();
        let mut raw = Vec::new();

        for template in &self.templates {
            for pattern in &template.patterns {
                for caps in pattern.captures_iter(text) {
                    let number = match caps.get(1) {
                        Some(m) => m,
                        None => continue,
                    };
                    // A capture that does not parse cleanly is dropped rather
                    // than emitted as a NaN-valued metric.
                    let value = match parse_numeric(number.as_str()) {
                        Some(v) => v,
                        None => {
                            tracing::debug!(
                                "skipping unparseable numeric capture {:?}",
                                number.as_str()
                            );
                            continue;
                        }
                    };
                    let scale = caps
                        .get(2)
                        .map(|m| suffix_scale(m.as_str()))
                        .unwrap_or(1.0);

                    raw.push(ExtractedKpi {
                        symbol: String::new(),
                        kpi_type: template.kpi_type.to_string(),
                        display_name: template.display_name.to_string(),
                        category: template.category,
                        value: value * scale,
                        unit: template.unit,
                        period: ReportingPeriod::Quarterly,
                        date: None,
                        source_text: caps[0].to_string(),
                        source_document: None,
                        extraction_method: ExtractionMethod::Pattern,
                        confidence: PATTERN_CONFIDENCE,
                        validated: false,
                        quality_score: PATTERN_CONFIDENCE,
                        anomaly_flags: Vec::new(),
                        created_at: now,
                        updated_at: now,
                    });
                }
            }
        }

        dedup_near_values(raw)
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn parse_numeric(s: &str) -> Option<f64> {
    s.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

fn suffix_scale(suffix: &str) -> f64 {
    match suffix.to_lowercase().as_str() {
        "billion" | "bil" | "b" => 1e9,
        "million" | "m" => 1e6,
        "thousand" | "k" => 1e3,
        _ => 1.0,
    }
}

/// Keep the first occurrence per KPI type; later values within the relative
/// tolerance of any earlier kept value are dropped.
fn dedup_near_values(raw: Vec<ExtractedKpi>) -> Vec<ExtractedKpi> {
    let mut kept: Vec<ExtractedKpi> = Vec::new();
    'candidates: for kpi in raw {
        for prev in kept.iter().filter(|p| p.kpi_type == kpi.kpi_type) {
            let denom = prev.value.abs().max(f64::EPSILON);
            if ((kpi.value - prev.value).abs() / denom) < DEDUP_RELATIVE_TOLERANCE {
                continue 'candidates;
            }
        }
        kept.push(kpi);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_extraction() {
        let extractor = PatternKpiExtractor::new();
        let kpis = extractor.extract("We ended Q3 with 52.6 million subscribers.");

        assert_eq!(kpis.len(), 1);
        assert_eq!(kpis[0].kpi_type, "subscribers");
        assert_eq!(kpis[0].value, 52_600_000.0);
        assert_eq!(kpis[0].unit, KpiUnit::Count);
        assert_eq!(kpis[0].extraction_method, ExtractionMethod::Pattern);
        assert_eq!(kpis[0].confidence, 0.85);
        assert_eq!(kpis[0].source_text, "52.6 million subscribers");
    }

    #[test]
    fn test_near_duplicates_collapse() {
        let extractor = PatternKpiExtractor::new();
        let kpis = extractor.extract(
            "We reached 52.6 million subscribers this quarter. \
             Our subscriber base of 52.6 million remains the largest in the market.",
        );

        let subs: Vec<_> = kpis.iter().filter(|k| k.kpi_type == "subscribers").collect();
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn test_distinct_values_both_survive() {
        let extractor = PatternKpiExtractor::new();
        let kpis = extractor.extract(
            "Last year we had 48.1 million subscribers; \
             we ended this year with 52.6 million subscribers.",
        );

        let subs: Vec<_> = kpis.iter().filter(|k| k.kpi_type == "subscribers").collect();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].value, 48_100_000.0);
        assert_eq!(subs[1].value, 52_600_000.0);
    }

    #[test]
    fn test_thousands_separator_and_suffixes() {
        let extractor = PatternKpiExtractor::new();
        let kpis = extractor.extract(
            "The company operates 2,412 retail stores and employs 164 thousand employees. \
             ARPU of $11.76 was flat year over year.",
        );

        let stores = kpis.iter().find(|k| k.kpi_type == "retail_stores").unwrap();
        assert_eq!(stores.value, 2_412.0);

        let employees = kpis.iter().find(|k| k.kpi_type == "employees").unwrap();
        assert_eq!(employees.value, 164_000.0);

        let arpu = kpis.iter().find(|k| k.kpi_type == "average_revenue_per_user").unwrap();
        assert_eq!(arpu.value, 11.76);
        assert_eq!(arpu.unit, KpiUnit::Usd);
    }

    #[test]
    fn test_percentage_metrics_unscaled() {
        let extractor = PatternKpiExtractor::new();
        let kpis = extractor.extract(
            "Gross margin of 45.2% improved on pricing, while churn of 2.4% ticked up. \
             Revenue grew 18% year over year.",
        );

        let margin = kpis.iter().find(|k| k.kpi_type == "gross_margin").unwrap();
        assert_eq!(margin.value, 45.2);
        assert_eq!(margin.unit, KpiUnit::Percentage);

        let churn = kpis.iter().find(|k| k.kpi_type == "churn_rate").unwrap();
        assert_eq!(churn.value, 2.4);

        let growth = kpis.iter().find(|k| k.kpi_type == "revenue_growth").unwrap();
        assert_eq!(growth.value, 18.0);
    }

    #[test]
    fn test_no_metrics_in_plain_prose() {
        let extractor = PatternKpiExtractor::new();
        assert!(extractor
            .extract("The weather was pleasant throughout the conference.")
            .is_empty());
    }

    #[test]
    fn test_scan_is_bounded() {
        let extractor = PatternKpiExtractor::new();
        let mut text = "x".repeat(MAX_SCAN_CHARS);
        text.push_str(" We ended Q3 with 52.6 million subscribers.");
        assert!(extractor.extract(&text).is_empty());
    }
}
