pub mod llm;
pub mod patterns;
pub mod types;

pub use llm::{LlmExtraction, LlmKpiExtractor};
pub use patterns::PatternKpiExtractor;
pub use types::{ExtractedKpi, ExtractionMethod, KpiCategory, KpiUnit, ReportingPeriod};
