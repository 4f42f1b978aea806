//! Data models shared by the scrapers, the collector, and the analysis step.
//!
//! - [`NewsItem`]: one normalized news entry produced by a court scraper
//! - [`SourceResult`]: the items collected from one court in one run
//! - [`CollectionOutcome`]: every successful source plus the warnings for the failed ones
//! - [`AnalysisRecord`]: the per-court verdict returned by the language model
//! - [`AnalysisReport`]: what `analyze` hands back to the caller
//!
//! The analysis fields keep the Portuguese names the model is instructed to
//! emit, and the usage counters are camelCase to match the published report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single news entry as scraped from a court portal.
///
/// The date is always a real calendar day; items whose date could not be
/// parsed never make it out of a scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Publication day, serialized as `dd/mm/yyyy`.
    #[serde(with = "dmy_date")]
    pub date: NaiveDate,
    /// Absolute article URL.
    pub url: String,
    /// Headline.
    pub title: String,
    /// Normalized summary or article excerpt. May be empty or a sentinel.
    pub summary: String,
}

/// All news collected from one court.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResult {
    /// Court identifier, e.g. `"TJ-MG"`.
    pub source: String,
    /// Items in site listing order.
    pub news: Vec<NewsItem>,
}

/// Everything one collection run produced.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CollectionOutcome {
    pub results: Vec<SourceResult>,
    pub warnings: Vec<String>,
}

/// One court's verdict as produced by the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub source: String,
    pub fonte_verificada_integralmente_nesta_data: bool,
    pub mudanca_relevante_mapeada: bool,
    #[serde(default)]
    pub noticias_preocupantes: Vec<NewsItem>,
    #[serde(default)]
    pub justificativa_e_impacto: Option<String>,
}

/// The model's answer after parsing.
///
/// Serialized untagged, so callers see either the record array, whatever
/// JSON the model produced, or the plain text.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Analysis {
    /// The response matched the requested record shape.
    Records(Vec<AnalysisRecord>),
    /// Valid JSON, but not the requested shape.
    Json(serde_json::Value),
    /// Not JSON at all; passed through verbatim.
    Raw(String),
}

/// Token accounting reported by the chat-completion service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Result of a collect-and-analyze run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis: Analysis,
    pub warnings: Vec<String>,
    pub usage: Usage,
}

/// Serde adapter for `dd/mm/yyyy` dates.
pub mod dmy_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d/%m/%Y";

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
