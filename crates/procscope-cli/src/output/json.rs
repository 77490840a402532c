//! JSON report output.
//!
//! The serialized document is the core's [`ProcedureAnalysis`] with one
//! addition: `analysis_timestamp` (ISO-8601 UTC), stamped here at the
//! serialization boundary so the core's analysis stays byte-for-byte
//! reproducible.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use procscope_core::ProcedureAnalysis;
use serde::Serialize;

/// The JSON document written by the CLI. Key names are an external contract.
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    #[serde(flatten)]
    pub analysis: &'a ProcedureAnalysis,
    pub analysis_timestamp: String,
}

/// Serialize the report, pretty-printed unless `compact`.
pub fn format_json(analysis: &ProcedureAnalysis, compact: bool) -> Result<String> {
    let document = ReportDocument {
        analysis,
        analysis_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    let rendered = if compact {
        serde_json::to_string(&document)
    } else {
        serde_json::to_string_pretty(&document)
    };
    rendered.context("Failed to serialize report to JSON")
}
