//! Findings produced by an external static analyzer.
//!
//! The analyzer is a black box: [`CommandAnalyzer`] runs it and turns its
//! output into [`ExternalFinding`] records, and [`ExternalFindingAdapter`]
//! maps those records onto the engine's own rule ids and locations.

pub mod adapter;
pub mod runner;

pub use adapter::ExternalFindingAdapter;
pub use runner::{parse_json_lines, parse_slither_json, CommandAnalyzer, ExternalAnalyzer};

use serde::{Deserialize, Serialize};

/// One record in the analyzer's own vocabulary.
///
/// This is also the line format accepted in `json_lines` mode, so field
/// aliases cover the spellings common tools use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFinding {
    #[serde(default)]
    pub tool: String,

    #[serde(alias = "check", alias = "rule", alias = "id")]
    pub rule_id: String,

    #[serde(default, alias = "impact")]
    pub severity: String,

    #[serde(default)]
    pub confidence: String,

    #[serde(alias = "file", alias = "filename")]
    pub path: String,

    #[serde(default)]
    pub line: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    #[serde(default, alias = "message")]
    pub description: String,
}
