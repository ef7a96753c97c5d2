//! Suggested improvement types
//!
//! Improvements are produced by the AI advisor (or its rule-based fallback)
//! and are immutable once attached to a completed job's result.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImprovementKind {
    Content,
    Layout,
    Seo,
    Performance,
    Accessibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffortLevel {
    Low,
    Medium,
    High,
}

/// A single suggested change with before/after text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ImprovementKind,
    pub title: String,
    pub description: String,
    pub impact: ImpactLevel,
    pub effort: EffortLevel,
    pub before: String,
    pub after: String,
    pub auto_applicable: bool,
}
