// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Normalization of AI token analyses.
//!
//! The model is prompted for a fixed shape but nothing guarantees it answers
//! with one. [`normalize_analysis`] coerces whatever came back into an
//! [`AnalysisReport`] the product UI can render without further checks.

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::providers::gemini::GroundingSource;

const UNKNOWN_TOKEN: &str = "Unknown token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum FindingSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FindingSeverity {
    /// Case-insensitive; anything unrecognised is `Medium`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => FindingSeverity::Low,
            Some("high") => FindingSeverity::High,
            Some("critical") => FindingSeverity::Critical,
            _ => FindingSeverity::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Finding {
    pub finding: String,
    pub severity: FindingSeverity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnalysisSource {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub token_name: String,
    /// 0-100, higher is riskier. `null` when the model gave no number.
    pub overall_score: Option<f64>,
    pub summary: String,
    pub on_chain_analysis: Vec<Finding>,
    pub off_chain_intelligence: Vec<Finding>,
    pub social_sentiment: Vec<Finding>,
    pub institutional_interest: Vec<Finding>,
    pub sources: Vec<AnalysisSource>,
}

/// Coerce a model reply into an [`AnalysisReport`].
///
/// Grounding citations replace the model's own `sources` when there is at
/// least one.
pub fn normalize_analysis(payload: &Value, grounding: &[GroundingSource]) -> AnalysisReport {
    let sources = if grounding.is_empty() {
        model_sources(payload.get("sources"))
    } else {
        grounding
            .iter()
            .map(|source| AnalysisSource {
                title: source.display_title().to_string(),
                url: source.uri.clone(),
            })
            .collect()
    };

    AnalysisReport {
        token_name: text_field(payload, "tokenName").unwrap_or_else(|| UNKNOWN_TOKEN.to_string()),
        overall_score: score_field(payload.get("overallScore")),
        summary: text_field(payload, "summary").unwrap_or_default(),
        on_chain_analysis: findings(payload.get("onChainAnalysis")),
        off_chain_intelligence: findings(payload.get("offChainIntelligence")),
        social_sentiment: findings(payload.get("socialSentiment")),
        institutional_interest: findings(payload.get("institutionalInterest")),
        sources,
    }
}

fn text_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn score_field(value: Option<&Value>) -> Option<f64> {
    let score = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }?;
    score.is_finite().then(|| score.clamp(0.0, 100.0))
}

fn findings(value: Option<&Value>) -> Vec<Finding> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) if !text.trim().is_empty() => Some(Finding {
                finding: text.trim().to_string(),
                severity: FindingSeverity::Medium,
            }),
            Value::Object(_) => text_field(item, "finding").map(|finding| Finding {
                finding,
                severity: FindingSeverity::parse(item.get("severity").and_then(Value::as_str)),
            }),
            _ => None,
        })
        .collect()
}

fn model_sources(value: Option<&Value>) -> Vec<AnalysisSource> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut sources: Vec<AnalysisSource> = Vec::new();
    for item in items {
        let Some(url) = text_field(item, "url").or_else(|| text_field(item, "uri")) else {
            continue;
        };
        if sources.iter().any(|s| s.url == url) {
            continue;
        }
        let title = text_field(item, "title").unwrap_or_else(|| url.clone());
        sources.push(AnalysisSource { title, url });
    }
    sources
}
