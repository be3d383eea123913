// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Gemini `generateContent` client with Google Search grounding.
//!
//! The model is asked to answer with a single JSON object. Its reply is read
//! back in three steps:
//!
//! 1. [`extract_text`] finds the reply text. Response shapes differ between
//!    API revisions, so a fixed list of extractors is tried in order.
//! 2. [`sanitize_json`] cuts the text down to the outermost `{ ... }` to drop
//!    any prose the model wraps around the object.
//! 3. [`grounding_sources`] collects the web citations of the search tool.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::GeminiConfig;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("Gemini request failed: {0}")]
    Request(String),

    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Gemini response empty")]
    EmptyResponse,

    #[error("Gemini returned invalid JSON.")]
    InvalidJson,
}

/// Generative model behind the AI endpoints.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run a grounded generation and return the raw response document.
    async fn generate_content(&self, prompt: &str) -> Result<Value, GeminiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub uri: String,
    pub title: Option<String>,
}

impl GroundingSource {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.uri)
    }
}

/// Parsed model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub payload: Value,
    pub grounding: Vec<GroundingSource>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    http: Client,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    tools: [Value; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, GeminiError> {
        // Grounded generations routinely take tens of seconds.
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| GeminiError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.api_base.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
            http,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_content(&self, prompt: &str) -> Result<Value, GeminiError> {
        let body = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            tools: [json!({ "google_search": {} })],
        };

        debug!(endpoint = %self.endpoint, "Requesting Gemini generation");
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeminiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| GeminiError::Request(format!("invalid response body: {e}")))
    }
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

// =============================================================================
// Reading a response
// =============================================================================

type TextExtractor = fn(&Value) -> Option<String>;

/// Tried in order; the first non-empty text wins.
const TEXT_EXTRACTORS: [TextExtractor; 3] = [top_level_text, answer_parts_text, all_parts_text];

pub fn extract_text(response: &Value) -> Option<String> {
    TEXT_EXTRACTORS.iter().find_map(|extract| extract(response))
}

fn non_empty(text: String) -> Option<String> {
    (!text.trim().is_empty()).then_some(text)
}

/// Pre-flattened `text` field.
fn top_level_text(response: &Value) -> Option<String> {
    response
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .and_then(non_empty)
}

fn first_candidate_parts(response: &Value) -> Option<&Vec<Value>> {
    response.pointer("/candidates/0/content/parts")?.as_array()
}

/// Text parts of the first candidate, skipping the model's thought summaries.
fn answer_parts_text(response: &Value) -> Option<String> {
    let text: String = first_candidate_parts(response)?
        .iter()
        .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    non_empty(text)
}

fn all_parts_text(response: &Value) -> Option<String> {
    let text: String = first_candidate_parts(response)?
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    non_empty(text)
}

/// Slice from the first `{` to the last `}`.
pub fn sanitize_json(raw: &str) -> Result<&str, GeminiError> {
    if raw.trim().is_empty() {
        return Err(GeminiError::EmptyResponse);
    }
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&raw[start..=end]),
        _ => Err(GeminiError::InvalidJson),
    }
}

/// Extract, sanitize and parse the JSON object in a model reply.
pub fn parse_model_json(raw: &str) -> Result<Value, GeminiError> {
    serde_json::from_str(sanitize_json(raw)?).map_err(|_| GeminiError::InvalidJson)
}

/// Web citations of the first candidate, de-duplicated by URI.
pub fn grounding_sources(response: &Value) -> Vec<GroundingSource> {
    let Some(chunks) = response
        .pointer("/candidates/0/groundingMetadata/groundingChunks")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    chunks
        .iter()
        .filter_map(|chunk| {
            let web = chunk.get("web")?;
            let uri = web.get("uri").and_then(Value::as_str)?.trim();
            if uri.is_empty() || !seen.insert(uri.to_string()) {
                return None;
            }
            let title = web
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            Some(GroundingSource {
                uri: uri.to_string(),
                title,
            })
        })
        .collect()
}

/// Turn a raw response into the parsed object plus its citations.
pub fn read_generation(response: &Value) -> Result<Generation, GeminiError> {
    let text = extract_text(response).ok_or(GeminiError::EmptyResponse)?;
    let payload = parse_model_json(&text)?;
    if !payload.is_object() {
        return Err(GeminiError::InvalidJson);
    }
    Ok(Generation {
        payload,
        grounding: grounding_sources(response),
    })
}

// =============================================================================
// Prompts
// =============================================================================

pub fn analysis_prompt(query: &str) -> String {
    format!(
        "You are a crypto security analyst. Analyze the token at \"{query}\" using ONLY the \
         results of the provided Google Search tool. Respond with a JSON object with these keys: \
         tokenName, overallScore (0-100, higher is riskier), summary, onChainAnalysis, \
         offChainIntelligence, socialSentiment, institutionalInterest, and sources. Each analysis \
         array holds objects with \"finding\" and \"severity\" (Low|Medium|High|Critical). \
         sources is an array of {{\"title\", \"url\"}}. If the address is invalid or is not a \
         token, say so in the summary and return overallScore 100. Return ONLY valid JSON with \
         the described shape."
    )
}

pub fn newsletter_prompt(focus: Option<&str>) -> String {
    let focus_line = focus
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| format!("Focus on {f}. "))
        .unwrap_or_default();

    format!(
        r#"You are "Risky Kristy", a cryptocurrency threat analyst writing this week's Scam Watch briefing.
{focus_line}Use Google Search to find the three most urgent and newsworthy crypto scam developments from the last 10 days.
Return ONLY valid JSON with this structure:
{{
  "headline": "catchy weekly headline",
  "summary": "2-3 sentence overview for the newsletter intro",
  "insights": [
    {{
      "title": "descriptive scam title",
      "summary": "how the scam operates and who it targets",
      "howToAvoid": "actionable defensive guidance",
      "threatLevel": "High" | "Medium" | "Low"
    }}
  ],
  "sources": [
    {{ "uri": "URL reference", "title": "human readable title" }}
  ]
}}
The JSON must parse with no trailing prose. Threat levels must match the severity of each scam."#
    )
}
