// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Etherscan token metadata client.
//!
//! Every Etherscan response is wrapped in `{ status, message, result }`.
//! `status` is the string `"1"` on success; anything else carries the reason
//! in `message` (and sometimes in `result`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::EtherscanConfig;

const SUCCESS_STATUS: &str = "1";

#[derive(Debug, thiserror::Error)]
pub enum EtherscanError {
    #[error("Etherscan request failed: {0}")]
    Request(String),

    #[error("Etherscan HTTP {0}")]
    Http(u16),

    #[error("Etherscan error: {0}")]
    Api(String),

    #[error("Etherscan response was invalid: {0}")]
    InvalidResponse(String),
}

/// Result of `module=token&action=tokeninfo`.
///
/// Etherscan reports every field as a string; numbers are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub contract_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token_symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token_decimal: Option<String>,
    #[serde(
        default,
        rename = "type",
        alias = "tokenType",
        deserialize_with = "lenient_string"
    )]
    pub token_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_supply: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub circulating_supply: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_updated: Option<String>,
}

impl TokenInfo {
    /// Decimals as a number. `None` when missing or not numeric.
    pub fn decimals(&self) -> Option<u32> {
        self.token_decimal.as_deref()?.trim().parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TokenHolder {
    pub token_holder_address: String,
    #[serde(deserialize_with = "required_lenient_string")]
    pub token_holder_quantity: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Value,
}

/// Token data lookups used by the scan endpoint.
#[async_trait]
pub trait TokenDataSource: Send + Sync {
    async fn token_info(&self, contract_address: &str) -> Result<Option<TokenInfo>, EtherscanError>;

    /// Raw total supply in base units.
    async fn token_supply(&self, contract_address: &str) -> Result<Option<String>, EtherscanError>;
}

#[derive(Debug, Clone)]
pub struct EtherscanClient {
    api_base: String,
    api_key: String,
    http: Client,
}

impl EtherscanClient {
    pub fn new(config: &EtherscanConfig) -> Result<Self, EtherscanError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| EtherscanError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    fn request(&self, params: &[(&str, String)]) -> RequestBuilder {
        self.http
            .get(&self.api_base)
            .query(params)
            .query(&[("apikey", &self.api_key)])
    }

    /// Issue one API call and return the unwrapped `result`.
    async fn call(&self, params: &[(&str, String)]) -> Result<Value, EtherscanError> {
        debug!(?params, "Etherscan call");
        let response = self
            .request(params)
            .send()
            .await
            .map_err(|e| EtherscanError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EtherscanError::Http(response.status().as_u16()));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| EtherscanError::InvalidResponse(e.to_string()))?;
        unwrap_envelope(envelope)
    }

    /// Top holders of a token, `offset` per page.
    ///
    /// Not part of [`TokenDataSource`]: risk scoring only looks at ownership
    /// and decimals. Kept on the client for library callers such as
    /// back-office jobs that audit holder concentration.
    pub async fn token_holder_list(
        &self,
        contract_address: &str,
        page: u32,
        offset: u32,
    ) -> Result<Vec<TokenHolder>, EtherscanError> {
        let result = self
            .call(&holder_list_params(contract_address, page, offset))
            .await?;
        parse_holders(result)
    }
}

#[async_trait]
impl TokenDataSource for EtherscanClient {
    async fn token_info(&self, contract_address: &str) -> Result<Option<TokenInfo>, EtherscanError> {
        let result = self
            .call(&[
                ("module", "token".to_string()),
                ("action", "tokeninfo".to_string()),
                ("contractaddress", contract_address.to_string()),
            ])
            .await?;
        parse_token_info(result)
    }

    async fn token_supply(&self, contract_address: &str) -> Result<Option<String>, EtherscanError> {
        let result = self
            .call(&[
                ("module", "stats".to_string()),
                ("action", "tokensupply".to_string()),
                ("contractaddress", contract_address.to_string()),
            ])
            .await?;
        Ok(value_to_string(result))
    }
}

fn unwrap_envelope(envelope: Envelope) -> Result<Value, EtherscanError> {
    if envelope.status.as_deref() == Some(SUCCESS_STATUS) {
        return Ok(envelope.result);
    }
    let message = envelope
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "Unknown Etherscan error".to_string());
    Err(EtherscanError::Api(message))
}

/// `tokeninfo` answers with an array; older deployments with a bare object.
fn parse_token_info(result: Value) -> Result<Option<TokenInfo>, EtherscanError> {
    let first = match result {
        Value::Array(items) => items.into_iter().next(),
        Value::Null => None,
        other => Some(other),
    };
    first
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| EtherscanError::InvalidResponse(format!("tokeninfo: {e}")))
}

fn holder_list_params(
    contract_address: &str,
    page: u32,
    offset: u32,
) -> [(&'static str, String); 5] {
    [
        ("module", "token".to_string()),
        ("action", "tokenholderlist".to_string()),
        ("contractaddress", contract_address.to_string()),
        // Etherscan pages are 1-based
        ("page", page.max(1).to_string()),
        ("offset", offset.to_string()),
    ]
}

fn parse_holders(result: Value) -> Result<Vec<TokenHolder>, EtherscanError> {
    match result {
        Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other)
            .map_err(|e| EtherscanError::InvalidResponse(format!("tokenholderlist: {e}"))),
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

fn required_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer)?.ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}
