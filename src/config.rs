// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! # Runtime Configuration
//!
//! All configuration is read from the environment once at startup. A missing
//! provider key never aborts startup: the dependent client is simply left
//! unconfigured and its endpoints answer with a configuration error.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `SUPABASE_URL` | Supabase project URL (auth + PostgREST) | unset (in-memory store) |
//! | `SUPABASE_SERVICE_ROLE_KEY` | Service-role key for PostgREST and auth | unset |
//! | `SUPABASE_JWT_SECRET` | Verify access tokens locally (HS256) | unset |
//! | `ETHERSCAN_API_KEY` | Etherscan API key | unset |
//! | `ETHERSCAN_API_BASE` | Etherscan endpoint | `https://api.etherscan.io/api` |
//! | `PAYPAL_CLIENT_ID` / `PAYPAL_CLIENT_SECRET` | PayPal REST credentials | unset |
//! | `PAYPAL_WEBHOOK_ID` | Webhook id used for signature verification | unset |
//! | `PAYPAL_API_BASE` | PayPal REST endpoint | `https://api-m.paypal.com` |
//! | `GEMINI_API_KEY` | Google generative language API key | unset |
//! | `GEMINI_MODEL` | Model name | `gemini-2.5-flash` |
//! | `GEMINI_API_BASE` | Generative language endpoint | `https://generativelanguage.googleapis.com/v1beta` |
//! | `RESEND_API_KEY` / `RESEND_FROM_EMAIL` | Resend credentials and sender | unset |
//! | `RESEND_API_BASE` | Resend endpoint | `https://api.resend.com` |
//! | `NEWSLETTER_ADMIN_EMAILS` | Comma separated newsletter admin emails | empty |

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
pub const DEFAULT_ETHERSCAN_API_BASE: &str = "https://api.etherscan.io/api";
pub const DEFAULT_PAYPAL_API_BASE: &str = "https://api-m.paypal.com";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_RESEND_API_BASE: &str = "https://api.resend.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("PORT must be a number between 1 and 65535, got {0:?}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EtherscanConfig {
    pub api_key: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub webhook_id: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    pub from_email: String,
    pub api_base: String,
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsConfig>,
    pub log_format: LogFormat,
    pub supabase: Option<SupabaseConfig>,
    pub etherscan: Option<EtherscanConfig>,
    pub paypal: Option<PayPalConfig>,
    pub gemini: Option<GeminiConfig>,
    pub resend: Option<ResendConfig>,
    /// Lower-cased newsletter admin emails.
    pub newsletter_admins: Vec<String>,
    /// Degraded-mode notices collected while reading the environment. Logged
    /// by the binary once tracing is up.
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: None,
            log_format: LogFormat::Pretty,
            supabase: None,
            etherscan: None,
            paypal: None,
            gemini: None,
            resend: None,
            newsletter_admins: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut warnings = Vec::new();
        let mut warn = |message: &str| warnings.push(message.to_string());

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get("PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => return Err(ConfigError::InvalidPort(raw)),
            },
            None => DEFAULT_PORT,
        };

        let tls = match (get("TLS_CERT_PATH"), get("TLS_KEY_PATH")) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path,
                key_path,
            }),
            (None, None) => None,
            _ => {
                warn("TLS_CERT_PATH and TLS_KEY_PATH must both be set; serving plain HTTP");
                None
            }
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_role_key)) => Some(SupabaseConfig {
                url: validate_url("SUPABASE_URL", &url)?,
                service_role_key,
                jwt_secret: get("SUPABASE_JWT_SECRET"),
            }),
            _ => {
                warn("SUPABASE_URL or SUPABASE_SERVICE_ROLE_KEY is not set; using the in-memory store");
                None
            }
        };

        let etherscan = match get("ETHERSCAN_API_KEY") {
            Some(api_key) => Some(EtherscanConfig {
                api_key,
                api_base: validate_url(
                    "ETHERSCAN_API_BASE",
                    &get("ETHERSCAN_API_BASE")
                        .unwrap_or_else(|| DEFAULT_ETHERSCAN_API_BASE.to_string()),
                )?,
            }),
            None => {
                warn("ETHERSCAN_API_KEY is not set; token lookups are disabled");
                None
            }
        };

        let paypal = match (get("PAYPAL_CLIENT_ID"), get("PAYPAL_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(PayPalConfig {
                client_id,
                client_secret,
                webhook_id: get("PAYPAL_WEBHOOK_ID"),
                api_base: validate_url(
                    "PAYPAL_API_BASE",
                    &get("PAYPAL_API_BASE").unwrap_or_else(|| DEFAULT_PAYPAL_API_BASE.to_string()),
                )?,
            }),
            _ => {
                warn("PAYPAL_CLIENT_ID or PAYPAL_CLIENT_SECRET is not set; subscription endpoints are disabled");
                None
            }
        };

        let gemini = match get("GEMINI_API_KEY") {
            Some(api_key) => Some(GeminiConfig {
                api_key,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base: validate_url(
                    "GEMINI_API_BASE",
                    &get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
                )?,
            }),
            None => {
                warn("GEMINI_API_KEY is not set; AI analysis and newsletter generation are disabled");
                None
            }
        };

        let resend = match (get("RESEND_API_KEY"), get("RESEND_FROM_EMAIL")) {
            (Some(api_key), Some(from_email)) => Some(ResendConfig {
                api_key,
                from_email,
                api_base: validate_url(
                    "RESEND_API_BASE",
                    &get("RESEND_API_BASE").unwrap_or_else(|| DEFAULT_RESEND_API_BASE.to_string()),
                )?,
            }),
            _ => {
                warn("RESEND_API_KEY or RESEND_FROM_EMAIL is not set; newsletter sending is disabled");
                None
            }
        };

        let newsletter_admins = get("NEWSLETTER_ADMIN_EMAILS")
            .map(|raw| parse_email_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            tls,
            log_format,
            supabase,
            etherscan,
            paypal,
            gemini,
            resend,
            newsletter_admins,
            warnings,
        })
    }
}

fn validate_url(name: &'static str, raw: &str) -> Result<String, ConfigError> {
    url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        name,
        reason: e.to_string(),
    })?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_email_list(raw: &str) -> Vec<String> {
    let mut emails: Vec<String> = Vec::new();
    for email in raw.split(',').map(|e| e.trim().to_lowercase()) {
        if !email.is_empty() && !emails.contains(&email) {
            emails.push(email);
        }
    }
    emails
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.supabase.is_none());
        assert!(config.etherscan.is_none());
        assert!(config.paypal.is_none());
        assert!(config.gemini.is_none());
        assert!(config.resend.is_none());
        assert!(config.newsletter_admins.is_empty());
    }

    #[test]
    fn missing_provider_keys_are_reported() {
        let config = config_from(&[]).unwrap();
        for key in [
            "SUPABASE_URL",
            "ETHERSCAN_API_KEY",
            "PAYPAL_CLIENT_ID",
            "GEMINI_API_KEY",
            "RESEND_API_KEY",
        ] {
            assert!(
                config.warnings.iter().any(|w| w.contains(key)),
                "no warning mentions {key}: {:?}",
                config.warnings
            );
        }
    }

    #[test]
    fn fully_configured_environment_reports_nothing() {
        let config = config_from(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "srk"),
            ("ETHERSCAN_API_KEY", "ek"),
            ("PAYPAL_CLIENT_ID", "id"),
            ("PAYPAL_CLIENT_SECRET", "secret"),
            ("GEMINI_API_KEY", "gk"),
            ("RESEND_API_KEY", "rk"),
            ("RESEND_FROM_EMAIL", "news@montecrypto.io"),
        ])
        .unwrap();
        assert!(config.warnings.is_empty(), "{:?}", config.warnings);
    }

    #[test]
    fn blank_values_count_as_absent() {
        let config = config_from(&[("ETHERSCAN_API_KEY", "   "), ("PORT", "")]).unwrap();
        assert!(config.etherscan.is_none());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn provider_defaults_are_applied() {
        let config = config_from(&[
            ("ETHERSCAN_API_KEY", "ek"),
            ("PAYPAL_CLIENT_ID", "id"),
            ("PAYPAL_CLIENT_SECRET", "secret"),
            ("GEMINI_API_KEY", "gk"),
        ])
        .unwrap();

        let etherscan = config.etherscan.unwrap();
        assert_eq!(etherscan.api_base, DEFAULT_ETHERSCAN_API_BASE);

        let paypal = config.paypal.unwrap();
        assert_eq!(paypal.api_base, DEFAULT_PAYPAL_API_BASE);
        assert!(paypal.webhook_id.is_none());

        let gemini = config.gemini.unwrap();
        assert_eq!(gemini.model, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn paypal_requires_both_credentials() {
        let config = config_from(&[("PAYPAL_CLIENT_ID", "id")]).unwrap();
        assert!(config.paypal.is_none());
    }

    #[test]
    fn resend_requires_sender_address() {
        let config = config_from(&[("RESEND_API_KEY", "rk")]).unwrap();
        assert!(config.resend.is_none());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = config_from(&[
            ("ETHERSCAN_API_KEY", "ek"),
            ("ETHERSCAN_API_BASE", "not a url"),
        ]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidUrl {
                name: "ETHERSCAN_API_BASE",
                ..
            })
        ));
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(matches!(
            config_from(&[("PORT", "http")]),
            Err(ConfigError::InvalidPort(_))
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_urls() {
        let config = config_from(&[
            ("SUPABASE_URL", "https://project.supabase.co/"),
            ("SUPABASE_SERVICE_ROLE_KEY", "srk"),
        ])
        .unwrap();
        assert_eq!(config.supabase.unwrap().url, "https://project.supabase.co");
    }

    #[test]
    fn admin_list_is_lowercased_and_deduplicated() {
        let config = config_from(&[(
            "NEWSLETTER_ADMIN_EMAILS",
            "Editor@Example.com, editor@example.com,,ops@example.com",
        )])
        .unwrap();
        assert_eq!(
            config.newsletter_admins,
            vec!["editor@example.com", "ops@example.com"]
        );
    }

    #[test]
    fn tls_requires_both_paths() {
        let config = config_from(&[("TLS_CERT_PATH", "/tls/cert.pem")]).unwrap();
        assert!(config.tls.is_none());
        assert!(config.warnings.iter().any(|w| w.contains("TLS_KEY_PATH")));

        let config = config_from(&[
            ("TLS_CERT_PATH", "/tls/cert.pem"),
            ("TLS_KEY_PATH", "/tls/key.pem"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.tls.unwrap().key_path, "/tls/key.pem");
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
