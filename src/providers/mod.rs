// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! # Third-party API clients
//!
//! | Client | Service | Used by |
//! |--------|---------|---------|
//! | [`EtherscanClient`] | token metadata and supply | `/scam-likely-run` |
//! | [`PayPalClient`] | subscriptions, webhook verification | `/paypal-*` |
//! | [`GeminiClient`] | grounded generation | `/gemini-analysis`, `/newsletter-generate` |
//! | [`ResendClient`] | email delivery | `/newsletter-send` |
//!
//! Each client sits behind a trait so handlers can run against fakes.

pub mod etherscan;
pub mod gemini;
pub mod paypal;
pub mod resend;
pub mod token_cache;

pub use etherscan::{EtherscanClient, EtherscanError, TokenDataSource, TokenInfo};
pub use gemini::{GeminiClient, GeminiError, GenerativeModel};
pub use paypal::{PayPalClient, PayPalError, PaymentProvider, Subscription, WebhookSignatureHeaders};
pub use resend::{Mailer, OutgoingEmail, ResendClient, ResendError};
