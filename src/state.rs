// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{AdminAllowlist, IdentityError, IdentityProvider, JwtVerifier, SupabaseAuth};
use crate::config::AppConfig;
use crate::providers::{
    EtherscanClient, EtherscanError, GeminiClient, GeminiError, GenerativeModel, Mailer,
    PayPalClient, PayPalError, PaymentProvider, ResendClient, ResendError, TokenDataSource,
};
use crate::storage::{InMemoryStore, StorageError, Store, SupabaseStore};

/// Shared handles for every request.
///
/// Third-party clients are optional: when a key is missing the client is
/// `None` and the endpoints that need it answer with a configuration error.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub token_data: Option<Arc<dyn TokenDataSource>>,
    pub payments: Option<Arc<dyn PaymentProvider>>,
    pub model: Option<Arc<dyn GenerativeModel>>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub admins: Arc<AdminAllowlist>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Etherscan(#[from] EtherscanError),
    #[error(transparent)]
    PayPal(#[from] PayPalError),
    #[error(transparent)]
    Gemini(#[from] GeminiError),
    #[error(transparent)]
    Resend(#[from] ResendError),
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            identity: None,
            token_data: None,
            payments: None,
            model: None,
            mailer: None,
            admins: Arc::new(AdminAllowlist::default()),
        }
    }

    /// Build every configured client.
    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        let mut state = match &config.supabase {
            Some(supabase) => {
                let identity: Arc<dyn IdentityProvider> = match &supabase.jwt_secret {
                    Some(secret) => {
                        info!("Verifying access tokens locally (HS256)");
                        Arc::new(JwtVerifier::new(secret))
                    }
                    None => {
                        info!("Verifying access tokens with Supabase Auth");
                        Arc::new(SupabaseAuth::new(supabase)?)
                    }
                };
                Self::new(Arc::new(SupabaseStore::new(supabase)?)).with_identity(identity)
            }
            None => {
                warn!("No Supabase project configured: in-memory store, authentication disabled");
                Self::new(Arc::new(InMemoryStore::new()))
            }
        };

        if let Some(etherscan) = &config.etherscan {
            state = state.with_token_data(Arc::new(EtherscanClient::new(etherscan)?));
        }
        if let Some(paypal) = &config.paypal {
            state = state.with_payments(Arc::new(PayPalClient::new(paypal)?));
        }
        if let Some(gemini) = &config.gemini {
            state = state.with_model(Arc::new(GeminiClient::new(gemini)?));
        }
        if let Some(resend) = &config.resend {
            state = state.with_mailer(Arc::new(ResendClient::new(resend)?));
        }

        if config.newsletter_admins.is_empty() {
            warn!("NEWSLETTER_ADMIN_EMAILS is empty; newsletter admin endpoints will answer 403");
        }
        Ok(state.with_admins(AdminAllowlist::new(&config.newsletter_admins)))
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_token_data(mut self, token_data: Arc<dyn TokenDataSource>) -> Self {
        self.token_data = Some(token_data);
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentProvider>) -> Self {
        self.payments = Some(payments);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn GenerativeModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_admins(mut self, admins: AdminAllowlist) -> Self {
        self.admins = Arc::new(admins);
        self
    }

    /// Which integrations are wired up, for the readiness probe.
    pub fn integrations(&self) -> [(&'static str, bool); 5] {
        [
            ("identity", self.identity.is_some()),
            ("etherscan", self.token_data.is_some()),
            ("paypal", self.payments.is_some()),
            ("gemini", self.model.is_some()),
            ("resend", self.mailer.is_some()),
        ]
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }
}
