// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Entitlement gate: decides whether gated product UI shows the paywall.

use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::{Entitlement, EntitlementStatus};

/// Product id of the Scam Likely subscription.
pub const SCAM_LIKELY_PRODUCT_ID: &str = "scam_likely";

/// Product tag recorded on AI-assisted scans.
pub const SCAM_LIKELY_AI_PRODUCT_ID: &str = "scam_likely_ai";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    /// Paid up, or in the payment grace period.
    Active,
    /// Subscription approved but not yet confirmed by the provider.
    Pending,
    /// The user never subscribed.
    None,
    /// Revoked, expired or unrecognised status.
    Inactive,
}

impl AccessStatus {
    pub fn grants_access(&self) -> bool {
        matches!(self, AccessStatus::Active)
    }
}

/// `past_due` keeps access: a denied renewal is retried by the provider and
/// only a cancellation, suspension or expiry revokes the entitlement.
pub fn access_status(entitlement: Option<&Entitlement>) -> AccessStatus {
    match entitlement.map(|e| &e.status) {
        None => AccessStatus::None,
        Some(EntitlementStatus::Active | EntitlementStatus::PastDue) => AccessStatus::Active,
        Some(EntitlementStatus::Pending) => AccessStatus::Pending,
        Some(EntitlementStatus::Revoked | EntitlementStatus::Unknown) => AccessStatus::Inactive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: EntitlementStatus) -> Entitlement {
        Entitlement {
            id: "ent-1".to_string(),
            user_id: "user-1".to_string(),
            product: SCAM_LIKELY_PRODUCT_ID.to_string(),
            status,
            provider: None,
            payment_reference: None,
            activated_at: None,
            expires_at: None,
            metadata: None,
        }
    }

    #[test]
    fn gate_maps_every_status() {
        let cases = [
            (EntitlementStatus::Active, AccessStatus::Active),
            (EntitlementStatus::PastDue, AccessStatus::Active),
            (EntitlementStatus::Pending, AccessStatus::Pending),
            (EntitlementStatus::Revoked, AccessStatus::Inactive),
            (EntitlementStatus::Unknown, AccessStatus::Inactive),
        ];
        for (status, expected) in cases {
            let row = with_status(status.clone());
            assert_eq!(access_status(Some(&row)), expected, "{status:?}");
        }
    }

    #[test]
    fn missing_row_is_none() {
        assert_eq!(access_status(None), AccessStatus::None);
        assert!(!AccessStatus::None.grants_access());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(AccessStatus::Inactive).unwrap(), "inactive");
        assert_eq!(serde_json::to_value(AccessStatus::None).unwrap(), "none");
    }
}
