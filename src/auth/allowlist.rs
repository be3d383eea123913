// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Newsletter admin allow-list.

/// Emails allowed to generate, publish and send newsletters.
///
/// Matching is case-insensitive and ignores surrounding whitespace. A user
/// without an email is never an admin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowlist {
    emails: Vec<String>,
}

impl AdminAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for email in emails {
            let email = email.as_ref().trim().to_lowercase();
            if !email.is_empty() && !normalized.contains(&email) {
                normalized.push(email);
            }
        }
        Self { emails: normalized }
    }

    pub fn is_admin(&self, email: Option<&str>) -> bool {
        let Some(email) = email.map(|e| e.trim().to_lowercase()) else {
            return false;
        };
        !email.is_empty() && self.emails.contains(&email)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
