// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MonteCrypto

//! Token risk heuristic.
//!
//! A coarse placeholder score: every flag raised against the token metadata
//! adds five points to a base of forty, capped at one hundred. The verdict and
//! the on-screen tier are both derived from that single score.

use serde::Serialize;
use utoipa::ToSchema;

/// Owner reported for contracts whose ownership was renounced or is unknown.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

const BASE_SCORE: u32 = 40;
const POINTS_PER_FLAG: u32 = 5;
const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FlagSeverity {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RiskFlag {
    pub severity: FlagSeverity,
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Verdict {
    #[serde(rename = "High Risk")]
    HighRisk,
    #[serde(rename = "Elevated Risk")]
    ElevatedRisk,
    #[serde(rename = "Guarded")]
    Guarded,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::HighRisk => "High Risk",
            Verdict::ElevatedRisk => "Elevated Risk",
            Verdict::Guarded => "Guarded",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display tier used by the product UI. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum RiskTier {
    Critical,
    High,
    Elevated,
    Guarded,
}

impl RiskTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskTier::Critical
        } else if score >= 65.0 {
            RiskTier::High
        } else if score >= 45.0 {
            RiskTier::Elevated
        } else {
            RiskTier::Guarded
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RiskAssessment {
    pub score: u32,
    pub verdict: Verdict,
    pub flags: Vec<RiskFlag>,
}

/// Metadata the heuristic looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSignals<'a> {
    pub owner: Option<&'a str>,
    pub decimals: Option<u32>,
}

pub fn score_for_flag_count(flag_count: usize) -> u32 {
    let flags = u32::try_from(flag_count).unwrap_or(u32::MAX);
    BASE_SCORE
        .saturating_add(flags.saturating_mul(POINTS_PER_FLAG))
        .min(MAX_SCORE)
}

pub fn verdict_for_score(score: f64) -> Verdict {
    if score >= 70.0 {
        Verdict::HighRisk
    } else if score >= 50.0 {
        Verdict::ElevatedRisk
    } else {
        Verdict::Guarded
    }
}

pub fn assess(signals: TokenSignals<'_>) -> RiskAssessment {
    let mut flags = Vec::new();

    let owner_known = signals
        .owner
        .map(str::trim)
        .is_some_and(|owner| !owner.is_empty() && !owner.eq_ignore_ascii_case(ZERO_ADDRESS));
    if !owner_known {
        flags.push(RiskFlag {
            severity: FlagSeverity::Moderate,
            title: "Ownership unclear".to_string(),
            detail: "Unable to determine contract owner; verify renounce or multi-sig custody."
                .to_string(),
        });
    }

    if signals.decimals.is_none() {
        flags.push(RiskFlag {
            severity: FlagSeverity::Moderate,
            title: "Decimals missing".to_string(),
            detail: "Token decimals not reported; check contract metadata.".to_string(),
        });
    }

    let score = score_for_flag_count(flags.len());
    RiskAssessment {
        score,
        verdict: verdict_for_score(f64::from(score)),
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ownership_flags(assessment: &RiskAssessment) -> usize {
        assessment
            .flags
            .iter()
            .filter(|f| f.title == "Ownership unclear")
            .count()
    }

    #[test]
    fn missing_owner_raises_ownership_flag_once() {
        let assessment = assess(TokenSignals {
            owner: None,
            decimals: Some(18),
        });
        assert_eq!(ownership_flags(&assessment), 1);
        assert_eq!(assessment.flags.len(), 1);
        assert_eq!(assessment.flags[0].severity, FlagSeverity::Moderate);
    }

    #[test]
    fn zero_address_owner_raises_ownership_flag_once() {
        for owner in [ZERO_ADDRESS, "0x0000000000000000000000000000000000000000 ", ""] {
            let assessment = assess(TokenSignals {
                owner: Some(owner),
                decimals: Some(6),
            });
            assert_eq!(ownership_flags(&assessment), 1, "owner {owner:?}");
        }
    }

    #[test]
    fn known_owner_and_decimals_raise_nothing() {
        let assessment = assess(TokenSignals {
            owner: Some("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12"),
            decimals: Some(18),
        });
        assert!(assessment.flags.is_empty());
        assert_eq!(assessment.score, 40);
        assert_eq!(assessment.verdict, Verdict::Guarded);
    }

    #[test]
    fn missing_everything_is_elevated() {
        let assessment = assess(TokenSignals::default());
        assert_eq!(assessment.flags.len(), 2);
        assert_eq!(assessment.score, 50);
        assert_eq!(assessment.verdict, Verdict::ElevatedRisk);
    }

    #[test]
    fn score_stays_within_bounds() {
        for n in 0..=12 {
            let score = score_for_flag_count(n);
            assert!((40..=100).contains(&score), "{n} flags gave {score}");
            assert_eq!(score, (40 + 5 * n as u32).min(100));
        }
        assert_eq!(score_for_flag_count(12), 100);
        assert_eq!(score_for_flag_count(usize::MAX), 100);
    }

    #[test]
    fn verdict_boundaries() {
        assert_eq!(verdict_for_score(70.0), Verdict::HighRisk);
        assert_eq!(verdict_for_score(69.0), Verdict::ElevatedRisk);
        assert_eq!(verdict_for_score(50.0), Verdict::ElevatedRisk);
        assert_eq!(verdict_for_score(49.0), Verdict::Guarded);
        assert_eq!(verdict_for_score(0.0), Verdict::Guarded);
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(RiskTier::from_score(80.0), RiskTier::Critical);
        assert_eq!(RiskTier::from_score(79.0), RiskTier::High);
        assert_eq!(RiskTier::from_score(65.0), RiskTier::High);
        assert_eq!(RiskTier::from_score(64.0), RiskTier::Elevated);
        assert_eq!(RiskTier::from_score(45.0), RiskTier::Elevated);
        assert_eq!(RiskTier::from_score(44.0), RiskTier::Guarded);
    }

    #[test]
    fn verdict_serializes_as_label() {
        let json = serde_json::to_value(Verdict::ElevatedRisk).unwrap();
        assert_eq!(json, "Elevated Risk");
        assert_eq!(Verdict::HighRisk.to_string(), "High Risk");
    }
}
