//! Export quota tiers.
//!
//! A quota is derived from the principal's role on every request; the
//! decision for a given row count is a pure function of that quota.

use serde::Serialize;
use vista_core::{ExportPolicyConfig, Role};

/// Row-count limits applied to one export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuota {
    pub warn_threshold: u64,
    pub max_rows_for_role: u64,
    pub absolute_cap: u64,
}

impl ExportQuota {
    pub fn for_role(policy: &ExportPolicyConfig, role: Role) -> Self {
        Self {
            warn_threshold: policy.warn_threshold,
            max_rows_for_role: policy.limit_for(role),
            absolute_cap: policy.absolute_cap,
        }
    }

    /// Evaluate a freshly counted result size against this quota.
    pub fn check(&self, total_count: u64) -> QuotaCheck {
        let verdict = if total_count > self.absolute_cap {
            QuotaVerdict::TooLarge
        } else if total_count > self.max_rows_for_role {
            QuotaVerdict::QuotaExceeded
        } else if total_count > self.warn_threshold {
            QuotaVerdict::NeedsConfirmation
        } else {
            QuotaVerdict::Allowed
        };

        QuotaCheck {
            total_count,
            needs_warning: total_count > self.warn_threshold,
            exceeds_limit: matches!(verdict, QuotaVerdict::TooLarge | QuotaVerdict::QuotaExceeded),
            verdict,
        }
    }
}

/// Outcome of comparing a row count to a quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaVerdict {
    Allowed,
    /// Allowed once the user confirms the large export.
    NeedsConfirmation,
    /// Above the role's tier limit.
    QuotaExceeded,
    /// Above the absolute cap, whatever the role.
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaCheck {
    pub total_count: u64,
    pub needs_warning: bool,
    pub exceeds_limit: bool,
    #[serde(skip)]
    pub verdict: QuotaVerdict,
}
