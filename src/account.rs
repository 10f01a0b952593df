//! Scan result types.

use serde::{Deserialize, Serialize};

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert a lamport quantity to SOL for display.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Why an account was judged reclaimable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// Token balance is zero and the rent deposit exceeds the rent-exempt
    /// minimum by more than the dust floor.
    ZeroBalanceRent,
}

/// A token account holding reclaimable rent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Token account address (base58)
    pub account_address: String,

    /// Reclaimable deposit in lamports, always > 0
    pub reclaimable_lamports: u64,

    /// Reclaimable deposit in SOL, derived for display
    pub reclaimable_sol: f64,

    /// Best-effort token label; "unknown" when lookup fails
    pub token_identifier: String,

    /// Why this account qualifies
    pub reason_code: ReasonCode,

    /// Timestamp of the producing scan (ISO 8601)
    pub observed_at: String,
}

impl AccountSummary {
    pub fn new(
        account_address: String,
        reclaimable_lamports: u64,
        token_identifier: String,
        observed_at: String,
    ) -> Self {
        Self {
            account_address,
            reclaimable_lamports,
            reclaimable_sol: lamports_to_sol(reclaimable_lamports),
            token_identifier,
            reason_code: ReasonCode::ZeroBalanceRent,
            observed_at,
        }
    }
}

/// Aggregate result of one owner scan.
///
/// `partial` distinguishes "nothing reclaimable" from "some accounts could
/// not be evaluated": a report with zero summaries and `partial = true`
/// must not be read as a clean empty result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Reclaimable accounts, sorted by reclaimable_lamports descending
    pub summaries: Vec<AccountSummary>,

    /// True when at least one per-account lookup soft-failed
    pub partial: bool,

    /// Token accounts enumerated for the owner
    pub accounts_seen: u64,

    /// Accounts skipped because their balance lookups failed
    pub accounts_skipped: u64,
}

impl ScanReport {
    /// Total reclaimable lamports across all summaries.
    pub fn total_reclaimable_lamports(&self) -> u64 {
        self.summaries.iter().map(|s| s.reclaimable_lamports).sum()
    }

    /// Convert to pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
