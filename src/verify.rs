//! Verification result types.

use serde::{Deserialize, Serialize};

use crate::account::lamports_to_sol;

/// Terminal status of one verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyStatus {
    /// The transaction executed and moved a positive amount to the
    /// configured recipient.
    ConfirmedMatch,

    /// The transaction exists but either failed on-chain or moved nothing
    /// to the recipient.
    ConfirmedNoMatch,

    /// The chain has no finalized transaction for this signature. A valid
    /// answer, not an error.
    NotFound,

    /// The chain could not be consulted. The verifier itself surfaces this
    /// condition as an error; the status value exists so callers that
    /// persist outcomes can record it.
    ChainError,
}

/// Outcome of verifying one claimed payout transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// The transaction signature that was checked (base58)
    pub signature_id: String,

    pub status: VerifyStatus,

    /// Measured lamports received by the recipient. `None` when no
    /// measurement was possible (missing or failed transaction).
    pub observed_lamports: Option<u64>,

    /// Measured amount in SOL, derived for display
    pub observed_sol: Option<f64>,

    /// Block time of the transaction (Unix seconds), when reported
    pub block_time: Option<i64>,
}

impl VerificationOutcome {
    pub fn new(
        signature_id: String,
        status: VerifyStatus,
        observed_lamports: Option<u64>,
        block_time: Option<i64>,
    ) -> Self {
        Self {
            signature_id,
            status,
            observed_lamports,
            observed_sol: observed_lamports.map(lamports_to_sol),
            block_time,
        }
    }

    /// Outcome recording that the chain was unreachable, for callers that
    /// persist verification attempts.
    pub fn chain_error(signature_id: String) -> Self {
        Self::new(signature_id, VerifyStatus::ChainError, None, None)
    }

    /// Convert to pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sol_derivation() {
        let outcome = VerificationOutcome::new(
            "sig".to_string(),
            VerifyStatus::ConfirmedMatch,
            Some(20_000_000),
            Some(1_700_000_000),
        );
        assert_eq!(outcome.observed_sol, Some(0.02));
    }

    #[test]
    fn test_status_serialization() {
        let outcome = VerificationOutcome::new("sig".to_string(), VerifyStatus::NotFound, None, None);
        let json = outcome.to_json_pretty();
        assert!(json.contains("\"status\": \"NOT_FOUND\""));
        assert!(json.contains("\"observed_lamports\": null"));
    }
}
