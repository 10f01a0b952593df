//! Payout transaction verifier.
//!
//! Checks whether a claimed payout transaction actually moved funds to the
//! configured recipient. The verifier is an oracle, not a policy layer: it
//! measures the amount from chain data and reports it; the caller's
//! expected amount is advisory and never trusted or echoed back.

use std::sync::Arc;

use crate::account::lamports_to_sol;
use crate::client::{is_valid_signature, ChainClient};
use crate::config::RecoveryConfig;
use crate::error::RecoveryError;
use crate::verify::{VerificationOutcome, VerifyStatus};

/// Tolerance for comparing a caller's expected SOL amount to the measured
/// amount, used only for the advisory mismatch log.
const EXPECTED_TOLERANCE_SOL: f64 = 1e-9;

pub struct TransactionVerifier {
    client: Arc<dyn ChainClient>,
    recipient: String,
}

impl TransactionVerifier {
    pub fn new(client: Arc<dyn ChainClient>, config: &RecoveryConfig) -> Self {
        Self {
            client,
            recipient: config.recipient_address.clone(),
        }
    }

    /// Verify one claimed payout transaction.
    ///
    /// Single pass, no retries. "Transaction does not exist" and
    /// "transaction moved nothing to the recipient" are terminal outcomes,
    /// not errors; only malformed input and an unreachable chain fail the
    /// call.
    pub async fn verify(
        &self,
        signature: &str,
        expected_sol: Option<f64>,
    ) -> Result<VerificationOutcome, RecoveryError> {
        if !is_valid_signature(signature) {
            return Err(RecoveryError::InvalidSignature(signature.to_string()));
        }

        let record = match self.client.get_transaction(signature).await? {
            Some(record) => record,
            None => {
                tracing::info!("No finalized transaction for signature {}", signature);
                return Ok(VerificationOutcome::new(
                    signature.to_string(),
                    VerifyStatus::NotFound,
                    None,
                    None,
                ));
            }
        };

        // The transaction ran and failed on-chain. That is a reportable
        // answer about the claim, not a chain problem.
        if let Some(err) = &record.err {
            tracing::info!("Transaction {} failed on-chain: {}", signature, err);
            return Ok(VerificationOutcome::new(
                signature.to_string(),
                VerifyStatus::ConfirmedNoMatch,
                None,
                record.block_time,
            ));
        }

        let observed_lamports = record.received_by(&self.recipient).unwrap_or(0);

        if let Some(expected) = expected_sol {
            let observed_sol = lamports_to_sol(observed_lamports);
            if (observed_sol - expected).abs() > EXPECTED_TOLERANCE_SOL {
                tracing::warn!(
                    "Measured amount for {} differs from caller expectation: observed {} SOL, expected {} SOL",
                    signature,
                    observed_sol,
                    expected
                );
            }
        }

        let status = if observed_lamports > 0 {
            VerifyStatus::ConfirmedMatch
        } else {
            VerifyStatus::ConfirmedNoMatch
        };

        Ok(VerificationOutcome::new(
            signature.to_string(),
            status,
            Some(observed_lamports),
            record.block_time,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockChainClient;
    use crate::client::TransactionRecord;

    const RECIPIENT: &str = "11111111111111111111111111111111";

    fn valid_sig() -> String {
        "1".repeat(64)
    }

    fn verifier_with(client: MockChainClient) -> TransactionVerifier {
        let config = RecoveryConfig {
            recipient_address: RECIPIENT.to_string(),
            ..Default::default()
        };
        TransactionVerifier::new(Arc::new(client), &config)
    }

    fn transfer_record(recipient_delta: u64) -> TransactionRecord {
        TransactionRecord {
            account_keys: vec!["payer".to_string(), RECIPIENT.to_string()],
            pre_balances: vec![100_000_000, 500_000],
            post_balances: vec![100_000_000 - recipient_delta, 500_000 + recipient_delta],
            err: None,
            block_time: Some(1_700_000_000),
        }
    }

    #[tokio::test]
    async fn test_not_found_is_an_outcome() {
        let verifier = verifier_with(MockChainClient::default());

        let outcome = verifier.verify(&valid_sig(), Some(0.05)).await.unwrap();
        assert_eq!(outcome.status, VerifyStatus::NotFound);
        assert_eq!(outcome.observed_lamports, None);
    }

    #[tokio::test]
    async fn test_invalid_signature_rejected_without_lookup() {
        let verifier = verifier_with(MockChainClient::default());

        let err = verifier.verify("sig-not-found", None).await.unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidSignature(_)));
    }

    #[tokio::test]
    async fn test_failed_transaction_is_no_match_with_null_amount() {
        let sig = valid_sig();
        let record = TransactionRecord {
            err: Some("InstructionError".to_string()),
            ..transfer_record(20_000_000)
        };
        let verifier = verifier_with(MockChainClient::default().with_transaction(&sig, record));

        let outcome = verifier.verify(&sig, None).await.unwrap();
        assert_eq!(outcome.status, VerifyStatus::ConfirmedNoMatch);
        assert_eq!(outcome.observed_lamports, None);
        assert_eq!(outcome.block_time, Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_measured_amount_wins_over_expected() {
        // Chain shows 0.02 SOL received; caller claims 0.05
        let sig = valid_sig();
        let verifier = verifier_with(
            MockChainClient::default().with_transaction(&sig, transfer_record(20_000_000)),
        );

        let outcome = verifier.verify(&sig, Some(0.05)).await.unwrap();
        assert_eq!(outcome.status, VerifyStatus::ConfirmedMatch);
        assert_eq!(outcome.observed_lamports, Some(20_000_000));
        assert_eq!(outcome.observed_sol, Some(0.02));
    }

    #[tokio::test]
    async fn test_no_transfer_to_recipient() {
        let sig = valid_sig();
        let record = TransactionRecord {
            account_keys: vec!["payer".to_string(), "someone-else".to_string()],
            pre_balances: vec![100_000_000, 0],
            post_balances: vec![80_000_000, 20_000_000],
            err: None,
            block_time: Some(1_700_000_000),
        };
        let verifier = verifier_with(MockChainClient::default().with_transaction(&sig, record));

        let outcome = verifier.verify(&sig, None).await.unwrap();
        assert_eq!(outcome.status, VerifyStatus::ConfirmedNoMatch);
        assert_eq!(outcome.observed_lamports, Some(0));
    }

    #[tokio::test]
    async fn test_chain_failure_is_an_error() {
        let client = MockChainClient::default();
        client
            .fail_transactions
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let verifier = verifier_with(client);

        let err = verifier.verify(&valid_sig(), None).await.unwrap_err();
        assert!(matches!(err, RecoveryError::ChainUnavailable(_)));
    }

    #[tokio::test]
    async fn test_reverification_is_consistent() {
        let sig = valid_sig();
        let verifier = verifier_with(
            MockChainClient::default().with_transaction(&sig, transfer_record(20_000_000)),
        );

        let first = verifier.verify(&sig, None).await.unwrap();
        let second = verifier.verify(&sig, None).await.unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.observed_lamports, second.observed_lamports);
    }
}
