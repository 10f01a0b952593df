//! Account scanner.
//!
//! Enumerates an owner's token accounts and returns the ones whose rent
//! deposit can be reclaimed: zero token balance, with lamports above the
//! rent-exempt minimum by more than the configured dust floor.
//!
//! Per-account lookups fan out on a bounded number of in-flight requests.
//! The bound exists to protect the upstream RPC endpoint, not just this
//! process: public endpoints rate-limit, and an unbounded fan-out turns a
//! large wallet into a self-inflicted outage.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::account::{AccountSummary, ScanReport};
use crate::client::{is_valid_pubkey, ChainClient, TokenAccountRef};
use crate::config::RecoveryConfig;
use crate::error::RecoveryError;

/// Label substituted when mint symbol resolution fails.
pub const UNKNOWN_TOKEN: &str = "unknown";

/// Per-account evaluation result.
///
/// Soft failures are an explicit variant rather than a swallowed error so
/// the aggregate can count them and flip the report's partial flag.
enum AccountEvaluation {
    Reclaimable(AccountSummary),
    NotReclaimable,
    Skipped,
}

/// Scans an owner's token accounts for reclaimable rent deposits.
pub struct AccountScanner {
    client: Arc<dyn ChainClient>,
    rent_exempt_lamports: u64,
    dust_floor_lamports: u64,
    concurrency: usize,
}

impl AccountScanner {
    pub fn new(client: Arc<dyn ChainClient>, config: &RecoveryConfig) -> Self {
        Self {
            client,
            rent_exempt_lamports: config.rent_exempt_lamports,
            dust_floor_lamports: config.dust_floor_lamports,
            concurrency: config.scan_concurrency.max(1),
        }
    }

    /// Scan all token accounts owned by `owner`.
    ///
    /// Fails with [`RecoveryError::InvalidAddress`] before any remote call,
    /// or [`RecoveryError::ChainUnavailable`] when enumeration itself
    /// fails. Per-account lookup failures never abort the scan: the
    /// affected accounts are skipped and the report is marked partial.
    pub async fn scan(&self, owner: &str) -> Result<ScanReport, RecoveryError> {
        if !is_valid_pubkey(owner) {
            return Err(RecoveryError::InvalidAddress(owner.to_string()));
        }

        let accounts = self.client.list_token_accounts(owner).await?;
        let accounts_seen = accounts.len() as u64;

        tracing::info!("Scanning {} token accounts for owner {}", accounts_seen, owner);

        // One timestamp for the whole scan; every summary carries it.
        let observed_at = chrono::Utc::now().to_rfc3339();

        let evaluations: Vec<AccountEvaluation> = stream::iter(accounts)
            .map(|account| {
                let observed_at = observed_at.clone();
                async move { self.evaluate_account(account, observed_at).await }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summaries = Vec::new();
        let mut accounts_skipped = 0u64;

        for evaluation in evaluations {
            match evaluation {
                AccountEvaluation::Reclaimable(summary) => summaries.push(summary),
                AccountEvaluation::NotReclaimable => {}
                AccountEvaluation::Skipped => accounts_skipped += 1,
            }
        }

        // Completion order of the concurrent lookups is arbitrary; the
        // ordering contract comes from this sort alone.
        summaries.sort_by(|a, b| b.reclaimable_lamports.cmp(&a.reclaimable_lamports));

        if accounts_skipped > 0 {
            tracing::warn!(
                "Scan for {} is partial: {}/{} accounts skipped",
                owner,
                accounts_skipped,
                accounts_seen
            );
        }

        Ok(ScanReport {
            summaries,
            partial: accounts_skipped > 0,
            accounts_seen,
            accounts_skipped,
        })
    }

    /// Evaluate one token account. Lookup failures degrade to `Skipped`.
    async fn evaluate_account(
        &self,
        account: TokenAccountRef,
        observed_at: String,
    ) -> AccountEvaluation {
        let (lamports, token_balance) = tokio::join!(
            self.client.get_lamports(&account.address),
            self.client.get_token_balance(&account.address),
        );

        let lamports = match lamports {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!("Skipping {}: balance lookup failed: {}", account.address, e);
                return AccountEvaluation::Skipped;
            }
        };

        let token_balance = match token_balance {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(
                    "Skipping {}: token balance lookup failed: {}",
                    account.address,
                    e
                );
                return AccountEvaluation::Skipped;
            }
        };

        if token_balance != 0.0 {
            return AccountEvaluation::NotReclaimable;
        }

        if lamports <= self.rent_exempt_lamports + self.dust_floor_lamports {
            return AccountEvaluation::NotReclaimable;
        }

        let reclaimable_lamports = lamports - self.rent_exempt_lamports;

        // Symbol resolution is cosmetic and must never block inclusion.
        let token_identifier = match self.client.get_token_symbol(&account.mint).await {
            Ok(symbol) => symbol,
            Err(e) => {
                tracing::debug!("No symbol for mint {}: {}", account.mint, e);
                UNKNOWN_TOKEN.to_string()
            }
        };

        tracing::debug!(
            "Reclaimable account {}: {} lamports ({})",
            account.address,
            reclaimable_lamports,
            token_identifier
        );

        AccountEvaluation::Reclaimable(AccountSummary::new(
            account.address,
            reclaimable_lamports,
            token_identifier,
            observed_at,
        ))
    }
}
