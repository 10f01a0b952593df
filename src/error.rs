//! Error taxonomy for the recovery core.
//!
//! Only two kinds of condition are errors here: malformed caller input and
//! an unreachable chain endpoint. Domain outcomes such as "transaction not
//! found" or "no qualifying transfer" are ordinary results, and a scan that
//! lost individual accounts reports that through the `partial` flag on its
//! report, not through an error.

use thiserror::Error;

use crate::client::ClientError;

/// Errors returned by the scanner, cache, and verifier entry points.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// The owner address is not syntactically valid base58 for a 32-byte
    /// public key. No remote call was made.
    #[error("invalid owner address: {0}")]
    InvalidAddress(String),

    /// The transaction signature is not syntactically valid base58 for a
    /// 64-byte signature. No remote call was made.
    #[error("invalid transaction signature: {0}")]
    InvalidSignature(String),

    /// The chain endpoint could not be reached or returned an unusable
    /// response. Transient; the caller decides whether to retry.
    #[error("chain endpoint unavailable: {0}")]
    ChainUnavailable(#[from] ClientError),
}

impl RecoveryError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RecoveryError::ChainUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transience() {
        assert!(!RecoveryError::InvalidAddress("abc".to_string()).is_transient());
        assert!(
            RecoveryError::ChainUnavailable(ClientError::Malformed("no result".to_string()))
                .is_transient()
        );
    }
}
