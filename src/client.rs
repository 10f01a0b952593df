//! Chain data client.
//!
//! The scanner and verifier consume chain state through the [`ChainClient`]
//! trait; [`RpcChainClient`] implements it against Solana's JSON-RPC
//! interface over plain HTTP POST. All requests share one `reqwest::Client`
//! carrying the configured timeout, and each call is tried against the
//! configured endpoints in order until one answers.

use async_trait::async_trait;
use serde_json::json;

use crate::config::RecoveryConfig;

/// SPL Token program ID, owner of all standard token accounts.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Failures surfaced by the chain data client.
///
/// "Not found" is never an error at this layer: lookups that can
/// legitimately miss return `Option` instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (connect, timeout, TLS, decode).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The endpoint answered 200 but the payload is missing expected fields.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A token account enumerated for an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountRef {
    /// Token account address (base58)
    pub address: String,

    /// Mint address of the token the account holds (base58)
    pub mint: String,
}

/// The slice of a finalized transaction the verifier needs: who was
/// involved and how every balance moved.
#[derive(Debug, Clone, Default)]
pub struct TransactionRecord {
    /// Account keys referenced by the transaction message (base58)
    pub account_keys: Vec<String>,

    /// Lamport balances before execution, index-aligned with `account_keys`
    pub pre_balances: Vec<u64>,

    /// Lamport balances after execution, index-aligned with `account_keys`
    pub post_balances: Vec<u64>,

    /// On-chain execution error, if the transaction ran and failed
    pub err: Option<String>,

    /// Block time (Unix seconds), when the node reports one
    pub block_time: Option<i64>,
}

impl TransactionRecord {
    /// Lamports received by `recipient` in this transaction.
    ///
    /// Returns `None` when the recipient does not appear in the
    /// transaction's account keys (or the balance arrays are inconsistent),
    /// which callers treat the same as a zero delta.
    pub fn received_by(&self, recipient: &str) -> Option<u64> {
        let index = self.account_keys.iter().position(|k| k == recipient)?;
        let pre = self.pre_balances.get(index)?;
        let post = self.post_balances.get(index)?;
        Some(post.saturating_sub(*pre))
    }
}

/// Read-only view of chain state consumed by the scanner and verifier.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Enumerate all SPL token accounts owned by `owner`.
    async fn list_token_accounts(&self, owner: &str) -> Result<Vec<TokenAccountRef>, ClientError>;

    /// Current lamport balance of an account.
    async fn get_lamports(&self, account: &str) -> Result<u64, ClientError>;

    /// Token balance of a token account, in UI units.
    async fn get_token_balance(&self, account: &str) -> Result<f64, ClientError>;

    /// Best-effort human label for a mint. Failure is expected and callers
    /// must degrade gracefully.
    async fn get_token_symbol(&self, mint: &str) -> Result<String, ClientError>;

    /// Fetch a finalized transaction. `Ok(None)` means the chain has no
    /// record of the signature, which is a legitimate answer.
    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, ClientError>;
}

/// Check that a string is valid base58 for a 32-byte public key.
pub fn is_valid_pubkey(address: &str) -> bool {
    matches!(bs58::decode(address).into_vec(), Ok(bytes) if bytes.len() == 32)
}

/// Check that a string is valid base58 for a 64-byte signature.
pub fn is_valid_signature(signature: &str) -> bool {
    matches!(bs58::decode(signature).into_vec(), Ok(bytes) if bytes.len() == 64)
}

/// JSON-RPC implementation of [`ChainClient`].
pub struct RpcChainClient {
    client: reqwest::Client,
    endpoints: Vec<String>,
    token_meta_url: Option<String>,
}

impl RpcChainClient {
    /// Build a client from configuration.
    pub fn from_config(config: &RecoveryConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.rpc_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoints: config.rpc_endpoints.clone(),
            token_meta_url: config.token_meta_url.clone(),
        })
    }

    /// Issue one JSON-RPC call, trying each endpoint in order on transport
    /// failure, and unwrap the `result` field of the envelope.
    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ClientError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let mut last_transport_err: Option<reqwest::Error> = None;

        for endpoint in &self.endpoints {
            let response = match self.client.post(endpoint).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("RPC endpoint {} unreachable: {}", endpoint, e);
                    last_transport_err = Some(e);
                    continue;
                }
            };

            let envelope: serde_json::Value = response.json().await?;

            if let Some(err) = envelope.get("error") {
                return Err(ClientError::Rpc {
                    code: err.get("code").and_then(|c| c.as_i64()).unwrap_or(0),
                    message: err
                        .get("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                });
            }

            return envelope
                .get("result")
                .cloned()
                .ok_or_else(|| ClientError::Malformed(format!("{}: no result field", method)));
        }

        Err(last_transport_err
            .map(ClientError::Transport)
            .unwrap_or_else(|| ClientError::Malformed("no RPC endpoints configured".to_string())))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn list_token_accounts(&self, owner: &str) -> Result<Vec<TokenAccountRef>, ClientError> {
        let result = self
            .rpc_call(
                "getTokenAccountsByOwner",
                json!([
                    owner,
                    { "programId": TOKEN_PROGRAM_ID },
                    { "encoding": "jsonParsed" }
                ]),
            )
            .await?;

        let entries = result
            .get("value")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ClientError::Malformed("getTokenAccountsByOwner: no value array".to_string())
            })?;

        let mut accounts = Vec::with_capacity(entries.len());

        for entry in entries {
            let address = entry.get("pubkey").and_then(|p| p.as_str());

            let mint = entry
                .get("account")
                .and_then(|a| a.get("data"))
                .and_then(|d| d.get("parsed"))
                .and_then(|p| p.get("info"))
                .and_then(|i| i.get("mint"))
                .and_then(|m| m.as_str());

            match (address, mint) {
                (Some(address), Some(mint)) => accounts.push(TokenAccountRef {
                    address: address.to_string(),
                    mint: mint.to_string(),
                }),
                _ => {
                    // Malformed entries are dropped, not fatal.
                    tracing::debug!("skipping token account entry with missing fields");
                }
            }
        }

        Ok(accounts)
    }

    async fn get_lamports(&self, account: &str) -> Result<u64, ClientError> {
        let result = self.rpc_call("getBalance", json!([account])).await?;

        result
            .get("value")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ClientError::Malformed("getBalance: no value".to_string()))
    }

    async fn get_token_balance(&self, account: &str) -> Result<f64, ClientError> {
        let result = self
            .rpc_call("getTokenAccountBalance", json!([account]))
            .await?;

        let amount = result.get("value").ok_or_else(|| {
            ClientError::Malformed("getTokenAccountBalance: no value".to_string())
        })?;

        // uiAmount is null for some historical responses; fall back to the
        // string form before giving up.
        if let Some(ui) = amount.get("uiAmount").and_then(|u| u.as_f64()) {
            return Ok(ui);
        }

        amount
            .get("uiAmountString")
            .and_then(|s| s.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| ClientError::Malformed("getTokenAccountBalance: no uiAmount".to_string()))
    }

    async fn get_token_symbol(&self, mint: &str) -> Result<String, ClientError> {
        let base = self.token_meta_url.as_deref().ok_or_else(|| {
            ClientError::Malformed("no token metadata endpoint configured".to_string())
        })?;

        let meta: serde_json::Value = self
            .client
            .get(base)
            .query(&[("tokenAddress", mint)])
            .send()
            .await?
            .json()
            .await?;

        meta.get("symbol")
            .or_else(|| meta.get("name"))
            .and_then(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .ok_or_else(|| ClientError::Malformed(format!("no symbol for mint {}", mint)))
    }

    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, ClientError> {
        let result = self
            .rpc_call(
                "getTransaction",
                json!([
                    signature,
                    {
                        "encoding": "json",
                        "commitment": "finalized",
                        "maxSupportedTransactionVersion": 0
                    }
                ]),
            )
            .await?;

        // null result means the chain has no such finalized transaction.
        if result.is_null() {
            return Ok(None);
        }

        let meta = result
            .get("meta")
            .ok_or_else(|| ClientError::Malformed("getTransaction: no meta".to_string()))?;

        let account_keys = result
            .get("transaction")
            .and_then(|t| t.get("message"))
            .and_then(|m| m.get("accountKeys"))
            .and_then(|k| k.as_array())
            .ok_or_else(|| ClientError::Malformed("getTransaction: no accountKeys".to_string()))?
            .iter()
            .filter_map(|k| k.as_str().map(|s| s.to_string()))
            .collect();

        let err = match meta.get("err") {
            Some(e) if !e.is_null() => Some(e.to_string()),
            _ => None,
        };

        Ok(Some(TransactionRecord {
            account_keys,
            pre_balances: lamport_array(meta, "preBalances")?,
            post_balances: lamport_array(meta, "postBalances")?,
            err,
            block_time: result.get("blockTime").and_then(|t| t.as_i64()),
        }))
    }
}

fn lamport_array(meta: &serde_json::Value, field: &str) -> Result<Vec<u64>, ClientError> {
    Ok(meta
        .get(field)
        .and_then(|b| b.as_array())
        .ok_or_else(|| ClientError::Malformed(format!("getTransaction: no {}", field)))?
        .iter()
        .filter_map(|v| v.as_u64())
        .collect())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pubkey_syntax() {
        // 32 '1' characters decode to 32 zero bytes
        assert!(is_valid_pubkey("11111111111111111111111111111111"));
        assert!(!is_valid_pubkey(""));
        assert!(!is_valid_pubkey("not-base58-0OIl"));
        // Valid base58 but wrong length
        assert!(!is_valid_pubkey("abc"));
    }

    #[test]
    fn test_signature_syntax() {
        assert!(is_valid_signature(&"1".repeat(64)));
        assert!(!is_valid_signature(&"1".repeat(32)));
        assert!(!is_valid_signature("sig-not-found"));
    }

    #[test]
    fn test_received_by() {
        let record = TransactionRecord {
            account_keys: vec!["payer".to_string(), "recipient".to_string()],
            pre_balances: vec![5_000_000, 1_000_000],
            post_balances: vec![2_000_000, 3_000_000],
            err: None,
            block_time: Some(1_700_000_000),
        };

        assert_eq!(record.received_by("recipient"), Some(2_000_000));
        // Sender lost funds: delta saturates to zero
        assert_eq!(record.received_by("payer"), Some(0));
        // Unknown key
        assert_eq!(record.received_by("stranger"), None);
    }

    #[test]
    fn test_received_by_inconsistent_balances() {
        let record = TransactionRecord {
            account_keys: vec!["a".to_string(), "b".to_string()],
            pre_balances: vec![100],
            post_balances: vec![100],
            ..Default::default()
        };
        assert_eq!(record.received_by("b"), None);
    }
}
