//! Configuration for the recovery core.

use serde::{Deserialize, Serialize};

use crate::client::is_valid_pubkey;

/// Recovery core configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// RPC endpoints to connect to (tried in order on transport failure)
    #[serde(default = "default_rpc_endpoints")]
    pub rpc_endpoints: Vec<String>,

    /// Recipient address payout transactions are verified against (base58)
    pub recipient_address: String,

    /// Token metadata endpoint for best-effort symbol lookup; symbol
    /// resolution degrades to "unknown" when unset
    #[serde(default = "default_token_meta_url")]
    pub token_meta_url: Option<String>,

    /// Rent-exempt minimum for an SPL token account, in lamports
    #[serde(default = "default_rent_exempt_lamports")]
    pub rent_exempt_lamports: u64,

    /// Deposits within this many lamports of the rent-exempt minimum are
    /// ignored as dust
    #[serde(default = "default_dust_floor_lamports")]
    pub dust_floor_lamports: u64,

    /// How long a cached scan result stays fresh, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum concurrent per-account balance lookups within one scan
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    /// Timeout for each remote call, in seconds
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
}

fn default_rpc_endpoints() -> Vec<String> {
    vec!["https://api.mainnet-beta.solana.com".to_string()]
}

fn default_token_meta_url() -> Option<String> {
    Some("https://public-api.solscan.io/token/meta".to_string())
}

fn default_rent_exempt_lamports() -> u64 {
    // Rent-exempt minimum for a 165-byte SPL token account
    2_039_280
}

fn default_dust_floor_lamports() -> u64 {
    1_000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_scan_concurrency() -> usize {
    10
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            rpc_endpoints: default_rpc_endpoints(),
            recipient_address: String::new(),
            token_meta_url: default_token_meta_url(),
            rent_exempt_lamports: default_rent_exempt_lamports(),
            dust_floor_lamports: default_dust_floor_lamports(),
            cache_ttl_secs: default_cache_ttl_secs(),
            scan_concurrency: default_scan_concurrency(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
        }
    }
}

impl RecoveryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RecoveryConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_valid_pubkey(&self.recipient_address) {
            anyhow::bail!(
                "recipient_address is not a valid base58 public key: {:?}",
                self.recipient_address
            );
        }

        if self.rpc_endpoints.is_empty() {
            anyhow::bail!("At least one RPC endpoint must be specified");
        }

        if self.scan_concurrency == 0 {
            anyhow::bail!("scan_concurrency must be at least 1");
        }

        if self.rpc_timeout_secs == 0 {
            anyhow::bail!("rpc_timeout_secs must be at least 1");
        }

        Ok(())
    }

    /// Deposit threshold above which an account carries reclaimable rent.
    pub fn reclaim_threshold_lamports(&self) -> u64 {
        self.rent_exempt_lamports + self.dust_floor_lamports
    }
}
