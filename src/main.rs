//! Rent-recovery CLI
//!
//! Manual entry point for the scanner and verifier. The HTTP service that
//! normally drives this core lives elsewhere; this binary exposes the same
//! operations for operators and scripts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sol_rent_recovery::{
    AccountScanner, RecoveryConfig, RpcChainClient, ScanCache, TransactionVerifier,
};

#[derive(Parser)]
#[command(name = "sol-rent-recovery")]
#[command(about = "Rent recovery scanner and payout verifier for Solana token accounts")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "recovery.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an owner's token accounts for reclaimable rent
    Scan {
        /// Owner wallet address (base58)
        #[arg(short, long)]
        owner: String,

        /// Bypass the result cache and force a fresh scan
        #[arg(long)]
        no_cache: bool,
    },

    /// Verify a claimed payout transaction
    Verify {
        /// Transaction signature (base58)
        #[arg(short, long)]
        signature: String,

        /// Expected amount in SOL (advisory; mismatches are logged, not
        /// rejected)
        #[arg(short, long)]
        expected: Option<f64>,
    },

    /// Validate configuration file
    ValidateConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let config = match RecoveryConfig::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            if matches!(cli.command, Commands::ValidateConfig) {
                eprintln!("Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            anyhow::bail!("Failed to load config from {:?}: {}", cli.config, e);
        }
    };

    match cli.command {
        Commands::Scan { owner, no_cache } => run_scan(&config, &owner, no_cache).await,
        Commands::Verify {
            signature,
            expected,
        } => run_verify(&config, &signature, expected).await,
        Commands::ValidateConfig => {
            println!("Configuration is valid.");
            println!("  RPC endpoints: {:?}", config.rpc_endpoints);
            println!("  Recipient: {}", config.recipient_address);
            println!(
                "  Reclaim threshold: {} lamports (rent-exempt {} + dust floor {})",
                config.reclaim_threshold_lamports(),
                config.rent_exempt_lamports,
                config.dust_floor_lamports
            );
            println!("  Cache TTL: {}s", config.cache_ttl_secs);
            println!("  Scan concurrency: {}", config.scan_concurrency);
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

async fn run_scan(config: &RecoveryConfig, owner: &str, no_cache: bool) -> Result<()> {
    let client = Arc::new(RpcChainClient::from_config(config)?);
    let scanner = Arc::new(AccountScanner::new(client, config));

    let report = if no_cache {
        scanner.scan(owner).await?
    } else {
        let cache = ScanCache::from_config(scanner, config);
        let report = cache.get_or_scan(owner).await?;
        (*report).clone()
    };

    if report.partial {
        tracing::warn!(
            "Partial result: {} of {} accounts could not be evaluated",
            report.accounts_skipped,
            report.accounts_seen
        );
    }

    println!("{}", report.to_json_pretty());
    Ok(())
}

async fn run_verify(config: &RecoveryConfig, signature: &str, expected: Option<f64>) -> Result<()> {
    let client = Arc::new(RpcChainClient::from_config(config)?);
    let verifier = TransactionVerifier::new(client, config);

    let outcome = verifier.verify(signature, expected).await?;

    println!("{}", outcome.to_json_pretty());
    Ok(())
}
