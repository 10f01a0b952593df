//! Solana rent-recovery core.
//!
//! Finds token accounts that hold a zero token balance but still lock a
//! refundable rent deposit, and verifies that claimed payout transactions
//! actually moved funds to the configured recipient. This crate provides:
//!
//! - An account scanner with bounded concurrent balance lookups and
//!   skip-and-continue handling of per-account failures
//! - A TTL result cache that coalesces concurrent scans per owner
//! - A transaction verifier that measures the recipient's received amount
//!   from finalized transaction data
//!
//! # Architecture
//!
//! Both the scanner and the verifier read chain state through the
//! [`client::ChainClient`] trait; the bundled implementation speaks
//! Solana JSON-RPC over HTTP. The crate never signs or submits
//! transactions, and it knows nothing about the HTTP/persistence layer
//! that consumes its results.

pub mod account;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod scanner;
pub mod verifier;
pub mod verify;

pub use account::{AccountSummary, ReasonCode, ScanReport};
pub use cache::ScanCache;
pub use client::{ChainClient, RpcChainClient};
pub use config::RecoveryConfig;
pub use error::RecoveryError;
pub use scanner::AccountScanner;
pub use verifier::TransactionVerifier;
pub use verify::{VerificationOutcome, VerifyStatus};
