//! Wallet abstraction
//!
//! Actions only see the [`Wallet`] trait: an address, a network, and
//! `invoke_contract(address, method, args)` returning an invocation that is
//! awaited with [`ContractInvocation::wait`]. Signing, gas, nonces and
//! confirmation all live behind it.
//!
//! The private key lives in [`SecureWallet`] and never leaves this module.

mod onchain;
pub mod preflight;
mod signer;
pub mod store;

use crate::config::Network;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use onchain::OnchainWallet;
pub use preflight::{Preflight, PreflightResult};
pub use signer::{SecureWallet, WalletData};

/// Named contract arguments, kept in insertion order
pub type InvocationArgs = Map<String, Value>;

/// A submitted contract call
#[async_trait]
pub trait ContractInvocation: Send {
    /// Block until the call is confirmed and return its decoded result
    async fn wait(self: Box<Self>) -> Result<Value>;
}

/// Existing liquidity position as reported by the wallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInfo {
    #[serde(rename = "tokenId")]
    pub token_id: Option<String>,
    pub liquidity: Option<String>,
}

/// Wallet used by actions to issue contract calls
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Public address of the wallet
    fn address(&self) -> String;

    /// Network the wallet operates on
    fn network(&self) -> Network;

    /// Submit a contract call
    async fn invoke_contract(
        &self,
        contract_address: &str,
        method: &str,
        args: InvocationArgs,
    ) -> Result<Box<dyn ContractInvocation>>;

    /// Whether `spender` may already move this wallet's `token`
    async fn has_token_approval(&self, token: &str, spender: &str) -> Result<bool>;

    /// Look up the wallet's liquidity position in `pool`, if any
    async fn liquidity_position(&self, pool: &str) -> Result<Option<PositionInfo>>;
}
