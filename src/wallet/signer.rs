//! Secure wallet implementation
//!
//! SECURITY: This is the ONLY place where private keys exist.
//! - Keys are held in alloy's PrivateKeySigner
//! - Keys are only serialized through the exported `WalletData` blob
//! - Keys are never logged

use crate::config::Network;
use crate::{Error, Result};
use alloy::hex;
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Exported wallet state, persisted so the agent reuses its wallet across runs
#[derive(Clone, Serialize, Deserialize)]
pub struct WalletData {
    pub wallet_id: String,
    pub network_id: Network,
    #[serde(serialize_with = "expose_seed", deserialize_with = "read_seed")]
    pub seed: SecretString,
}

fn expose_seed<S: Serializer>(seed: &SecretString, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(seed.expose_secret())
}

fn read_seed<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl std::fmt::Debug for WalletData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletData")
            .field("wallet_id", &self.wallet_id)
            .field("network_id", &self.network_id)
            .field("seed", &"[REDACTED]")
            .finish()
    }
}

/// Secure wallet that protects private keys
///
/// The private key is:
/// - Stored in alloy's PrivateKeySigner
/// - Never part of `Debug` output
/// - Only exported on request via [`SecureWallet::export`]
pub struct SecureWallet {
    /// Stable identifier carried through export/import
    wallet_id: String,
    /// The signer
    signer: PrivateKeySigner,
    /// Public address (safe to expose)
    address: Address,
    /// Ethereum wallet for alloy integration
    wallet: EthereumWallet,
}

impl SecureWallet {
    fn from_signer(wallet_id: String, signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        let wallet = EthereumWallet::from(signer.clone());
        Self {
            wallet_id,
            signer,
            address,
            wallet,
        }
    }

    /// Create a fresh wallet with a random key
    pub fn random() -> Self {
        Self::from_signer(uuid::Uuid::new_v4().to_string(), PrivateKeySigner::random())
    }

    /// Import a hex-encoded private key under a fresh wallet id
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let signer = parse_key(key_hex, "Invalid private key")?;
        Ok(Self::from_signer(uuid::Uuid::new_v4().to_string(), signer))
    }

    /// Restore a wallet from exported data, keeping its wallet id
    pub fn from_wallet_data(data: &WalletData) -> Result<Self> {
        let signer = parse_key(data.seed.expose_secret(), "Invalid wallet data seed")?;
        Ok(Self::from_signer(data.wallet_id.clone(), signer))
    }

    /// Export the wallet so it can be persisted
    pub fn export(&self, network: Network) -> WalletData {
        WalletData {
            wallet_id: self.wallet_id.clone(),
            network_id: network,
            seed: SecretString::from(hex::encode_prefixed(self.signer.to_bytes())),
        }
    }

    pub fn wallet_id(&self) -> &str {
        &self.wallet_id
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the address as a checksummed string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Get a reference to the EthereumWallet for use with alloy providers
    ///
    /// EthereumWallet only exposes signing operations, not the raw key.
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

fn parse_key(key_hex: &str, context: &str) -> Result<PrivateKeySigner> {
    key_hex
        .trim()
        .trim_start_matches("0x")
        .parse()
        .map_err(|e| Error::Wallet(format!("{}: {}", context, e)))
}

impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("wallet_id", &self.wallet_id)
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known anvil development key (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_hex() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();

        assert_eq!(
            wallet.address_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", wallet);
        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));

        let data_debug = format!("{:?}", wallet.export(Network::BaseSepolia));
        assert!(!data_debug.contains("ac0974bec"));
    }

    #[test]
    fn test_export_restores_same_wallet() {
        let wallet = SecureWallet::random();
        let data = wallet.export(Network::BaseSepolia);

        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"network_id\":\"base-sepolia\""));

        let parsed: WalletData = serde_json::from_str(&json).unwrap();
        let restored = SecureWallet::from_wallet_data(&parsed).unwrap();
        assert_eq!(restored.address(), wallet.address());
        assert_eq!(restored.wallet_id(), wallet.wallet_id());
    }

    #[test]
    fn test_rejects_bad_key() {
        let err = SecureWallet::from_hex("0xnothex").unwrap_err();
        assert!(err.to_string().contains("Invalid private key"));
    }
}
