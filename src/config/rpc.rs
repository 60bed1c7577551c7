//! RPC endpoint configuration
//!
//! Each network resolves its endpoint in this order:
//! 1. Its own env var (`BASE_RPC_URL`, `BASE_SEPOLIA_RPC_URL`)
//! 2. An Alchemy URL when `ALCHEMY_API_KEY` is set
//! 3. The public Base endpoint (rate limited)
//!
//! ```bash
//! export BASE_SEPOLIA_RPC_URL="https://base-sepolia.g.alchemy.com/v2/YOUR_KEY"
//! # or
//! export ALCHEMY_API_KEY="YOUR_KEY"
//! ```

use super::Network;
use std::collections::HashMap;

pub const ALCHEMY_API_KEY_ENV: &str = "ALCHEMY_API_KEY";

/// Chain ID constants
pub mod chains {
    pub const BASE: u64 = 8453;
    pub const BASE_SEPOLIA: u64 = 84532;
}

/// Where a network's endpoint can come from
struct Endpoints {
    network: Network,
    env_var: &'static str,
    alchemy_host: &'static str,
    public_url: &'static str,
}

const ENDPOINTS: [Endpoints; 2] = [
    Endpoints {
        network: Network::BaseMainnet,
        env_var: "BASE_RPC_URL",
        alchemy_host: "base-mainnet.g.alchemy.com",
        public_url: "https://mainnet.base.org",
    },
    Endpoints {
        network: Network::BaseSepolia,
        env_var: "BASE_SEPOLIA_RPC_URL",
        alchemy_host: "base-sepolia.g.alchemy.com",
        public_url: "https://sepolia.base.org",
    },
];

/// RPC URLs indexed by chain ID
#[derive(Debug, Clone)]
pub struct RpcConfig {
    urls: HashMap<u64, String>,
}

impl RpcConfig {
    /// Resolve an endpoint for every supported network from the environment
    pub fn from_env() -> Self {
        let alchemy_key = std::env::var(ALCHEMY_API_KEY_ENV).ok();

        let urls = ENDPOINTS
            .iter()
            .map(|endpoint| {
                let url = match (std::env::var(endpoint.env_var), &alchemy_key) {
                    (Ok(url), _) => {
                        tracing::debug!(network = %endpoint.network, "Using {}", endpoint.env_var);
                        url
                    }
                    (Err(_), Some(key)) => {
                        tracing::debug!(network = %endpoint.network, "Using Alchemy endpoint");
                        format!("https://{}/v2/{}", endpoint.alchemy_host, key)
                    }
                    (Err(_), None) => {
                        tracing::warn!(
                            network = %endpoint.network,
                            "No RPC configured, using public endpoint (rate limited)"
                        );
                        endpoint.public_url.to_string()
                    }
                };
                (endpoint.network.chain_id(), url)
            })
            .collect();

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    pub fn for_network(&self, network: Network) -> Option<&str> {
        self.get(network.chain_id())
    }

    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
