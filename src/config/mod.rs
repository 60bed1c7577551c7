//! Configuration for the liquidity agent

pub mod rpc;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

// Re-export RPC config
pub use rpc::RpcConfig;

/// Default chat-completions model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Environment variable holding the chat-completions API key
pub const MODEL_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable with a hex private key to import when no wallet data exists
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Prompt used by the chatbot for its ReAct agent
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful agent that can interact onchain using your wallet tools. \
You are empowered to interact onchain using your tools. If you ever need funds, you can request \
them from the user by providing your wallet details. Before executing your first action, get the wallet details \
to see what network you're on. If there is a 5XX (internal) HTTP error code, ask the user to try \
again later. If someone asks you to do something you can't do with your currently available tools, \
you must say so. Be concise and helpful with your responses. Refrain from restating your tools' \
descriptions unless it is explicitly requested.";

/// Supported networks
///
/// Serialized with the wallet network ids (`base-mainnet`, `base-sepolia`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    BaseMainnet,
    #[default]
    BaseSepolia,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::BaseMainnet => rpc::chains::BASE,
            Network::BaseSepolia => rpc::chains::BASE_SEPOLIA,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::BaseMainnet => "base-mainnet",
            Network::BaseSepolia => "base-sepolia",
        }
    }

    /// NonfungiblePositionManager deployment on this network
    pub fn position_manager(&self) -> &'static str {
        match self {
            Network::BaseMainnet => "0x03a520b32C04BF3bEEf7BEb72E919cf822Ed34f1",
            Network::BaseSepolia => "0x27F971cb582BF9E50F397e4d29a5C7A34f11faA2",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "base" | "base-mainnet" | "base_mainnet" => Ok(Network::BaseMainnet),
            "base-sepolia" | "base_sepolia" => Ok(Network::BaseSepolia),
            other => Err(Error::InvalidArgument(format!("Unknown network: {}", other))),
        }
    }
}

/// Chat-completions backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Maximum model round-trips per user turn
    pub max_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: MODEL_API_KEY_ENV.to_string(),
            max_iterations: 10,
        }
    }
}

/// Chatbot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// File holding the exported wallet data
    pub wallet_data_file: PathBuf,
    /// Conversation thread id used for memory
    pub thread_id: String,
    /// Seconds between autonomous actions
    pub autonomous_interval_secs: u64,
    /// System prompt for the agent
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Path to audit log file
    pub audit_log_path: Option<String>,
    /// Look the existing position up through the wallet instead of asking the model
    #[serde(default = "default_true")]
    pub discover_positions: bool,
    /// User turns of history kept per thread
    #[serde(default = "default_history_turns")]
    pub max_history_turns: usize,
}

fn default_true() -> bool {
    true
}

fn default_history_turns() -> usize {
    20
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            wallet_data_file: PathBuf::from("wallet_data.txt"),
            thread_id: "CDP Agentkit Chatbot Example!".to_string(),
            autonomous_interval_secs: 10,
            system_prompt: default_system_prompt(),
            audit_log_path: Some("audit.jsonl".to_string()),
            discover_positions: true,
            max_history_turns: default_history_turns(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Network the agent's wallet operates on
    #[serde(default)]
    pub network: Network,
    /// Chat model settings
    #[serde(default)]
    pub model: ModelConfig,
    /// Chatbot settings
    #[serde(default)]
    pub agent: AgentConfig,
}

impl Config {
    /// Load a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserialize_defaults() {
        let parsed: Config = serde_json::from_value(serde_json::json!({})).expect("parse config");
        assert_eq!(parsed.network, Network::BaseSepolia);
        assert_eq!(parsed.model.model, DEFAULT_MODEL);
        assert_eq!(parsed.agent.wallet_data_file, PathBuf::from("wallet_data.txt"));
        assert_eq!(parsed.agent.autonomous_interval_secs, 10);
    }

    #[test]
    fn config_deserialize_explicit() {
        let value = serde_json::json!({
            "network": "base-mainnet",
            "model": {
                "base_url": "http://localhost:8080/v1",
                "model": "local",
                "api_key_env": "LOCAL_KEY",
                "max_iterations": 3
            },
            "agent": {
                "wallet_data_file": "/tmp/wallet.json",
                "thread_id": "t-1",
                "autonomous_interval_secs": 60,
                "audit_log_path": null
            }
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.network, Network::BaseMainnet);
        assert_eq!(parsed.model.max_iterations, 3);
        assert_eq!(parsed.agent.thread_id, "t-1");
        assert!(parsed.agent.audit_log_path.is_none());
        assert_eq!(parsed.agent.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(parsed.agent.discover_positions);
        assert_eq!(parsed.agent.max_history_turns, 20);
    }

    #[test]
    fn network_parsing_and_constants() {
        assert_eq!("base".parse::<Network>().unwrap(), Network::BaseMainnet);
        assert_eq!("Base_Sepolia".parse::<Network>().unwrap(), Network::BaseSepolia);
        assert!("ethereum".parse::<Network>().is_err());

        assert_eq!(Network::BaseMainnet.chain_id(), 8453);
        assert_eq!(Network::BaseSepolia.chain_id(), 84532);
        assert_eq!(
            Network::BaseMainnet.position_manager(),
            "0x03a520b32C04BF3bEEf7BEb72E919cf822Ed34f1"
        );
        assert_eq!(Network::BaseSepolia.to_string(), "base-sepolia");
    }
}
