//! Liquidity Agent
//!
//! Uniswap V3 liquidity management for an onchain agent wallet:
//! - Create or rebalance a concentrated-liquidity position through the
//!   NonfungiblePositionManager (mint / decreaseLiquidity / collect / burn)
//! - Expose that action and a few wallet tools to a chat model
//! - Run the agent as an interactive chatbot or on an autonomous timer
//!
//! # Security Model
//!
//! - Private keys never leave the wallet module
//! - Transactions are preflighted with `eth_call` before they are signed
//! - Every tool call can be written to a JSONL audit trail

pub mod actions;
pub mod agent;
pub mod config;
pub mod contracts;
pub mod runner;
pub mod tools;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use actions::{rebalance_discovered_liquidity, rebalance_liquidity};
pub use config::{Config, Network, RpcConfig};
pub use error::{Error, Result};
pub use runner::{AgentRunner, Mode};
