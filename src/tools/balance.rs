//! Wallet balance tool
//!
//! Queries native ETH or ERC-20 balances of the agent wallet over RPC.
//! Read-only; it never touches key material.

use super::{TypedTool, TOOL_BALANCE};
use crate::contracts::{decode_word, IERC20};
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BalanceInput {
    /// `eth` for the native balance, or the ERC-20 contract address to query.
    pub asset_id: String,
}

/// Tool for querying the agent wallet's balances
pub struct BalanceTool {
    owner: Address,
    rpc_url: url::Url,
}

impl BalanceTool {
    pub fn new(owner: &str, rpc_url: &str) -> Result<Self> {
        let owner = Address::from_str(owner)
            .map_err(|e| Error::InvalidArgument(format!("Invalid wallet address: {}", e)))?;
        let rpc_url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))?;
        Ok(Self { owner, rpc_url })
    }

    async fn native_balance(&self) -> Result<String> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        let balance = provider
            .get_balance(self.owner)
            .await
            .map_err(|e| Error::ToolExecution(format!("Failed to get balance: {}", e)))?;
        Ok(format_units(balance, 18))
    }

    async fn token_balance(&self, token: Address) -> Result<String> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());

        let call = |data: Vec<u8>| {
            TransactionRequest::default()
                .to(token)
                .input(Bytes::from(data).into())
        };

        let balance = provider
            .call(call(IERC20::balanceOfCall { account: self.owner }.abi_encode()))
            .await
            .map_err(|e| Error::ToolExecution(format!("Failed to get token balance: {}", e)))?;
        let balance = decode_word(&balance)?;

        let decimals = provider
            .call(call(IERC20::decimalsCall {}.abi_encode()))
            .await
            .map_err(|e| Error::ToolExecution(format!("Failed to get token decimals: {}", e)))?;
        let decimals = u32::try_from(decode_word(&decimals)?)
            .map_err(|_| Error::ToolExecution("Token decimals out of range".to_string()))?;

        Ok(format_units(balance, decimals))
    }
}

/// Format a U256 value with decimals
pub fn format_units(value: U256, decimals: u32) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }

    let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
    let trimmed = remainder_str.trim_end_matches('0');
    format!("{}.{}", whole, trimmed)
}

#[async_trait]
impl TypedTool for BalanceTool {
    const NAME: &'static str = TOOL_BALANCE;
    type Input = BalanceInput;

    fn description(&self) -> &'static str {
        "Get the balance of an asset in the agent's wallet. \
         Use `eth` for the native balance or an ERC-20 contract address."
    }

    async fn run(&self, input: Self::Input) -> Result<String> {
        let asset = input.asset_id.trim();
        let formatted = if asset.eq_ignore_ascii_case("eth") {
            self.native_balance().await?
        } else {
            let token = Address::from_str(asset)
                .map_err(|e| Error::InvalidArgument(format!("Invalid token address: {}", e)))?;
            self.token_balance(token).await?
        };

        Ok(format!(
            "Balance of {} in wallet {} is {}",
            asset, self.owner, formatted
        ))
    }
}
