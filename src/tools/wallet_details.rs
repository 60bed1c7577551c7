//! Wallet details tool (read-only)

use super::{TypedTool, TOOL_WALLET_DETAILS};
use crate::wallet::Wallet;
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EmptyArgs {}

/// Reports the agent wallet's address and network
pub struct WalletDetailsTool {
    wallet: Arc<dyn Wallet>,
}

impl WalletDetailsTool {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl TypedTool for WalletDetailsTool {
    const NAME: &'static str = TOOL_WALLET_DETAILS;
    type Input = EmptyArgs;

    fn description(&self) -> &'static str {
        "Get the details of the agent's wallet: its address and the network it is on."
    }

    async fn run(&self, _input: Self::Input) -> Result<String> {
        Ok(format!(
            "Wallet: {} on network: {}",
            self.wallet.address(),
            self.wallet.network()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::AgentTool;
    use crate::wallet::testing::MockWallet;
    use serde_json::Value;

    #[tokio::test]
    async fn reports_address_and_network() {
        let tool = WalletDetailsTool::new(Arc::new(MockWallet::new()));
        let out = tool.execute(Value::Null).await.unwrap();
        assert_eq!(out, "Wallet: 0xDummyWalletAddress on network: base-mainnet");
    }
}
