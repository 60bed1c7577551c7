//! Liquidity rebalancing tools
//!
//! Both variants register under the same tool name; the chatbot picks one.

use super::{TypedTool, TOOL_REBALANCE_LIQUIDITY};
use crate::actions::{
    rebalance_discovered_liquidity, rebalance_liquidity, DiscoverRebalanceInput,
    RebalanceLiquidityInput, DISCOVER_REBALANCE_PROMPT, REBALANCE_LIQUIDITY_PROMPT,
};
use crate::wallet::Wallet;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Rebalances a position whose token ID and liquidity the model supplies
pub struct RebalanceLiquidityTool {
    wallet: Arc<dyn Wallet>,
}

impl RebalanceLiquidityTool {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl TypedTool for RebalanceLiquidityTool {
    const NAME: &'static str = TOOL_REBALANCE_LIQUIDITY;
    type Input = RebalanceLiquidityInput;

    fn description(&self) -> &'static str {
        REBALANCE_LIQUIDITY_PROMPT
    }

    async fn run(&self, input: Self::Input) -> Result<String> {
        info!(
            pool = %input.pool,
            existing = input.existing_position,
            "Rebalance requested"
        );
        rebalance_liquidity(self.wallet.as_ref(), &input).await
    }
}

/// Rebalances the wallet's own position, found through the wallet
pub struct DiscoverRebalanceTool {
    wallet: Arc<dyn Wallet>,
}

impl DiscoverRebalanceTool {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl TypedTool for DiscoverRebalanceTool {
    const NAME: &'static str = TOOL_REBALANCE_LIQUIDITY;
    type Input = DiscoverRebalanceInput;

    fn description(&self) -> &'static str {
        DISCOVER_REBALANCE_PROMPT
    }

    async fn run(&self, input: Self::Input) -> Result<String> {
        info!(pool = %input.pool, "Rebalance requested (position lookup)");
        rebalance_discovered_liquidity(self.wallet.as_ref(), &input).await
    }
}
