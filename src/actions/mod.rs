//! Wallet actions exposed to the agent

pub mod rebalance;

pub use rebalance::{
    rebalance_discovered_liquidity, rebalance_liquidity, DiscoverRebalanceInput,
    RebalanceLiquidityInput, DEADLINE, DISCOVER_REBALANCE_PROMPT, FEE_TIER,
    INVALID_POSITION_MESSAGE, REBALANCE_LIQUIDITY_PROMPT,
};
