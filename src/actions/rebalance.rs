//! Uniswap V3 liquidity rebalancing
//!
//! Creates a position with `mint`, or replaces an existing one by running
//! `decreaseLiquidity`, `collect`, `burn` and then `mint` with the new tick
//! range. Every call is awaited before the next one is sent.
//!
//! There is no slippage protection (`amount0Min`/`amount1Min` are `"0"`) and
//! no recovery: if a step fails after `decreaseLiquidity` or `burn`, the error
//! is returned as-is and the old position stays removed.

use crate::wallet::{InvocationArgs, PositionInfo, Wallet};
use crate::{Error, Result};
use alloy::primitives::U256;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::info;

/// Fee tier of the target pools (0.3%)
pub const FEE_TIER: u32 = 3000;

/// Deadline sentinel passed to every time-bounded call
pub const DEADLINE: u64 = 9_999_999_999;

/// Status returned when the existing position cannot be rebalanced
pub const INVALID_POSITION_MESSAGE: &str =
    "Existing liquidity position is invalid or has zero liquidity.";

pub const REBALANCE_LIQUIDITY_PROMPT: &str = "
This tool creates or rebalances a Uniswap V3 liquidity position on Base mainnet.
If your agent's wallet has not created a liquidity position in the specified pool, the tool will call the
NonfungiblePositionManager contract's mint method to create a new position with the provided tick range.
If you have already created a liquidity position, please indicate so and provide the existing token ID and liquidity.
In that case, the tool will remove liquidity, collect fees, burn the old position, and then mint a new liquidity position
with the updated tick range.
";

pub const DISCOVER_REBALANCE_PROMPT: &str = "
This tool creates or rebalances a Uniswap V3 liquidity position on Base sepolia.
If your agent's wallet has never created a liquidity position in the specified pool, the tool will:
  1. Check that the required ERC-20 token approvals for token0 and token1 are in place (triggering approval transactions if needed).
  2. Call the NonfungiblePositionManager contract's mint method to create a new liquidity position with the given tick range.
If a liquidity position already exists, the tool will remove liquidity (and burn the old position) before creating a new one with the updated tick range.
";

/// Input for creating or rebalancing a position the caller describes
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RebalanceLiquidityInput {
    /// The lower tick boundary for the liquidity position.
    pub tick_a: i32,
    /// The upper tick boundary for the liquidity position.
    pub tick_b: i32,
    /// The address of the Uniswap V3 pool on Base mainnet.
    pub pool: String,
    /// The ERC-20 contract address of token0 for the pool.
    pub token0: String,
    /// The ERC-20 contract address of token1 for the pool.
    pub token1: String,
    /// Desired amount for token0 (in wei) to supply as liquidity.
    #[serde(rename = "amount0Desired")]
    pub amount0_desired: String,
    /// Desired amount for token1 (in wei) to supply as liquidity.
    #[serde(rename = "amount1Desired")]
    pub amount1_desired: String,
    /// Indicate whether you have already created a liquidity position for this pool (True or False).
    pub existing_position: bool,
    /// If an existing liquidity position exists, provide its token ID.
    #[serde(rename = "existing_tokenId", default)]
    pub existing_token_id: Option<String>,
    /// If an existing liquidity position exists, provide its liquidity amount (as a string).
    #[serde(default)]
    pub existing_liquidity: Option<String>,
}

/// Input for the variant that looks the position up through the wallet
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiscoverRebalanceInput {
    /// The lower tick boundary for the liquidity position.
    pub tick_a: i32,
    /// The upper tick boundary for the liquidity position.
    pub tick_b: i32,
    /// The address of the Uniswap V3 pool on Base sepolia.
    pub pool: String,
    /// The ERC-20 contract address of token0 for the pool.
    pub token0: String,
    /// The ERC-20 contract address of token1 for the pool.
    pub token1: String,
    /// Desired amount for token0 (in wei) to supply as liquidity.
    #[serde(rename = "amount0Desired")]
    pub amount0_desired: String,
    /// Desired amount for token1 (in wei) to supply as liquidity.
    #[serde(rename = "amount1Desired")]
    pub amount1_desired: String,
}

/// Shared position parameters of both variants
struct RangeSpec<'a> {
    tick_a: i32,
    tick_b: i32,
    pool: &'a str,
    token0: &'a str,
    token1: &'a str,
    amount0_desired: &'a str,
    amount1_desired: &'a str,
}

impl<'a> From<&'a RebalanceLiquidityInput> for RangeSpec<'a> {
    fn from(input: &'a RebalanceLiquidityInput) -> Self {
        Self {
            tick_a: input.tick_a,
            tick_b: input.tick_b,
            pool: &input.pool,
            token0: &input.token0,
            token1: &input.token1,
            amount0_desired: &input.amount0_desired,
            amount1_desired: &input.amount1_desired,
        }
    }
}

impl<'a> From<&'a DiscoverRebalanceInput> for RangeSpec<'a> {
    fn from(input: &'a DiscoverRebalanceInput) -> Self {
        Self {
            tick_a: input.tick_a,
            tick_b: input.tick_b,
            pool: &input.pool,
            token0: &input.token0,
            token1: &input.token1,
            amount0_desired: &input.amount0_desired,
            amount1_desired: &input.amount1_desired,
        }
    }
}

/// Issues NonfungiblePositionManager calls through a wallet
struct PositionManagerCalls<'a, W: Wallet + ?Sized> {
    wallet: &'a W,
    manager: &'static str,
    /// When set, `pool` is appended to the time-bounded and burn calls
    pool_tag: Option<&'a str>,
}

impl<'a, W: Wallet + ?Sized> PositionManagerCalls<'a, W> {
    fn new(wallet: &'a W, pool_tag: Option<&'a str>) -> Self {
        Self {
            wallet,
            manager: wallet.network().position_manager(),
            pool_tag,
        }
    }

    fn tagged(&self, value: Value) -> InvocationArgs {
        let mut args = into_args(value);
        if let Some(pool) = self.pool_tag {
            args.insert("pool".to_string(), json!(pool));
        }
        args
    }

    async fn call(&self, contract: &str, method: &str, args: InvocationArgs) -> Result<Value> {
        self.wallet
            .invoke_contract(contract, method, args)
            .await?
            .wait()
            .await
    }

    async fn approve(&self, token: &str, amount: &str) -> Result<()> {
        let args = into_args(json!({
            "spender": self.manager,
            "value": amount,
        }));
        self.call(token, "approve", args).await?;
        Ok(())
    }

    async fn mint(&self, range: &RangeSpec<'_>) -> Result<String> {
        let args = self.tagged(json!({
            "token0": range.token0,
            "token1": range.token1,
            "fee": FEE_TIER,
            "tickLower": range.tick_a,
            "tickUpper": range.tick_b,
            "amount0Desired": range.amount0_desired,
            "amount1Desired": range.amount1_desired,
            "amount0Min": "0",
            "amount1Min": "0",
            "recipient": self.wallet.address(),
            "deadline": DEADLINE,
        }));
        let result = self.call(self.manager, "mint", args).await?;
        Ok(token_id_of(&result))
    }

    async fn decrease_liquidity(&self, token_id: &str, liquidity: &str) -> Result<()> {
        let args = self.tagged(json!({
            "tokenId": token_id,
            "liquidity": liquidity,
            "amount0Min": "0",
            "amount1Min": "0",
            "deadline": DEADLINE,
        }));
        self.call(self.manager, "decreaseLiquidity", args).await?;
        Ok(())
    }

    async fn collect(&self, token_id: &str, range: &RangeSpec<'_>) -> Result<()> {
        let args = into_args(json!({
            "tokenId": token_id,
            "recipient": self.wallet.address(),
            "amount0Max": range.amount0_desired,
            "amount1Max": range.amount1_desired,
        }));
        self.call(self.manager, "collect", args).await?;
        Ok(())
    }

    async fn burn(&self, token_id: &str) -> Result<()> {
        let args = self.tagged(json!({ "tokenId": token_id }));
        self.call(self.manager, "burn", args).await?;
        Ok(())
    }

    async fn create(&self, range: &RangeSpec<'_>) -> Result<String> {
        info!("Minting new liquidity position...");
        let token_id = self.mint(range).await?;
        Ok(format!(
            "Liquidity position created with token ID {} in pool {} with tick range [{}, {}].",
            token_id, range.pool, range.tick_a, range.tick_b
        ))
    }

    async fn rebalance(&self, token_id: &str, liquidity: &str, range: &RangeSpec<'_>) -> Result<String> {
        info!(token_id, "Removing liquidity from existing position (token ID {})...", token_id);
        self.decrease_liquidity(token_id, liquidity).await?;

        info!(token_id, "Collecting fees from the old position...");
        self.collect(token_id, range).await?;

        info!(token_id, "Burning old liquidity position (token ID {})...", token_id);
        self.burn(token_id).await?;

        info!("Minting new liquidity position with updated tick range...");
        let new_token_id = self.mint(range).await?;

        Ok(format!(
            "Liquidity position rebalanced. Old position (token ID {}) removed. \
             New liquidity position created with token ID {} in pool {} \
             with tick range [{}, {}].",
            token_id, new_token_id, range.pool, range.tick_a, range.tick_b
        ))
    }
}

/// Create or rebalance a position described by the caller
///
/// With `existing_position == false` this issues a single `mint`. Otherwise
/// it validates the given token ID and liquidity and runs the four-step
/// rebalance. Invalid existing positions yield [`INVALID_POSITION_MESSAGE`]
/// without touching the wallet.
pub async fn rebalance_liquidity<W: Wallet + ?Sized>(
    wallet: &W,
    input: &RebalanceLiquidityInput,
) -> Result<String> {
    let range = RangeSpec::from(input);
    let calls = PositionManagerCalls::new(wallet, Some(input.pool.as_str()));

    if !input.existing_position {
        return calls.create(&range).await;
    }

    let existing = PositionInfo {
        token_id: input.existing_token_id.clone(),
        liquidity: input.existing_liquidity.clone(),
    };
    match usable_position(&existing)? {
        Some((token_id, liquidity)) => calls.rebalance(token_id, liquidity, &range).await,
        None => Ok(INVALID_POSITION_MESSAGE.to_string()),
    }
}

/// Create or rebalance the wallet's own position in `input.pool`
///
/// The existing position comes from [`Wallet::liquidity_position`]. Before a
/// fresh `mint`, missing ERC-20 approvals for either token are requested.
pub async fn rebalance_discovered_liquidity<W: Wallet + ?Sized>(
    wallet: &W,
    input: &DiscoverRebalanceInput,
) -> Result<String> {
    let range = RangeSpec::from(input);
    let calls = PositionManagerCalls::new(wallet, None);

    let Some(position) = wallet.liquidity_position(&input.pool).await? else {
        for (token, amount, label) in [
            (range.token0, range.amount0_desired, "token0"),
            (range.token1, range.amount1_desired, "token1"),
        ] {
            if !wallet.has_token_approval(token, calls.manager).await? {
                info!(token, "Requesting approval for {} ({})...", label, token);
                calls.approve(token, amount).await?;
            }
        }
        return calls.create(&range).await;
    };

    match usable_position(&position)? {
        Some((token_id, liquidity)) => calls.rebalance(token_id, liquidity, &range).await,
        None => Ok(INVALID_POSITION_MESSAGE.to_string()),
    }
}

/// Token ID and liquidity of a position that can be rebalanced
///
/// `None` for a missing/empty token ID or missing/zero liquidity; liquidity
/// that is not an unsigned integer is an error.
fn usable_position(position: &PositionInfo) -> Result<Option<(&str, &str)>> {
    let Some(token_id) = position.token_id.as_deref().filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    let Some(liquidity) = position.liquidity.as_deref() else {
        return Ok(None);
    };

    let amount = U256::from_str(liquidity.trim()).map_err(|e| {
        Error::InvalidArgument(format!("Invalid liquidity '{}': {}", liquidity, e))
    })?;
    if amount.is_zero() {
        return Ok(None);
    }

    Ok(Some((token_id, liquidity)))
}

/// `tokenId` from an invocation result, or `"unknown"`
fn token_id_of(result: &Value) -> String {
    match result.get("tokenId") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => "unknown".to_string(),
    }
}

fn into_args(value: Value) -> InvocationArgs {
    match value {
        Value::Object(map) => map,
        _ => InvocationArgs::new(),
    }
}
