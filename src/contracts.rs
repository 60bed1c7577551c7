//! Contract bindings and calldata encoding
//!
//! Wallet invocations arrive as `(method, args)` pairs with JSON arguments.
//! `encode_call` maps them onto the `sol!` bindings below. Keys that a method
//! does not take (such as `pool`) are ignored.

use crate::wallet::InvocationArgs;
use crate::{Error, Result};
use alloy::primitives::aliases::{I24, U24};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde_json::Value;
use std::str::FromStr;

sol! {
    interface INonfungiblePositionManager {
        struct MintParams {
            address token0;
            address token1;
            uint24 fee;
            int24 tickLower;
            int24 tickUpper;
            uint256 amount0Desired;
            uint256 amount1Desired;
            uint256 amount0Min;
            uint256 amount1Min;
            address recipient;
            uint256 deadline;
        }

        struct DecreaseLiquidityParams {
            uint256 tokenId;
            uint128 liquidity;
            uint256 amount0Min;
            uint256 amount1Min;
            uint256 deadline;
        }

        struct CollectParams {
            uint256 tokenId;
            address recipient;
            uint128 amount0Max;
            uint128 amount1Max;
        }

        event IncreaseLiquidity(uint256 indexed tokenId, uint128 liquidity, uint256 amount0, uint256 amount1);

        function mint(MintParams calldata params) external payable returns (uint256 tokenId, uint128 liquidity, uint256 amount0, uint256 amount1);
        function decreaseLiquidity(DecreaseLiquidityParams calldata params) external payable returns (uint256 amount0, uint256 amount1);
        function collect(CollectParams calldata params) external payable returns (uint256 amount0, uint256 amount1);
        function burn(uint256 tokenId) external payable;

        function balanceOf(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
        function positions(uint256 tokenId) external view returns (
            uint96 nonce,
            address operator,
            address token0,
            address token1,
            uint24 fee,
            int24 tickLower,
            int24 tickUpper,
            uint128 liquidity,
            uint256 feeGrowthInside0LastX128,
            uint256 feeGrowthInside1LastX128,
            uint128 tokensOwed0,
            uint128 tokensOwed1
        );
    }

    interface IERC20 {
        function approve(address spender, uint256 value) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }

    interface IUniswapV3Pool {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function fee() external view returns (uint24);
    }
}

/// Methods the wallet knows how to encode
pub const SUPPORTED_METHODS: &[&str] = &["mint", "decreaseLiquidity", "collect", "burn", "approve"];

/// Encode a named method call from JSON arguments
pub fn encode_call(method: &str, args: &InvocationArgs) -> Result<Bytes> {
    let data = match method {
        "mint" => INonfungiblePositionManager::mintCall {
            params: INonfungiblePositionManager::MintParams {
                token0: arg_address(args, "token0")?,
                token1: arg_address(args, "token1")?,
                fee: arg_u24(args, "fee")?,
                tickLower: arg_i24(args, "tickLower")?,
                tickUpper: arg_i24(args, "tickUpper")?,
                amount0Desired: arg_u256(args, "amount0Desired")?,
                amount1Desired: arg_u256(args, "amount1Desired")?,
                amount0Min: arg_u256(args, "amount0Min")?,
                amount1Min: arg_u256(args, "amount1Min")?,
                recipient: arg_address(args, "recipient")?,
                deadline: arg_u256(args, "deadline")?,
            },
        }
        .abi_encode(),
        "decreaseLiquidity" => INonfungiblePositionManager::decreaseLiquidityCall {
            params: INonfungiblePositionManager::DecreaseLiquidityParams {
                tokenId: arg_u256(args, "tokenId")?,
                liquidity: arg_u128(args, "liquidity")?,
                amount0Min: arg_u256(args, "amount0Min")?,
                amount1Min: arg_u256(args, "amount1Min")?,
                deadline: arg_u256(args, "deadline")?,
            },
        }
        .abi_encode(),
        "collect" => INonfungiblePositionManager::collectCall {
            params: INonfungiblePositionManager::CollectParams {
                tokenId: arg_u256(args, "tokenId")?,
                recipient: arg_address(args, "recipient")?,
                amount0Max: arg_u128(args, "amount0Max")?,
                amount1Max: arg_u128(args, "amount1Max")?,
            },
        }
        .abi_encode(),
        "burn" => INonfungiblePositionManager::burnCall {
            tokenId: arg_u256(args, "tokenId")?,
        }
        .abi_encode(),
        "approve" => IERC20::approveCall {
            spender: arg_address(args, "spender")?,
            value: arg_u256(args, "value")?,
        }
        .abi_encode(),
        other => {
            return Err(Error::InvalidArgument(format!(
                "Unsupported contract method: {}. Supported: {}",
                other,
                SUPPORTED_METHODS.join(", ")
            )))
        }
    };

    Ok(Bytes::from(data))
}

/// Decode a single 32-byte word as a `U256`
pub fn decode_word(data: &[u8]) -> Result<U256> {
    if data.len() < 32 {
        return Err(Error::Invocation(format!(
            "Expected 32-byte return value, got {} bytes",
            data.len()
        )));
    }
    Ok(U256::from_be_slice(&data[..32]))
}

/// Decode a single ABI-encoded address return value
pub fn decode_address(data: &[u8]) -> Result<Address> {
    if data.len() < 32 {
        return Err(Error::Invocation(format!(
            "Expected 32-byte address return value, got {} bytes",
            data.len()
        )));
    }
    Ok(Address::from_slice(&data[12..32]))
}

fn arg<'a>(args: &'a InvocationArgs, key: &str) -> Result<&'a Value> {
    args.get(key)
        .ok_or_else(|| Error::InvalidArgument(format!("Missing '{}'", key)))
}

fn arg_address(args: &InvocationArgs, key: &str) -> Result<Address> {
    let raw = arg(args, key)?
        .as_str()
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' must be an address string", key)))?;
    Address::from_str(raw)
        .map_err(|e| Error::InvalidArgument(format!("Invalid address for '{}': {}", key, e)))
}

fn arg_u256(args: &InvocationArgs, key: &str) -> Result<U256> {
    match arg(args, key)? {
        Value::String(s) => U256::from_str(s)
            .map_err(|e| Error::InvalidArgument(format!("Invalid integer for '{}': {}", key, e))),
        Value::Number(n) => n.as_u64().map(U256::from).ok_or_else(|| {
            Error::InvalidArgument(format!("'{}' must be a non-negative integer", key))
        }),
        _ => Err(Error::InvalidArgument(format!(
            "'{}' must be an integer or integer string",
            key
        ))),
    }
}

fn arg_u128(args: &InvocationArgs, key: &str) -> Result<u128> {
    let value = arg_u256(args, key)?;
    u128::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("'{}' does not fit in uint128", key)))
}

fn arg_u24(args: &InvocationArgs, key: &str) -> Result<U24> {
    let value = arg(args, key)?
        .as_u64()
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' must be an integer", key)))?;
    U24::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("'{}' does not fit in uint24", key)))
}

fn arg_i24(args: &InvocationArgs, key: &str) -> Result<I24> {
    let value = arg(args, key)?
        .as_i64()
        .ok_or_else(|| Error::InvalidArgument(format!("'{}' must be an integer", key)))?;
    I24::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("'{}' does not fit in int24", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> InvocationArgs {
        value.as_object().cloned().unwrap()
    }

    fn mint_args() -> InvocationArgs {
        args(json!({
            "token0": "0x4200000000000000000000000000000000000006",
            "token1": "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
            "fee": 3000,
            "tickLower": -1000,
            "tickUpper": 2000,
            "amount0Desired": "1000000000000000000",
            "amount1Desired": "2000000000000000000",
            "amount0Min": "0",
            "amount1Min": "0",
            "recipient": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "deadline": 9999999999u64,
            "pool": "0x1234567890abcdef1234567890abcdef12345678"
        }))
    }

    #[test]
    fn encodes_mint_with_selector() {
        let data = encode_call("mint", &mint_args()).unwrap();
        assert_eq!(&data[..4], &INonfungiblePositionManager::mintCall::SELECTOR);
        // selector + 11 static words
        assert_eq!(data.len(), 4 + 11 * 32);
    }

    #[test]
    fn encodes_burn_and_approve() {
        let burn = encode_call("burn", &args(json!({ "tokenId": "1234", "pool": "0xabc" }))).unwrap();
        assert_eq!(&burn[..4], &INonfungiblePositionManager::burnCall::SELECTOR);
        assert_eq!(decode_word(&burn[4..]).unwrap(), U256::from(1234u64));

        let approve = encode_call(
            "approve",
            &args(json!({
                "spender": "0x27F971cb582BF9E50F397e4d29a5C7A34f11faA2",
                "value": "5"
            })),
        )
        .unwrap();
        assert_eq!(&approve[..4], &IERC20::approveCall::SELECTOR);
    }

    #[test]
    fn rejects_unknown_method_and_bad_args() {
        let err = encode_call("swap", &mint_args()).unwrap_err();
        assert!(err.to_string().contains("Unsupported contract method"));

        let mut bad = mint_args();
        bad.insert("token0".to_string(), json!("0xToken0Address"));
        let err = encode_call("mint", &bad).unwrap_err();
        assert!(err.to_string().contains("token0"));

        let mut missing = mint_args();
        missing.remove("deadline");
        let err = encode_call("mint", &missing).unwrap_err();
        assert!(err.to_string().contains("Missing 'deadline'"));
    }

    #[test]
    fn rejects_liquidity_overflow() {
        let err = encode_call(
            "decreaseLiquidity",
            &args(json!({
                "tokenId": "1",
                "liquidity": U256::MAX.to_string(),
                "amount0Min": "0",
                "amount1Min": "0",
                "deadline": 9999999999u64
            })),
        )
        .unwrap_err();
        assert!(err.to_string().contains("uint128"));
    }

    #[test]
    fn decodes_words() {
        let mut word = [0u8; 32];
        word[31] = 7;
        assert_eq!(decode_word(&word).unwrap(), U256::from(7u64));
        assert!(decode_word(&word[..4]).is_err());

        let mut addr_word = [0u8; 32];
        addr_word[12..].copy_from_slice(&[0x11; 20]);
        assert_eq!(decode_address(&addr_word).unwrap(), Address::from([0x11; 20]));
    }
}
