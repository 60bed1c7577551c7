//! Onchain wallet backed by an alloy provider
//!
//! Encodes named contract calls, optionally preflights them with `eth_call`,
//! signs through the provider's wallet filler and waits for receipts.

use super::preflight::Preflight;
use super::{ContractInvocation, InvocationArgs, PositionInfo, SecureWallet, Wallet};
use crate::config::Network;
use crate::contracts::{
    decode_address, decode_word, encode_call, INonfungiblePositionManager, IUniswapV3Pool, IERC20,
};
use crate::{Error, Result};
use alloy::network::{Ethereum, ReceiptResponse};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::{Log, TransactionRequest};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Upper bound on position NFTs scanned when looking up a pool position
const MAX_POSITION_SCAN: u64 = 256;

/// Production [`Wallet`] signing with a [`SecureWallet`]
pub struct OnchainWallet {
    signer: SecureWallet,
    network: Network,
    provider: DynProvider,
    preflight: bool,
}

impl OnchainWallet {
    /// Connect `signer` to `network` through `rpc_url`
    pub fn connect(signer: SecureWallet, network: Network, rpc_url: &str) -> Result<Self> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))?;

        let provider = ProviderBuilder::new()
            .wallet(signer.wallet().clone())
            .connect_http(url)
            .erased();

        info!(
            address = %signer.address_string(),
            network = %network,
            "Connected onchain wallet"
        );

        Ok(Self {
            signer,
            network,
            provider,
            preflight: true,
        })
    }

    #[cfg(test)]
    fn from_provider(signer: SecureWallet, network: Network, provider: DynProvider) -> Self {
        Self {
            signer,
            network,
            provider,
            preflight: true,
        }
    }

    /// Enable or disable `eth_call` preflight before sending
    pub fn with_preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }

    pub fn signer(&self) -> &SecureWallet {
        &self.signer
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    async fn read(&self, to: Address, data: Vec<u8>) -> Result<Bytes> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(Bytes::from(data).into());
        self.provider
            .call(tx)
            .await
            .map_err(|e| Error::Invocation(format!("eth_call to {} failed: {}", to, e)))
    }

    fn position_manager(&self) -> Result<Address> {
        parse_address(self.network.position_manager())
    }
}

fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw)
        .map_err(|e| Error::InvalidArgument(format!("Invalid address {}: {}", raw, e)))
}

/// A sent transaction awaiting its receipt
struct OnchainInvocation {
    method: String,
    pending: PendingTransactionBuilder<Ethereum>,
}

#[async_trait]
impl ContractInvocation for OnchainInvocation {
    async fn wait(self: Box<Self>) -> Result<Value> {
        let OnchainInvocation { method, pending } = *self;
        let tx_hash = *pending.tx_hash();
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| Error::Invocation(format!("{} ({}): {}", method, tx_hash, e)))?;

        let result = confirmed_result(
            &method,
            tx_hash,
            receipt.status(),
            receipt.block_number,
            receipt.gas_used,
            receipt.inner.logs(),
        )?;

        debug!(method = %method, tx_hash = %tx_hash, "Contract invocation confirmed");
        Ok(result)
    }
}

/// Result JSON of a mined invocation; a failed status is a revert
///
/// A mint also reports the position it created, read from the
/// `IncreaseLiquidity` event.
fn confirmed_result(
    method: &str,
    tx_hash: TxHash,
    status: bool,
    block_number: Option<u64>,
    gas_used: u64,
    logs: &[Log],
) -> Result<Value> {
    if !status {
        return Err(Error::Reverted(format!(
            "{} transaction {} reverted",
            method, tx_hash
        )));
    }

    let mut result = json!({
        "transactionHash": tx_hash.to_string(),
        "blockNumber": block_number,
        "gasUsed": gas_used,
        "status": "success",
    });

    if method == "mint" {
        let minted = logs.iter().find_map(|log| {
            log.log_decode::<INonfungiblePositionManager::IncreaseLiquidity>()
                .ok()
        });
        if let Some(log) = minted {
            let event = &log.inner.data;
            result["tokenId"] = json!(event.tokenId.to_string());
            result["liquidity"] = json!(event.liquidity.to_string());
            result["amount0"] = json!(event.amount0.to_string());
            result["amount1"] = json!(event.amount1.to_string());
        }
    }

    Ok(result)
}

#[async_trait]
impl Wallet for OnchainWallet {
    fn address(&self) -> String {
        self.signer.address_string()
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn invoke_contract(
        &self,
        contract_address: &str,
        method: &str,
        args: InvocationArgs,
    ) -> Result<Box<dyn ContractInvocation>> {
        let to = parse_address(contract_address)?;
        let data = encode_call(method, &args)?;

        let tx = TransactionRequest::default()
            .from(self.signer.address())
            .to(to)
            .input(data.into());

        if self.preflight {
            let check = Preflight::new(&self.provider).check(&tx).await;
            if !check.success {
                let message = format!(
                    "{} on {}: {}",
                    method,
                    contract_address,
                    check.revert_reason.unwrap_or_default()
                );
                return Err(if check.reverted {
                    Error::Reverted(message)
                } else {
                    Error::Invocation(message)
                });
            }
            debug!(method, gas = ?check.gas_used, "Preflight passed");
        }

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| Error::Invocation(format!("{} on {}: {}", method, contract_address, e)))?;

        info!(
            method,
            contract = contract_address,
            tx_hash = %pending.tx_hash(),
            "Submitted contract invocation"
        );

        Ok(Box::new(OnchainInvocation {
            method: method.to_string(),
            pending,
        }))
    }

    async fn has_token_approval(&self, token: &str, spender: &str) -> Result<bool> {
        let call = IERC20::allowanceCall {
            owner: self.signer.address(),
            spender: parse_address(spender)?,
        };
        let out = self.read(parse_address(token)?, call.abi_encode()).await?;
        Ok(!decode_word(&out)?.is_zero())
    }

    async fn liquidity_position(&self, pool: &str) -> Result<Option<PositionInfo>> {
        let pool = parse_address(pool)?;
        let manager = self.position_manager()?;
        let owner = self.signer.address();

        let token0 = decode_address(&self.read(pool, IUniswapV3Pool::token0Call {}.abi_encode()).await?)?;
        let token1 = decode_address(&self.read(pool, IUniswapV3Pool::token1Call {}.abi_encode()).await?)?;
        let fee = decode_word(&self.read(pool, IUniswapV3Pool::feeCall {}.abi_encode()).await?)?;
        let fee = u32::try_from(fee)
            .map_err(|_| Error::Invocation("Pool fee does not fit in uint24".to_string()))?;

        let count = decode_word(
            &self
                .read(manager, INonfungiblePositionManager::balanceOfCall { owner }.abi_encode())
                .await?,
        )?;
        let owned = u64::try_from(count).unwrap_or(u64::MAX);
        if owned > MAX_POSITION_SCAN {
            warn!(
                owned,
                scanned = MAX_POSITION_SCAN,
                "Wallet owns more position NFTs than are scanned; later positions are ignored"
            );
        }

        for index in 0..owned.min(MAX_POSITION_SCAN) {
            let call = INonfungiblePositionManager::tokenOfOwnerByIndexCall {
                owner,
                index: U256::from(index),
            };
            let token_id = decode_word(&self.read(manager, call.abi_encode()).await?)?;

            let out = self
                .read(
                    manager,
                    INonfungiblePositionManager::positionsCall { tokenId: token_id }.abi_encode(),
                )
                .await?;
            let position = INonfungiblePositionManager::positionsCall::abi_decode_returns(&out)
                .map_err(|e| Error::Invocation(format!("Failed to decode position: {}", e)))?;

            if position.token0 != token0 || position.token1 != token1 || position.fee.to::<u32>() != fee {
                continue;
            }
            // A drained NFT stays with its owner until it is burned
            if position.liquidity == 0 {
                debug!(token_id = %token_id, "Skipping position without liquidity");
                continue;
            }

            debug!(token_id = %token_id, "Found existing liquidity position");
            return Ok(Some(PositionInfo {
                token_id: Some(token_id.to_string()),
                liquidity: Some(position.liquidity.to_string()),
            }));
        }

        Ok(None)
    }
}
