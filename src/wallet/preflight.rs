//! Transaction preflight
//!
//! Runs `eth_call` against the pending request before it is signed so that
//! reverts surface with a readable reason instead of a failed receipt.
//! Read-only: nothing here signs or submits.

use alloy::hex;
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use serde::{Deserialize, Serialize};

/// Selector of the solidity `Error(string)` revert payload
const ERROR_STRING_SELECTOR: &str = "08c379a0";

/// Outcome of a preflight call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightResult {
    pub success: bool,
    /// The node executed the call and it reverted; false for transport errors
    pub reverted: bool,
    pub gas_used: Option<u64>,
    pub revert_reason: Option<String>,
}

impl PreflightResult {
    pub fn success(gas_used: u64) -> Self {
        Self {
            success: true,
            reverted: false,
            gas_used: Some(gas_used),
            revert_reason: None,
        }
    }

    pub fn failed(reason: String, reverted: bool) -> Self {
        Self {
            success: false,
            reverted,
            gas_used: None,
            revert_reason: Some(reason),
        }
    }
}

/// `eth_call` simulator bound to a provider
pub struct Preflight<'a> {
    provider: &'a DynProvider,
}

impl<'a> Preflight<'a> {
    pub fn new(provider: &'a DynProvider) -> Self {
        Self { provider }
    }

    /// Simulate `tx`; RPC failures that are not reverts are reported as failures too
    pub async fn check(&self, tx: &TransactionRequest) -> PreflightResult {
        match self.provider.call(tx.clone()).await {
            Ok(_) => {
                let gas = self.provider.estimate_gas(tx.clone()).await.unwrap_or(0);
                PreflightResult::success(gas)
            }
            Err(e) => {
                let message = e.to_string();
                PreflightResult::failed(parse_revert_reason(&message), is_revert(&message))
            }
        }
    }
}

/// Whether an RPC error message describes a reverted execution
pub(crate) fn is_revert(error: &str) -> bool {
    error.to_lowercase().contains("revert")
}

/// Extract a revert reason from an RPC error message
pub(crate) fn parse_revert_reason(error: &str) -> String {
    if !error.contains("execution reverted") {
        return error.to_string();
    }

    if let Some(start) = error.find("revert: ") {
        let reason = &error[start + 8..];
        return match reason.find('"') {
            Some(end) => reason[..end].to_string(),
            None => reason.to_string(),
        };
    }

    if let Some(start) = error.find("0x") {
        let hex_data = &error[start + 2..];
        let end = hex_data
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(hex_data.len());
        let payload = &hex_data[..end];

        if let Some(reason) = decode_error_string(payload) {
            return reason;
        }
        if !payload.is_empty() {
            return format!("Reverted with data: 0x{}", payload);
        }
    }

    "execution reverted".to_string()
}

/// Decode an ABI `Error(string)` payload (hex without 0x)
fn decode_error_string(payload: &str) -> Option<String> {
    let body = payload.strip_prefix(ERROR_STRING_SELECTOR)?;
    let bytes = hex::decode(body).ok()?;
    // offset word, length word, then the string bytes
    if bytes.len() < 64 {
        return None;
    }
    let len = usize::try_from(alloy::primitives::U256::from_be_slice(&bytes[32..64])).ok()?;
    let data = bytes.get(64..64 + len)?;
    String::from_utf8(data.to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::{Revert, SolError};

    #[test]
    fn test_preflight_result_constructors() {
        let ok = PreflightResult::success(21000);
        assert!(ok.success);
        assert_eq!(ok.gas_used, Some(21000));

        let failed = PreflightResult::failed("STF".to_string(), true);
        assert!(!failed.success);
        assert!(failed.reverted);
        assert_eq!(failed.revert_reason.as_deref(), Some("STF"));
    }

    #[test]
    fn test_parse_revert_reason_text() {
        let error = "execution reverted: revert: Price slippage check\"";
        assert_eq!(parse_revert_reason(error), "Price slippage check");

        assert_eq!(parse_revert_reason("execution reverted"), "execution reverted");
        assert_eq!(parse_revert_reason("connection refused"), "connection refused");
    }

    #[test]
    fn test_is_revert() {
        assert!(is_revert("server returned an error response: error code 3: execution reverted: STF"));
        assert!(is_revert("Execution Reverted"));
        assert!(!is_revert("error sending request for url (http://127.0.0.1:8545/)"));
        assert!(!is_revert("server returned an error response: error code 429: rate limited"));
    }

    #[test]
    fn test_parse_revert_reason_abi_payload() {
        let encoded = Revert {
            reason: "Not approved".to_string(),
        }
        .abi_encode();
        let error = format!("execution reverted, data: \"0x{}\"", hex::encode(encoded));
        assert_eq!(parse_revert_reason(&error), "Not approved");

        let error = "execution reverted, data: \"0xdeadbeef\"";
        assert_eq!(parse_revert_reason(error), "Reverted with data: 0xdeadbeef");
    }
}
