//! Agent tools
//!
//! A tool is a name, a description, a JSON schema for its arguments and an
//! async `execute`. Tools declare a typed input through [`TypedTool`]; the
//! blanket [`AgentTool`] impl derives the schema with `schemars` and decodes
//! arguments with `serde`.

mod balance;
mod rebalance;
mod registry;
mod wallet_details;

use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use balance::{format_units, BalanceInput, BalanceTool};
pub use rebalance::{DiscoverRebalanceTool, RebalanceLiquidityTool};
pub use registry::ToolRegistry;
pub use wallet_details::{EmptyArgs, WalletDetailsTool};

pub const TOOL_WALLET_DETAILS: &str = "get_wallet_details";
pub const TOOL_BALANCE: &str = "get_balance";
pub const TOOL_REBALANCE_LIQUIDITY: &str = "rebalance_liquidity";

/// Object-safe tool interface used by the registry and the agent loop
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the argument object
    fn input_schema(&self) -> Value;

    /// Run the tool; the returned text is shown to the model
    async fn execute(&self, args: Value) -> Result<String>;
}

/// Tool with a typed argument struct
#[async_trait]
pub trait TypedTool: Send + Sync {
    const NAME: &'static str;
    type Input: DeserializeOwned + JsonSchema + Send;

    fn description(&self) -> &'static str;

    async fn run(&self, input: Self::Input) -> Result<String>;
}

#[async_trait]
impl<T: TypedTool> AgentTool for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        TypedTool::description(self)
    }

    fn input_schema(&self) -> Value {
        let mut schema = serde_json::to_value(schemars::schema_for!(T::Input))
            .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
        if let Value::Object(ref mut map) = schema {
            map.remove("$schema");
            map.remove("title");
        }
        schema
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args
        };
        let input: T::Input = serde_json::from_value(args).map_err(|e| {
            Error::InvalidArgument(format!("Invalid arguments for {}: {}", T::NAME, e))
        })?;
        self.run(input).await
    }
}
