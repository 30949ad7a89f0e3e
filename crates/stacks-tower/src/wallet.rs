//! Wallet capability: connection state and signed contract-call submission.
//!
//! Signing and transaction construction belong to the wallet; this crate only asks for a
//! `stx_callContract` and reads back the optional transaction id.

use crate::config::{NetworkKind, TowerConfig};
use crate::error::WalletError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wallet RPC method used to submit a contract call.
pub const CALL_CONTRACT_METHOD: &str = "stx_callContract";

/// Params of a `stx_callContract` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    /// `<address>.<name>`
    pub contract: String,
    pub function_name: String,
    pub function_args: Vec<String>,
    pub network: NetworkKind,
}

impl ContractCall {
    /// Zero-argument call to `function_name` on the configured contract.
    pub fn new(config: &TowerConfig, function_name: impl Into<String>) -> Self {
        Self {
            contract: config.contract.to_string(),
            function_name: function_name.into(),
            function_args: Vec::new(),
            network: config.network,
        }
    }
}

/// Result of a submitted call. Some wallets return no txid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
}

#[async_trait]
pub trait Wallet: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Errors on user rejection or when no wallet is available.
    async fn connect(&self) -> Result<(), WalletError>;

    /// Raw wallet RPC request.
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;

    /// Submit a signed contract call (`stx_callContract`).
    async fn call_contract(&self, call: &ContractCall) -> Result<CallResponse, WalletError> {
        let params = serde_json::to_value(call)
            .map_err(|e| WalletError::Submission(format!("encode call params: {}", e)))?;
        let response = self.request(CALL_CONTRACT_METHOD, params).await?;
        serde_json::from_value(response)
            .map_err(|e| WalletError::Submission(format!("malformed wallet response: {}", e)))
    }
}
