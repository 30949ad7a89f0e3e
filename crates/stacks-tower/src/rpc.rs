//! Contract-read capability: read-only calls against a Stacks node API.
//!
//! [ContractReader] is the seam the fetcher depends on; [StacksApiClient] implements it over
//! `POST /v2/contracts/call-read/{address}/{name}/{function}`.

use crate::clarity::RawValue;
use crate::config::{ContractId, NetworkKind, TowerConfig};
use crate::error::ReadError;
use async_trait::async_trait;
use serde_json::{json, Value};

/// One read-only function call. Read-only calls need a sender but are never signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOnlyCall {
    pub network: NetworkKind,
    pub contract: ContractId,
    pub function_name: String,
    /// Hex-serialized Clarity arguments.
    pub function_args: Vec<String>,
    pub sender: String,
}

/// Issues read-only contract calls. Never mutates chain state.
#[async_trait]
pub trait ContractReader: Send + Sync {
    async fn call_read_only(&self, call: &ReadOnlyCall) -> Result<RawValue, ReadError>;
}

/// HTTP client for a Stacks node (or Hiro API) bound to one network.
#[derive(Debug, Clone)]
pub struct StacksApiClient {
    http_client: reqwest::Client,
    api_url: String,
    network: NetworkKind,
}

impl StacksApiClient {
    pub fn new(api_url: impl Into<String>, network: NetworkKind) -> Result<Self, ReadError> {
        let http_client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            network,
        })
    }

    pub fn from_config(config: &TowerConfig) -> Result<Self, ReadError> {
        Self::new(config.api_url.clone(), config.network)
    }

    fn call_url(&self, call: &ReadOnlyCall) -> String {
        format!(
            "{}/v2/contracts/call-read/{}/{}/{}",
            self.api_url, call.contract.address, call.contract.name, call.function_name
        )
    }
}

#[async_trait]
impl ContractReader for StacksApiClient {
    async fn call_read_only(&self, call: &ReadOnlyCall) -> Result<RawValue, ReadError> {
        if call.network != self.network {
            return Err(ReadError::Rejected(format!(
                "call targets {} but client is bound to {}",
                call.network, self.network
            )));
        }
        let body = json!({
            "sender": call.sender,
            "arguments": call.function_args,
        });
        let resp = self
            .http_client
            .post(self.call_url(call))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReadError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let json: Value = resp.json().await?;
        let value = parse_call_read_response(&json)?;
        tracing::debug!(function = %call.function_name, tag = value.tag(), "read-only call");
        Ok(value)
    }
}

/// Parse a call-read response body: `{"okay": true, "result": "0x..."}` or
/// `{"okay": false, "cause": "..."}`. A JSON-object `result` is read as a cvToJSON shape.
pub fn parse_call_read_response(json: &Value) -> Result<RawValue, ReadError> {
    let okay = json
        .get("okay")
        .and_then(Value::as_bool)
        .ok_or_else(|| ReadError::Malformed("missing okay".into()))?;
    if !okay {
        let cause = json
            .get("cause")
            .and_then(Value::as_str)
            .unwrap_or("no cause given");
        return Err(ReadError::Rejected(cause.to_string()));
    }
    match json.get("result") {
        Some(Value::String(s)) => RawValue::from_hex(s),
        Some(v @ Value::Object(_)) => Ok(RawValue::from_json(v)),
        Some(_) => Err(ReadError::Malformed("result is neither hex nor object".into())),
        None => Err(ReadError::Malformed("missing result".into())),
    }
}
