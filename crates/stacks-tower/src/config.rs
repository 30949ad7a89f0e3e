//! Client configuration: network, contract identity, and confirmation polling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Stacks network the contract is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Mainnet,
    Testnet,
}

impl NetworkKind {
    /// Public Hiro API endpoint for this network.
    pub fn default_api_url(self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "https://api.mainnet.hiro.so",
            NetworkKind::Testnet => "https://api.testnet.hiro.so",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "mainnet",
            NetworkKind::Testnet => "testnet",
        }
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(NetworkKind::Mainnet),
            "testnet" => Ok(NetworkKind::Testnet),
            other => Err(format!("unknown network '{}' (expected mainnet or testnet)", other)),
        }
    }
}

/// Fully qualified contract identifier: `<address>.<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractId {
    pub address: String,
    pub name: String,
}

impl ContractId {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}

impl FromStr for ContractId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, name) = s
            .split_once('.')
            .ok_or_else(|| format!("contract id '{}' must be <address>.<name>", s))?;
        if address.is_empty() || name.is_empty() || name.contains('.') {
            return Err(format!("contract id '{}' must be <address>.<name>", s));
        }
        if !address.starts_with('S') {
            return Err(format!("contract address '{}' is not a Stacks address", address));
        }
        Ok(ContractId::new(address, name))
    }
}

/// Immutable client configuration, built once and passed to each component.
#[derive(Debug, Clone)]
pub struct TowerConfig {
    pub network: NetworkKind,
    /// Node API base URL for read-only calls.
    pub api_url: String,
    pub contract: ContractId,
    pub poll: PollConfig,
}

impl TowerConfig {
    /// Config using the network's public API endpoint and default polling.
    pub fn new(network: NetworkKind, contract: ContractId) -> Self {
        Self {
            network,
            api_url: network.default_api_url().to_string(),
            contract,
            poll: PollConfig::default(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }
}

/// Confirmation polling: fixed interval, bounded by a total timeout.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(4),
            timeout: Duration::from_secs(60),
        }
    }
}
