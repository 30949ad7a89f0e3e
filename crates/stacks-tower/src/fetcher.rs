//! State fetcher: one round of read-only calls assembled into a [TowerState].
//!
//! Failure policy: never propagate. Any read failure yields the default snapshot
//! (height `"0"`, no stacker) together with the error, so there is always something to
//! render and the error is reported out of band. Never a partial snapshot.

use crate::config::TowerConfig;
use crate::decode::{cmp_unsigned, decode_optional_principal, decode_unsigned};
use crate::error::ReadError;
use crate::rpc::{ContractReader, ReadOnlyCall};
use serde::Serialize;
use std::cmp::Ordering;

/// Nominal sender for read-only calls; never used to sign.
pub const READ_ONLY_SENDER: &str = "SP2C2YFP12AJZB4MABJBAJ55XECVS7E4PMMZ89YZR";

pub const FN_GET_HEIGHT: &str = "get-height";
pub const FN_GET_LAST_STACKER: &str = "get-last-stacker";
pub const FN_GET_LAST_STACKED_AT: &str = "get-last-stacked-at";

/// Immutable snapshot of the tower contract. Replaced wholesale on each fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerState {
    /// Decimal text; compare with [TowerState::height_exceeds], not lexicographically.
    pub height: String,
    pub last_stacker: Option<String>,
    /// Block height of the last stack.
    pub last_stacked_at: Option<String>,
}

impl Default for TowerState {
    fn default() -> Self {
        Self {
            height: "0".to_string(),
            last_stacker: None,
            last_stacked_at: None,
        }
    }
}

impl TowerState {
    /// True if `height` is numerically greater than `baseline`.
    pub fn height_exceeds(&self, baseline: &str) -> bool {
        cmp_unsigned(&self.height, baseline) == Some(Ordering::Greater)
    }
}

/// Result of [StateFetcher::fetch_state]: always a renderable state, plus the read error if any.
#[derive(Debug)]
pub struct Snapshot {
    pub state: TowerState,
    pub error: Option<ReadError>,
}

pub struct StateFetcher<R> {
    reader: R,
    config: TowerConfig,
}

impl<R: ContractReader> StateFetcher<R> {
    pub fn new(reader: R, config: TowerConfig) -> Self {
        Self { reader, config }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn config(&self) -> &TowerConfig {
        &self.config
    }

    fn call(&self, function_name: &str) -> ReadOnlyCall {
        ReadOnlyCall {
            network: self.config.network,
            contract: self.config.contract.clone(),
            function_name: function_name.to_string(),
            function_args: Vec::new(),
            sender: READ_ONLY_SENDER.to_string(),
        }
    }

    /// Fetch a snapshot. Does not fail; see the module docs for the error policy.
    pub async fn fetch_state(&self) -> Snapshot {
        match self.read_state().await {
            Ok(state) => Snapshot { state, error: None },
            Err(e) => {
                tracing::warn!(reason = %e, contract = %self.config.contract, "tower state fetch failed, using default");
                Snapshot {
                    state: TowerState::default(),
                    error: Some(e),
                }
            }
        }
    }

    async fn read_state(&self) -> Result<TowerState, ReadError> {
        let height_call = self.call(FN_GET_HEIGHT);
        let stacker_call = self.call(FN_GET_LAST_STACKER);
        let stacked_at_call = self.call(FN_GET_LAST_STACKED_AT);
        let (height, stacker, stacked_at) = tokio::try_join!(
            self.reader.call_read_only(&height_call),
            self.reader.call_read_only(&stacker_call),
            self.reader.call_read_only(&stacked_at_call),
        )?;

        let state = TowerState {
            height: decode_unsigned(&height).unwrap_or_else(|| {
                tracing::debug!(tag = height.tag(), "height not decodable, treating as 0");
                "0".to_string()
            }),
            last_stacker: decode_optional_principal(&stacker),
            last_stacked_at: decode_unsigned(&stacked_at),
        };
        if state.last_stacker.is_some() != state.last_stacked_at.is_some() {
            tracing::debug!(
                last_stacker = ?state.last_stacker,
                last_stacked_at = ?state.last_stacked_at,
                "last stacker and last-stacked block disagree on presence"
            );
        }
        Ok(state)
    }
}
