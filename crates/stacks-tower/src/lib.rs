//! Off-chain Stacks Tower client: contract-state sync and stack confirmation for the tower
//! counter contract.
//!
//! - **Decoding**: [RawValue] models a read-only call's return value (node hex serialization
//!   or cvToJSON shapes); [decode_unsigned] and [decode_optional_principal] extract typed
//!   fields and yield `None` for any shape they do not recognize.
//! - **StateFetcher**: three concurrent read-only calls assembled into a [TowerState];
//!   failures produce the default snapshot plus an out-of-band error.
//! - **Poller**: [await_height_increase] re-fetches at a fixed interval until the height
//!   rises above a baseline or a timeout elapses.
//! - **Tower**: the stacking workflow (wallet check, `stack` call, confirmation) and the
//!   channels a view renders from.

pub mod c32;
pub mod clarity;
pub mod config;
pub mod decode;
pub mod error;
pub mod fetcher;
pub mod poller;
pub mod rpc;
pub mod wallet;
pub mod workflow;

pub use clarity::RawValue;
pub use config::{ContractId, NetworkKind, PollConfig, TowerConfig};
pub use decode::{cmp_unsigned, decode_optional_principal, decode_unsigned};
pub use error::{ReadError, WalletError};
pub use fetcher::{Snapshot, StateFetcher, TowerState, READ_ONLY_SENDER};
pub use poller::{await_height_increase, poll_until};
pub use rpc::{ContractReader, ReadOnlyCall, StacksApiClient};
pub use wallet::{CallResponse, ContractCall, Wallet};
pub use workflow::{StackStatus, StackingSession, Tower, TowerView};
