//! Stacking workflow and the state a view renders.
//!
//! [Tower] owns the fetcher and wallet and publishes to a [TowerView]: the latest
//! [TowerState], the latest [StackStatus] (plus every transition on a broadcast channel),
//! the last fetch error, and the `stacking` flag.
//!
//! Liveness: a `Tower` is live while a view's state receiver exists. Once every view is
//! dropped, results that arrive from suspended work are discarded instead of applied.
//! `refresh` and a stacking confirmation can both write the state; the later completion
//! wins. Concurrent `stack` calls are rejected by the in-flight gate.
//!
//! A failed fetch publishes the default state for display, but the stacking baseline only
//! ever comes from a successful read.

use crate::config::TowerConfig;
use crate::error::ReadError;
use crate::fetcher::{Snapshot, StateFetcher, TowerState};
use crate::poller::await_height_increase;
use crate::rpc::ContractReader;
use crate::wallet::{ContractCall, Wallet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

/// Mutating function on the tower contract.
pub const STACK_FUNCTION: &str = "stack";

const TXID_DISPLAY_CHARS: usize = 10;
const STACK_FAILED: &str = "Stack failed";
const CONNECT_FAILED: &str = "Connect failed";

/// User-facing status of a wallet connection or stacking attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackStatus {
    Connecting,
    Preparing,
    /// Wallet accepted the call; `txid` is absent when the wallet returned none.
    Broadcast { txid: Option<String> },
    Confirming,
    /// `height` is absent when the post-broadcast read failed on the no-txid path.
    Confirmed { height: Option<String> },
    /// Not a failure: the transaction may still land.
    ConfirmTimedOut,
    PreconditionFailed,
    Failed(String),
}

impl StackStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StackStatus::Confirmed { .. }
                | StackStatus::ConfirmTimedOut
                | StackStatus::PreconditionFailed
                | StackStatus::Failed(_)
        )
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackStatus::Connecting => f.write_str("Connecting wallet…"),
            StackStatus::Preparing => f.write_str("Preparing…"),
            StackStatus::Broadcast { txid: Some(txid) } => {
                let short: String = txid.chars().take(TXID_DISPLAY_CHARS).collect();
                write!(f, "Broadcasted: {}…", short)
            }
            StackStatus::Broadcast { txid: None } => f.write_str("Broadcast succeeded"),
            StackStatus::Confirming => f.write_str("Broadcasted. Confirming…"),
            StackStatus::Confirmed { height: Some(height) } => {
                write!(f, "Confirmed. Tower height is now {}", height)
            }
            StackStatus::Confirmed { height: None } => f.write_str("Broadcast succeeded"),
            StackStatus::ConfirmTimedOut => {
                f.write_str("Still confirming. Refresh to see the latest height.")
            }
            StackStatus::PreconditionFailed => f.write_str("Connect your wallet first"),
            StackStatus::Failed(msg) => f.write_str(msg),
        }
    }
}

/// One user-initiated stacking attempt. Lives for a single [Tower::stack] call.
#[derive(Debug, Clone)]
pub struct StackingSession {
    /// Height of the last successful read before submission; the call itself does not
    /// return the new height.
    pub baseline_height: String,
    pub started_at: Instant,
    pub status: StackStatus,
}

impl StackingSession {
    fn begin(baseline_height: String) -> Self {
        Self {
            baseline_height,
            started_at: Instant::now(),
            status: StackStatus::Preparing,
        }
    }
}

/// Receivers for everything a [Tower] publishes. Dropping the view tears it down.
pub struct TowerView {
    /// `None` until the first fetch completes.
    pub state: watch::Receiver<Option<TowerState>>,
    pub status: watch::Receiver<Option<StackStatus>>,
    /// Every status transition, in order.
    pub status_events: broadcast::Receiver<StackStatus>,
    /// Message of the last failed fetch; cleared by a successful one.
    pub error: watch::Receiver<Option<String>>,
    pub stacking: watch::Receiver<bool>,
}

/// Clears the in-flight flag when the attempt ends, including when its future is dropped.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    stacking_tx: &'a watch::Sender<bool>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.stacking_tx.send_replace(false);
    }
}

/// Tower controller: refresh, wallet connection, and the stacking workflow.
pub struct Tower<R, W> {
    fetcher: StateFetcher<R>,
    wallet: W,
    state_tx: watch::Sender<Option<TowerState>>,
    /// Last state read without error. Never the fallback default.
    last_good: watch::Sender<Option<TowerState>>,
    status_tx: watch::Sender<Option<StackStatus>>,
    status_events: broadcast::Sender<StackStatus>,
    error_tx: watch::Sender<Option<String>>,
    stacking_tx: watch::Sender<bool>,
    in_flight: AtomicBool,
}

impl<R: ContractReader, W: Wallet> Tower<R, W> {
    pub fn new(config: TowerConfig, reader: R, wallet: W) -> Self {
        let (state_tx, _) = watch::channel(None);
        let (last_good, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(None);
        let (status_events, _) = broadcast::channel(64);
        let (error_tx, _) = watch::channel(None);
        let (stacking_tx, _) = watch::channel(false);
        Self {
            fetcher: StateFetcher::new(reader, config),
            wallet,
            state_tx,
            last_good,
            status_tx,
            status_events,
            error_tx,
            stacking_tx,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &TowerConfig {
        self.fetcher.config()
    }

    pub fn fetcher(&self) -> &StateFetcher<R> {
        &self.fetcher
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Open a view. The tower stays live while any view's state receiver exists.
    pub fn subscribe(&self) -> TowerView {
        TowerView {
            state: self.state_tx.subscribe(),
            status: self.status_tx.subscribe(),
            status_events: self.status_events.subscribe(),
            error: self.error_tx.subscribe(),
            stacking: self.stacking_tx.subscribe(),
        }
    }

    pub fn is_live(&self) -> bool {
        !self.state_tx.is_closed()
    }

    pub fn current_state(&self) -> Option<TowerState> {
        self.state_tx.borrow().clone()
    }

    pub fn is_stacking(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch and publish a fresh snapshot (and its error, if any).
    pub async fn refresh(&self) -> Snapshot {
        let snapshot = self.fetcher.fetch_state().await;
        if snapshot.error.is_none() {
            self.last_good.send_replace(Some(snapshot.state.clone()));
        }
        if self.is_live() {
            self.error_tx
                .send_replace(snapshot.error.as_ref().map(|e| e.to_string()));
            self.state_tx.send_replace(Some(snapshot.state.clone()));
        } else {
            tracing::debug!("view torn down, dropping fetched state");
        }
        snapshot
    }

    /// Ask the wallet to connect. Clears the status on success.
    pub async fn connect_wallet(&self) -> Option<StackStatus> {
        self.set_status(Some(StackStatus::Connecting));
        match self.wallet.connect().await {
            Ok(()) => {
                tracing::info!("wallet connected");
                self.set_status(None);
                None
            }
            Err(e) => {
                tracing::warn!(reason = %e, "wallet connect failed");
                let status = StackStatus::Failed(e.message_or(CONNECT_FAILED));
                self.set_status(Some(status.clone()));
                Some(status)
            }
        }
    }

    /// Run one stacking attempt to a terminal status.
    ///
    /// Returns `None` without doing anything if an attempt is already in flight.
    pub async fn stack(&self) -> Option<StackStatus> {
        if self.is_stacking() {
            tracing::debug!("stack ignored: attempt already in flight");
            return None;
        }
        if !self.wallet.is_connected() {
            let status = StackStatus::PreconditionFailed;
            self.set_status(Some(status.clone()));
            return Some(status);
        }
        let _in_flight = match self.begin_stacking() {
            Some(guard) => guard,
            None => {
                tracing::debug!("stack ignored: attempt already in flight");
                return None;
            }
        };

        self.set_status(Some(StackStatus::Preparing));
        let baseline = match self.baseline_height().await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(reason = %e, "no baseline height, not submitting");
                let status = StackStatus::Failed(e.to_string());
                self.set_status(Some(status.clone()));
                return Some(status);
            }
        };
        let mut session = StackingSession::begin(baseline);
        tracing::info!(baseline = %session.baseline_height, "stacking");

        let call = ContractCall::new(self.config(), STACK_FUNCTION);
        let response = match self.wallet.call_contract(&call).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(reason = %e, "stack call failed");
                return Some(self.finish(&mut session, StackStatus::Failed(e.message_or(STACK_FAILED))));
            }
        };

        let status = match response.txid {
            Some(txid) => {
                tracing::info!(%txid, "stack broadcast");
                self.set_status(Some(StackStatus::Broadcast { txid: Some(txid) }));
                self.set_status(Some(StackStatus::Confirming));
                match await_height_increase(&self.fetcher, &session.baseline_height, &self.config().poll).await {
                    Some(state) => {
                        let height = state.height.clone();
                        self.publish_state(state);
                        StackStatus::Confirmed { height: Some(height) }
                    }
                    None => StackStatus::ConfirmTimedOut,
                }
            }
            None => {
                // Single fetch, no polling: the result may predate the submitted call.
                tracing::warn!("wallet returned no txid; refreshing once without confirmation");
                self.set_status(Some(StackStatus::Broadcast { txid: None }));
                let snapshot = self.fetcher.fetch_state().await;
                match snapshot.error {
                    None => {
                        let height = snapshot.state.height.clone();
                        self.publish_state(snapshot.state);
                        StackStatus::Confirmed { height: Some(height) }
                    }
                    Some(e) => {
                        self.publish_error(e.to_string());
                        StackStatus::Confirmed { height: None }
                    }
                }
            }
        };
        Some(self.finish(&mut session, status))
    }

    fn begin_stacking(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.stacking_tx.send_replace(true);
        Some(InFlight {
            flag: &self.in_flight,
            stacking_tx: &self.stacking_tx,
        })
    }

    /// Height from the last successful read, fetching once if there is none yet.
    async fn baseline_height(&self) -> Result<String, ReadError> {
        let known = self.last_good.borrow().as_ref().map(|s| s.height.clone());
        if let Some(height) = known {
            return Ok(height);
        }
        let snapshot = self.refresh().await;
        match snapshot.error {
            None => Ok(snapshot.state.height),
            Some(e) => Err(e),
        }
    }

    fn finish(&self, session: &mut StackingSession, status: StackStatus) -> StackStatus {
        session.status = status.clone();
        tracing::info!(
            status = %session.status,
            baseline = %session.baseline_height,
            elapsed_ms = session.started_at.elapsed().as_millis() as u64,
            "stacking finished"
        );
        self.set_status(Some(status.clone()));
        status
    }

    fn publish_state(&self, state: TowerState) {
        self.last_good.send_replace(Some(state.clone()));
        if self.is_live() {
            self.error_tx.send_replace(None);
            self.state_tx.send_replace(Some(state));
        } else {
            tracing::debug!("view torn down, dropping confirmed state");
        }
    }

    fn publish_error(&self, message: String) {
        if self.is_live() {
            self.error_tx.send_replace(Some(message));
        } else {
            tracing::debug!("view torn down, dropping fetch error");
        }
    }

    fn set_status(&self, status: Option<StackStatus>) {
        if !self.is_live() {
            tracing::debug!(?status, "view torn down, dropping status");
            return;
        }
        if let Some(s) = &status {
            let _ = self.status_events.send(s.clone());
        }
        self.status_tx.send_replace(status);
    }
}
