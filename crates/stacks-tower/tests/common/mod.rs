//! Scripted fakes for the contract-read and wallet capabilities.
//! Some helpers are only used by specific test binaries; allow dead_code to avoid per-binary warnings.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use stacks_tower::fetcher::{FN_GET_HEIGHT, FN_GET_LAST_STACKED_AT, FN_GET_LAST_STACKER};
use stacks_tower::wallet::CALL_CONTRACT_METHOD;
use stacks_tower::{
    ContractCall, ContractId, ContractReader, NetworkKind, PollConfig, RawValue,
    ReadError, ReadOnlyCall, TowerConfig, Wallet, WalletError,
};

pub const STACKER: &str = "SP2C2YFP12AJZB4MABJBAJ55XECVS7E4PMMZ89YZR";

pub fn config() -> TowerConfig {
    TowerConfig::new(
        NetworkKind::Testnet,
        ContractId::new("ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQYAC0RQ", "stacks-tower"),
    )
    .with_api_url("http://127.0.0.1:3999")
}

pub fn config_with_timeout(timeout_secs: u64) -> TowerConfig {
    config().with_poll(PollConfig {
        timeout: std::time::Duration::from_secs(timeout_secs),
        ..PollConfig::default()
    })
}

pub fn ok(v: RawValue) -> RawValue {
    RawValue::ResponseOk(Some(Box::new(v)))
}

pub fn ok_uint(n: &str) -> RawValue {
    ok(RawValue::UInt(Some(n.to_string())))
}

pub fn ok_some_principal(addr: &str) -> RawValue {
    ok(RawValue::Optional(Some(Box::new(RawValue::Principal(Some(
        addr.to_string(),
    ))))))
}

pub fn ok_none() -> RawValue {
    ok(RawValue::Optional(None))
}

enum Scripted {
    Value(RawValue),
    Fail(String),
}

struct Entry {
    outcome: Scripted,
    delay: Duration,
}

/// Per-function response queues. The last entry of each queue repeats forever.
/// Entries may carry a delay, served on the tokio clock.
#[derive(Default)]
pub struct ScriptedReader {
    queues: Mutex<HashMap<String, VecDeque<Entry>>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Heights served in order, with a fixed stacker and block.
    pub fn with_heights(heights: &[&str]) -> Self {
        let reader = Self::new();
        for h in heights {
            reader.push(FN_GET_HEIGHT, ok_uint(h));
        }
        reader.push(FN_GET_LAST_STACKER, ok_some_principal(STACKER));
        reader.push(FN_GET_LAST_STACKED_AT, ok_uint("150000"));
        reader
    }

    pub fn push(&self, function: &str, value: RawValue) {
        self.enqueue(function, Scripted::Value(value), Duration::ZERO);
    }

    pub fn push_delayed(&self, function: &str, value: RawValue, delay: Duration) {
        self.enqueue(function, Scripted::Value(value), delay);
    }

    pub fn push_failure(&self, function: &str, cause: &str) {
        self.enqueue(function, Scripted::Fail(cause.to_string()), Duration::ZERO);
    }

    fn enqueue(&self, function: &str, outcome: Scripted, delay: Duration) {
        self.queues
            .lock()
            .unwrap()
            .entry(function.to_string())
            .or_default()
            .push_back(Entry { outcome, delay });
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most reads observed pending at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next(&self, function: &str) -> (Result<RawValue, ReadError>, Duration) {
        let mut queues = self.queues.lock().unwrap();
        let Some(queue) = queues.get_mut(function) else {
            return (Err(ReadError::Rejected(format!("no script for {}", function))), Duration::ZERO);
        };
        let popped = if queue.len() > 1 { queue.pop_front() } else { None };
        let Some(entry) = popped.as_ref().or(queue.front()) else {
            return (Err(ReadError::Rejected("empty script".into())), Duration::ZERO);
        };
        let result = match &entry.outcome {
            Scripted::Value(v) => Ok(v.clone()),
            Scripted::Fail(cause) => Err(ReadError::Rejected(cause.clone())),
        };
        (result, entry.delay)
    }
}

#[async_trait]
impl ContractReader for ScriptedReader {
    async fn call_read_only(&self, call: &ReadOnlyCall) -> Result<RawValue, ReadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (result, delay) = self.next(&call.function_name);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Wallet fake: fixed connection state and call outcome, optional gate to hold calls in flight.
pub struct FakeWallet {
    connected: AtomicBool,
    txid: Option<String>,
    call_error: Option<String>,
    connect_error: Option<String>,
    gate: Option<Arc<Notify>>,
    submissions: AtomicUsize,
    last_call: Mutex<Option<ContractCall>>,
}

impl FakeWallet {
    pub fn connected(txid: Option<&str>) -> Self {
        Self {
            connected: AtomicBool::new(true),
            txid: txid.map(str::to_string),
            call_error: None,
            connect_error: None,
            gate: None,
            submissions: AtomicUsize::new(0),
            last_call: Mutex::new(None),
        }
    }

    pub fn disconnected() -> Self {
        let w = Self::connected(None);
        w.connected.store(false, Ordering::SeqCst);
        w
    }

    pub fn failing_call(message: &str) -> Self {
        Self {
            call_error: Some(message.to_string()),
            ..Self::connected(None)
        }
    }

    pub fn failing_connect(message: &str) -> Self {
        Self {
            connect_error: Some(message.to_string()),
            ..Self::disconnected()
        }
    }

    /// Calls block until the returned `Notify` is notified.
    pub fn gated(txid: Option<&str>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let w = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::connected(txid)
        };
        (w, gate)
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<ContractCall> {
        self.last_call.lock().unwrap().clone()
    }
}

#[async_trait]
impl Wallet for FakeWallet {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> Result<(), WalletError> {
        if let Some(msg) = &self.connect_error {
            return Err(WalletError::Rejected(msg.clone()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        assert_eq!(method, CALL_CONTRACT_METHOD);
        let call: ContractCall = serde_json::from_value(params).expect("stx_callContract params");
        self.submissions.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().unwrap() = Some(call);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(msg) = &self.call_error {
            return Err(WalletError::Submission(msg.clone()));
        }
        Ok(match &self.txid {
            Some(txid) => json!({ "txid": txid }),
            None => json!({}),
        })
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stacks_tower=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}
