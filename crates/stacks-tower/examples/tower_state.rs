//! Example: read the tower contract state from a Stacks node and print it as JSON.
//!
//! Runs the three read-only calls once (or every N seconds with `--watch N`) and prints one
//! JSON line per snapshot. Fetch failures are logged and print the default snapshot.
//!
//! Usage:
//!
//!   cargo run -p stacks-tower --example tower_state -- --contract <ADDRESS>.<NAME> [--network testnet] [--api-url <URL>] [--watch <SECS>]
//!
//!   cargo run -p stacks-tower --example tower_state -- --contract ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQYAC0RQ.stacks-tower --watch 10

use anyhow::{Context, Result};
use stacks_tower::{ContractId, NetworkKind, StacksApiClient, StateFetcher, TowerConfig, TowerState};
use std::time::Duration;

const USAGE: &str = "Usage: tower_state --contract <ADDRESS>.<NAME> [--network mainnet|testnet] [--api-url <URL>] [--watch <SECS>]";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args: Vec<String> = std::env::args().collect();
    let mut contract = String::new();
    let mut network = NetworkKind::Testnet;
    let mut api_url: Option<String> = None;
    let mut watch_secs: Option<u64> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--contract" => {
                i += 1;
                contract = args.get(i).cloned().unwrap_or_default();
            }
            "--network" => {
                i += 1;
                let s = args.get(i).cloned().unwrap_or_default();
                network = s.parse().map_err(anyhow::Error::msg)?;
            }
            "--api-url" => {
                i += 1;
                api_url = args.get(i).cloned();
            }
            "--watch" => {
                i += 1;
                let s = args.get(i).cloned().unwrap_or_default();
                watch_secs = Some(s.parse().context("--watch expects seconds")?);
            }
            "--help" | "-h" => {
                eprintln!(
                    "{}\n\
                     Prints the tower height, last stacker, and last-stacked block as JSON.\n\
                     --api-url defaults to the public Hiro API for the network.",
                    USAGE
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }
    if contract.is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }
    let contract: ContractId = contract.parse().map_err(anyhow::Error::msg)?;

    let mut config = TowerConfig::new(network, contract);
    if let Some(url) = api_url {
        config = config.with_api_url(url);
    }
    let client = StacksApiClient::from_config(&config).context("build HTTP client")?;
    let fetcher = StateFetcher::new(client, config);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(fetcher, watch_secs))
}

async fn run(fetcher: StateFetcher<StacksApiClient>, watch_secs: Option<u64>) -> Result<()> {
    let Some(secs) = watch_secs else {
        let snapshot = fetcher.fetch_state().await;
        println!("{}", serde_json::to_string(&snapshot.state)?);
        return Ok(());
    };
    let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
    let mut last: Option<TowerState> = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = fetcher.fetch_state().await;
                if snapshot.error.is_none() && last.as_ref() == Some(&snapshot.state) {
                    continue;
                }
                println!("{}", serde_json::to_string(&snapshot.state)?);
                last = Some(snapshot.state);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
