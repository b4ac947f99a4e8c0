//! Watches one account on a simulated ledger node, exercising queries,
//! signing-key validation, subscriptions and notification dispatch.

mod cli;
mod config;
mod sim;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use keel_xrpl_connector::address::{resolve_signing_address, Address};
use keel_xrpl_connector::entry::Fields;
use keel_xrpl_connector::events::{AccountEvent, EventKind};
use keel_xrpl_connector::gateway::{LedgerGateway, TrustLine};
use keel_xrpl_connector::registry::AccountRegistry;
use keel_xrpl_connector::submitter::TransactionSubmitter;
use serde_json::json;
use tokio::time;

use cli::{Cli, Commands};
use config::{load_config, WatchConfig};
use sim::SimNode;

/// Master public key of the default watched account.
const MASTER_PUBLIC_KEY: &str =
    "0330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020";

/// Counterparty for simulated payments; starts out unfunded.
const PEER_ADDRESS: &str = "rrrrrrrrrrrrrrrrrrrrBZbvji";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let Commands::Run(run_cmd) = cli.command;
    let config = load_config_from_cli(run_cmd)?;
    keel_xrpl_logger::init(&config.log)?;
    tracing::info!("Configuration loaded: {:#?}", &config);
    run_watch(config).await
}

/// Loads the demo configuration based on the provided CLI command.
fn load_config_from_cli(run_cmd: cli::RunCmd) -> Result<WatchConfig> {
    if let Some(config_path) = run_cmd.config {
        println!("Loading configuration from '{}'", &config_path);
        load_config(&config_path)
    } else {
        println!("No config file provided, using default settings.");
        Ok(WatchConfig::default())
    }
}

async fn run_watch(config: WatchConfig) -> Result<()> {
    let watched: Address = config.watch.account.parse()?;
    let peer: Address = PEER_ADDRESS.parse()?;
    let delay = Duration::from_millis(config.watch.round_delay_ms);

    let node = Arc::new(SimNode::new(&config.connector.node.ws_url));
    node.fund(&watched, 100_000_000_000, 5);
    node.add_line(
        &watched,
        TrustLine {
            account: peer.clone(),
            currency: "USD".to_string(),
            balance: "50".to_string(),
            limit: "1000".to_string(),
            limit_peer: "0".to_string(),
            quality_in: 0,
            quality_out: 0,
            no_ripple: false,
        },
    );

    let gateway: Arc<dyn LedgerGateway> = node.clone();
    let submitter: Arc<dyn TransactionSubmitter> = node.clone();
    let registry = Arc::new(AccountRegistry::new(
        Arc::new(config.connector.clone()),
        gateway,
        Some(submitter),
    ));
    let account = registry.account(&watched);

    println!(
        "[watch] {} is a valid classic address: {}",
        watched,
        Address::is_valid(watched.as_str())
    );
    println!(
        "[watch] master key resolves to {}",
        resolve_signing_address(MASTER_PUBLIC_KEY)?
    );

    let entry = account.entry().await?;
    println!(
        "[watch] entry: sequence {:?}, balance {:?}",
        entry.sequence(),
        entry.balance()
    );
    println!("[watch] next sequence: {}", account.next_sequence().await?);

    let lines = account.lines().await?;
    println!("[watch] {} trust line(s) cached", lines.len());
    println!(
        "[watch] USD line against {}: {}",
        peer,
        account.line("USD", &peer).await?.is_some()
    );

    for candidate in [MASTER_PUBLIC_KEY, watched.as_str(), "not-a-key"] {
        match account.public_key_is_active(candidate).await {
            Ok(active) => println!("[watch] signing key '{}' active: {}", candidate, active),
            Err(err) => println!("[watch] signing key '{}' rejected: {}", candidate, err),
        }
    }

    let mut entry_events = account.subscribe(EventKind::Entry).await?;
    let mut tx_events = account.subscribe(EventKind::Transaction).await?;
    let mut inbound_events = account.subscribe(EventKind::TransactionInbound).await?;
    let mut balance_events = account.subscribe(EventKind::Balance).await?.into_stream();
    println!(
        "[watch] subscriber count: {} (only entry and transaction listeners count)",
        account.subscriber_count().await?
    );
    println!(
        "[watch] node subscription set: {:?}",
        node.subscribed_accounts()
    );

    let feeder = {
        let node = Arc::clone(&node);
        let registry = Arc::clone(&registry);
        let watched = watched.clone();
        let peer = peer.clone();
        let rounds = config.watch.rounds;
        tokio::spawn(async move {
            let mut interval = time::interval(delay);
            for round in 0..rounds {
                interval.tick().await;
                if round == rounds / 2 {
                    println!("[sim] dropping the node connection");
                    node.drop_connection();
                    time::sleep(delay).await;
                    node.restore_connection();
                    time::sleep(delay).await;
                    println!(
                        "[sim] node subscription set after reconnect: {:?}",
                        node.subscribed_accounts()
                    );
                }
                let notification = if round % 2 == 0 {
                    node.payment(&watched, &peer, 25_000_000)
                } else {
                    node.payment(&peer, &watched, 5_000_000)
                };
                let delivered = registry.dispatch(notification).await;
                println!(
                    "[sim] round {}: notification delivered to {} tracker(s)",
                    round + 1,
                    delivered
                );
            }
        })
    };

    loop {
        tokio::select! {
            Some(event) = entry_events.next_event() => {
                if let AccountEvent::Entry(entry) = event {
                    println!(
                        "[event] entry: sequence {:?}, balance {:?}",
                        entry.sequence(),
                        entry.balance()
                    );
                }
            }
            Some(event) = tx_events.next_event() => {
                if let AccountEvent::Transaction(notification) = event {
                    println!(
                        "[event] transaction {} in ledger {:?}",
                        notification.transaction_type().unwrap_or("?"),
                        notification.ledger_index
                    );
                }
            }
            Some(event) = inbound_events.next_event() => {
                if let AccountEvent::TransactionInbound(notification) = event {
                    println!(
                        "[event] inbound payment from {:?}",
                        notification.account()
                    );
                }
            }
            Some(event) = balance_events.next() => {
                if let AccountEvent::Balance(balance) = event {
                    println!("[event] balance moved to {} drops", balance);
                }
            }
            _ = time::sleep(delay * 5) => break,
        }
    }
    feeder.await?;

    let snapshot = account.snapshot().await?;
    println!(
        "[watch] final cached entry: sequence {:?}, balance {:?}",
        snapshot.sequence(),
        snapshot.balance()
    );
    println!(
        "[watch] cached trust lines: {}",
        account.cached_lines().await?.len()
    );

    let mut close_request = Fields::new();
    close_request.insert("TransactionType".to_string(), json!("AccountSet"));
    close_request.insert("Account".to_string(), json!(watched));
    account.submit(close_request).await?;
    println!("[watch] submitted an AccountSet through the submitter seam");

    entry_events.close().await;
    tx_events.close().await;
    inbound_events.close().await;
    balance_events.close().await;
    println!(
        "[watch] subscriber count after close: {}",
        account.subscriber_count().await?
    );
    println!(
        "[watch] node subscription set: {:?}",
        node.subscribed_accounts()
    );

    registry.shutdown().await;
    Ok(())
}
