//! An in-process ledger node for the demo.
//!
//! `SimNode` keeps a handful of account roots in memory, hands out
//! canned query responses, records subscribe/unsubscribe requests and
//! can stage a disconnect/reconnect cycle. Payments update the stored
//! roots and come back as wire-shaped notifications, so everything the
//! connector sees looks like a real node stream.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use keel_xrpl_connector::address::Address;
use keel_xrpl_connector::entry::Fields;
use keel_xrpl_connector::error::GatewayError;
use keel_xrpl_connector::gateway::{
    AccountInfoResponse, AccountLinesResponse, ConnectionSignal, LedgerGateway, TrustLine,
};
use keel_xrpl_connector::meta::TransactionNotification;
use keel_xrpl_connector::submitter::TransactionSubmitter;
use serde_json::{json, Value};
use tokio::sync::broadcast;

const FEE_DROPS: u64 = 10;

/// A tiny in-memory ledger node.
pub struct SimNode {
    accounts: Mutex<HashMap<Address, Fields>>,
    lines: Mutex<HashMap<Address, Vec<TrustLine>>>,
    subscriptions: Mutex<HashSet<Address>>,
    connected: AtomicBool,
    signals: broadcast::Sender<ConnectionSignal>,
    ledger_index: AtomicU64,
}

impl SimNode {
    pub fn new(ws_url: &str) -> Self {
        let (signals, _) = broadcast::channel(16);
        tracing::info!("Simulated node standing in for {}", ws_url);
        Self {
            accounts: Mutex::new(HashMap::new()),
            lines: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashSet::new()),
            connected: AtomicBool::new(true),
            signals,
            ledger_index: AtomicU64::new(1000),
        }
    }

    /// Creates a funded account root.
    pub fn fund(&self, address: &Address, drops: u64, sequence: u64) {
        let root = object(json!({
            "Account": address,
            "Balance": drops.to_string(),
            "Sequence": sequence,
            "Flags": 0,
        }));
        self.accounts
            .lock()
            .expect("account table poisoned")
            .insert(address.clone(), root);
    }

    /// Adds a trust line to an account's `account_lines` answer.
    pub fn add_line(&self, address: &Address, line: TrustLine) {
        self.lines
            .lock()
            .expect("line table poisoned")
            .entry(address.clone())
            .or_default()
            .push(line);
    }

    /// Applies a payment to the stored roots and returns the
    /// notification a node would push for it. Paying an account the
    /// ledger has never seen creates its root.
    pub fn payment(&self, from: &Address, to: &Address, drops: u64) -> TransactionNotification {
        let ledger_index = self.ledger_index.fetch_add(1, Ordering::SeqCst) + 1;
        let mut accounts = self.accounts.lock().expect("account table poisoned");

        let sender_root = accounts.get(from).cloned().unwrap_or_default();
        let sender_balance = balance_of(&sender_root);
        let sender_sequence = sequence_of(&sender_root);
        let sender_final = object(json!({
            "Account": from,
            "Balance": sender_balance.saturating_sub(drops + FEE_DROPS).to_string(),
            "Sequence": sender_sequence + 1,
            "Flags": sender_root.get("Flags").cloned().unwrap_or(json!(0)),
        }));
        accounts.insert(from.clone(), sender_final.clone());

        let sender_node = json!({
            "ModifiedNode": {
                "LedgerEntryType": "AccountRoot",
                "LedgerIndex": format!("{:064X}", ledger_index * 7),
                "FinalFields": sender_final,
                "PreviousFields": {
                    "Balance": sender_balance.to_string(),
                    "Sequence": sender_sequence,
                },
            }
        });

        let receiver_node = match accounts.get(to).cloned() {
            Some(mut receiver_final) => {
                let receiver_balance = balance_of(&receiver_final);
                receiver_final.insert(
                    "Balance".to_string(),
                    json!((receiver_balance + drops).to_string()),
                );
                accounts.insert(to.clone(), receiver_final.clone());
                json!({
                    "ModifiedNode": {
                        "LedgerEntryType": "AccountRoot",
                        "LedgerIndex": format!("{:064X}", ledger_index * 11),
                        "FinalFields": receiver_final,
                        "PreviousFields": { "Balance": receiver_balance.to_string() },
                    }
                })
            }
            None => {
                let receiver_new = object(json!({
                    "Account": to,
                    "Balance": drops.to_string(),
                    "Sequence": 1,
                    "Flags": 0,
                }));
                accounts.insert(to.clone(), receiver_new.clone());
                json!({
                    "CreatedNode": {
                        "LedgerEntryType": "AccountRoot",
                        "LedgerIndex": format!("{:064X}", ledger_index * 11),
                        "NewFields": receiver_new,
                    }
                })
            }
        };
        drop(accounts);

        let notification = json!({
            "engine_result": "tesSUCCESS",
            "ledger_index": ledger_index,
            "validated": true,
            "meta": {
                "AffectedNodes": [sender_node, receiver_node],
                "TransactionIndex": 0,
                "TransactionResult": "tesSUCCESS",
            },
            "transaction": {
                "Account": from,
                "Amount": drops.to_string(),
                "Destination": to,
                "Fee": FEE_DROPS.to_string(),
                "Sequence": sender_sequence,
                "TransactionType": "Payment",
                "hash": random_hash(),
            },
        });
        serde_json::from_value(notification).expect("well-formed notification")
    }

    /// Drops the connection. The node forgets its subscription set.
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.subscriptions
            .lock()
            .expect("subscription set poisoned")
            .clear();
        let _ = self.signals.send(ConnectionSignal::Disconnected);
    }

    /// Restores the connection and asks trackers to re-announce.
    pub fn restore_connection(&self) {
        self.connected.store(true, Ordering::SeqCst);
        let _ = self.signals.send(ConnectionSignal::PrepareSubscribe);
        let _ = self.signals.send(ConnectionSignal::Connected);
    }

    /// The accounts the node currently pushes notifications for.
    pub fn subscribed_accounts(&self) -> Vec<Address> {
        let mut accounts: Vec<Address> = self
            .subscriptions
            .lock()
            .expect("subscription set poisoned")
            .iter()
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        accounts
    }

    fn ensure_connected(&self) -> Result<(), GatewayError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(GatewayError::Transport("connection is down".to_string()))
        }
    }
}

#[async_trait]
impl LedgerGateway for SimNode {
    async fn account_info(
        &self,
        address: &Address,
    ) -> Result<AccountInfoResponse, GatewayError> {
        self.ensure_connected()?;
        let accounts = self.accounts.lock().expect("account table poisoned");
        match accounts.get(address) {
            Some(root) => Ok(AccountInfoResponse {
                account_data: root.clone(),
                ledger_index: Some(self.ledger_index.load(Ordering::SeqCst)),
                validated: true,
            }),
            None => Err(GatewayError::account_not_found()),
        }
    }

    async fn account_lines(
        &self,
        address: &Address,
    ) -> Result<AccountLinesResponse, GatewayError> {
        self.ensure_connected()?;
        let lines = self.lines.lock().expect("line table poisoned");
        Ok(AccountLinesResponse {
            lines: lines.get(address).cloned().unwrap_or_default(),
            ledger_index: Some(self.ledger_index.load(Ordering::SeqCst)),
        })
    }

    async fn subscribe_accounts(&self, accounts: &[Address]) -> Result<(), GatewayError> {
        self.ensure_connected()?;
        let mut subscriptions = self.subscriptions.lock().expect("subscription set poisoned");
        for address in accounts {
            subscriptions.insert(address.clone());
        }
        Ok(())
    }

    async fn unsubscribe_accounts(&self, accounts: &[Address]) -> Result<(), GatewayError> {
        self.ensure_connected()?;
        let mut subscriptions = self.subscriptions.lock().expect("subscription set poisoned");
        for address in accounts {
            subscriptions.remove(address);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn signals(&self) -> broadcast::Receiver<ConnectionSignal> {
        self.signals.subscribe()
    }
}

#[async_trait]
impl TransactionSubmitter for SimNode {
    async fn submit(&self, tx: Fields) -> Result<(), GatewayError> {
        self.ensure_connected()?;
        let tx_type = tx
            .get("TransactionType")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        tracing::info!("Simulated node accepted a {} transaction: tesSUCCESS", tx_type);
        Ok(())
    }
}

fn object(value: Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

fn balance_of(root: &Fields) -> u64 {
    root.get("Balance")
        .and_then(Value::as_str)
        .and_then(|balance| balance.parse().ok())
        .unwrap_or(0)
}

fn sequence_of(root: &Fields) -> u64 {
    root.get("Sequence").and_then(Value::as_u64).unwrap_or(1)
}

fn random_hash() -> String {
    format!(
        "{:032X}{:032X}",
        rand::random::<u128>(),
        rand::random::<u128>()
    )
}
