#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use keel_xrpl_connector::account::AccountHandle;
use keel_xrpl_connector::address::Address;
use keel_xrpl_connector::config::ConnectorConfig;
use keel_xrpl_connector::entry::Fields;
use keel_xrpl_connector::error::GatewayError;
use keel_xrpl_connector::events::AccountEvent;
use keel_xrpl_connector::gateway::{
    AccountInfoResponse, AccountLinesResponse, ConnectionSignal, LedgerGateway, TrustLine,
};
use keel_xrpl_connector::meta::TransactionNotification;
use keel_xrpl_connector::submitter::TransactionSubmitter;
use keel_xrpl_connector::subscription::EventSubscription;
use keel_xrpl_connector::tracker::AccountTracker;
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Genesis account of a stock test ledger.
pub const GENESIS_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
/// Hex public key controlling the genesis account.
pub const GENESIS_PUBLIC_KEY: &str =
    "0330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020";
/// Account ID 1, used as a counterparty.
pub const PEER_ADDRESS: &str = "rrrrrrrrrrrrrrrrrrrrBZbvji";
/// Account ID 0, used where an untracked address is needed.
pub const ZERO_ADDRESS: &str = "rrrrrrrrrrrrrrrrrrrrrhoLvTp";

// A scriptable in-memory gateway that records every node request.
pub struct MockGateway {
    info_responses: Mutex<HashMap<Address, Result<AccountInfoResponse, GatewayError>>>,
    lines_responses: Mutex<HashMap<Address, Result<AccountLinesResponse, GatewayError>>>,
    pub info_calls: Mutex<Vec<Address>>,
    pub subscribe_calls: Mutex<Vec<Vec<Address>>>,
    pub unsubscribe_calls: Mutex<Vec<Vec<Address>>>,
    connected: AtomicBool,
    signals: broadcast::Sender<ConnectionSignal>,
}

impl MockGateway {
    pub fn new() -> Self {
        let (signals, _) = broadcast::channel(16);
        Self {
            info_responses: Mutex::new(HashMap::new()),
            lines_responses: Mutex::new(HashMap::new()),
            info_calls: Mutex::new(Vec::new()),
            subscribe_calls: Mutex::new(Vec::new()),
            unsubscribe_calls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            signals,
        }
    }

    pub fn disconnected() -> Self {
        let gateway = Self::new();
        gateway.connected.store(false, Ordering::SeqCst);
        gateway
    }

    /// Scripts the `account_info` answer for `address`, replacing any
    /// previous script.
    pub fn script_info(&self, address: &Address, response: Result<AccountInfoResponse, GatewayError>) {
        self.info_responses
            .lock()
            .unwrap()
            .insert(address.clone(), response);
    }

    /// Scripts the `account_lines` answer for `address`.
    pub fn script_lines(
        &self,
        address: &Address,
        response: Result<AccountLinesResponse, GatewayError>,
    ) {
        self.lines_responses
            .lock()
            .unwrap()
            .insert(address.clone(), response);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn send_signal(&self, signal: ConnectionSignal) {
        let _ = self.signals.send(signal);
    }

    pub fn info_call_count(&self) -> usize {
        self.info_calls.lock().unwrap().len()
    }

    pub fn subscribe_call_count(&self) -> usize {
        self.subscribe_calls.lock().unwrap().len()
    }

    pub fn unsubscribe_call_count(&self) -> usize {
        self.unsubscribe_calls.lock().unwrap().len()
    }

    pub fn last_subscribe_call(&self) -> Option<Vec<Address>> {
        self.subscribe_calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn account_info(&self, address: &Address) -> Result<AccountInfoResponse, GatewayError> {
        self.info_calls.lock().unwrap().push(address.clone());
        self.info_responses
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_else(|| {
                Err(GatewayError::Transport(format!(
                    "no scripted account_info for {}",
                    address
                )))
            })
    }

    async fn account_lines(&self, address: &Address) -> Result<AccountLinesResponse, GatewayError> {
        self.lines_responses
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_else(|| {
                Err(GatewayError::Transport(format!(
                    "no scripted account_lines for {}",
                    address
                )))
            })
    }

    async fn subscribe_accounts(&self, accounts: &[Address]) -> Result<(), GatewayError> {
        self.subscribe_calls.lock().unwrap().push(accounts.to_vec());
        Ok(())
    }

    async fn unsubscribe_accounts(&self, accounts: &[Address]) -> Result<(), GatewayError> {
        self.unsubscribe_calls
            .lock()
            .unwrap()
            .push(accounts.to_vec());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn signals(&self) -> broadcast::Receiver<ConnectionSignal> {
        self.signals.subscribe()
    }
}

// A submitter that records what was handed to it.
#[derive(Default)]
pub struct MockSubmitter {
    pub submitted: Mutex<Vec<Fields>>,
}

#[async_trait]
impl TransactionSubmitter for MockSubmitter {
    async fn submit(&self, tx: Fields) -> Result<(), GatewayError> {
        self.submitted.lock().unwrap().push(tx);
        Ok(())
    }
}

/// Spawns a tracker for `address` over `gateway` and returns its handle.
pub fn spawn_tracker(gateway: &Arc<MockGateway>, address: &Address) -> AccountHandle {
    spawn_tracker_with_submitter(gateway, None, address)
}

pub fn spawn_tracker_with_submitter(
    gateway: &Arc<MockGateway>,
    submitter: Option<Arc<dyn TransactionSubmitter>>,
    address: &Address,
) -> AccountHandle {
    let config = Arc::new(ConnectorConfig::default());
    let gateway: Arc<dyn LedgerGateway> = gateway.clone();
    let (tracker, handle) = AccountTracker::new(config, gateway, submitter, address.clone());
    tokio::spawn(tracker.run());
    handle
}

/// Waits until the tracker has processed everything sent before this
/// call. Commands are handled strictly in order, so a round-trip through
/// the command channel is a barrier.
pub async fn flush(handle: &AccountHandle) {
    let _ = handle.subscriber_count().await;
}

/// Gives spawned tasks and broadcast signals a moment to land. Only
/// needed where no command-channel barrier applies.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Receives the next event, failing the timeout into `None`.
pub async fn next_event_timeout(subscription: &mut EventSubscription) -> Option<AccountEvent> {
    tokio::time::timeout(Duration::from_millis(500), subscription.next_event())
        .await
        .ok()
        .flatten()
}

/// True if no event is waiting. Call after [`flush`]: anything the
/// tracker emitted is already buffered by then.
pub async fn expect_no_event(subscription: &mut EventSubscription) -> bool {
    tokio::time::timeout(Duration::from_millis(100), subscription.next_event())
        .await
        .is_err()
}

/// An object literal as a field map.
pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().expect("literal is an object")
}

pub fn info_response(account_data: Value) -> AccountInfoResponse {
    AccountInfoResponse {
        account_data: fields(account_data),
        ledger_index: Some(1234),
        validated: true,
    }
}

pub fn trust_line(counterparty: &Address, currency: &str, balance: &str) -> TrustLine {
    TrustLine {
        account: counterparty.clone(),
        currency: currency.to_string(),
        balance: balance.to_string(),
        limit: "1000".to_string(),
        limit_peer: "0".to_string(),
        quality_in: 0,
        quality_out: 0,
        no_ripple: false,
    }
}

/// A transaction message shaped like the node's account stream, with
/// metadata attached when `affected_nodes` is given.
pub fn notification(transaction: Value, affected_nodes: Option<Vec<Value>>) -> TransactionNotification {
    let mut message = json!({
        "transaction": transaction,
        "ledger_index": 7_654_321,
        "validated": true,
        "engine_result": "tesSUCCESS",
    });
    if let Some(nodes) = affected_nodes {
        message["meta"] = json!({
            "AffectedNodes": nodes,
            "TransactionIndex": 2,
            "TransactionResult": "tesSUCCESS",
        });
    }
    serde_json::from_value(message).expect("well-formed notification")
}

/// A simple payment transaction body.
pub fn payment(from: &str, to: &str, drops: &str) -> Value {
    json!({
        "TransactionType": "Payment",
        "Account": from,
        "Destination": to,
        "Amount": drops,
        "Fee": "10",
        "Sequence": 1,
        "hash": "E08D6E9754025BA2534A78707605E0601F03ACE063687A0CA1BDDACFCD1698C7",
    })
}

/// A `ModifiedNode` account-root diff for `account`.
pub fn modified_account_root(account: &str, final_fields: Value, previous_fields: Value) -> Value {
    let mut final_fields = final_fields;
    final_fields["Account"] = json!(account);
    json!({
        "ModifiedNode": {
            "LedgerEntryType": "AccountRoot",
            "LedgerIndex": "D8C24B52B1AB7306FDD2BB4CF5CE8A4F8D83D1A8D6EF0F54A80DFB8E0F3C43A1",
            "FinalFields": final_fields,
            "PreviousFields": previous_fields,
        }
    })
}

/// A `CreatedNode` account-root diff for `account`.
pub fn created_account_root(account: &str, new_fields: Value) -> Value {
    let mut new_fields = new_fields;
    new_fields["Account"] = json!(account);
    json!({
        "CreatedNode": {
            "LedgerEntryType": "AccountRoot",
            "LedgerIndex": "4A7F62C1D1B4E9C05AD2A1F7E8B5D90233E6C8A4F1B09D7E5A3C2F1908B6D4E2",
            "NewFields": new_fields,
        }
    })
}
