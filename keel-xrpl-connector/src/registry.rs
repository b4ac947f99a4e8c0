//! # Account Registry
//!
//! Keeps one tracker per tracked address and routes inbound stream
//! notifications to every tracked account a transaction touched. This
//! is what a transport integration talks to: it parses a stream message
//! once and hands it to [`AccountRegistry::dispatch`] instead of
//! filtering the firehose per account.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::account::AccountHandle;
use crate::address::Address;
use crate::config::ConnectorConfig;
use crate::gateway::LedgerGateway;
use crate::meta::TransactionNotification;
use crate::submitter::TransactionSubmitter;
use crate::tracker::AccountTracker;

/// A concurrent map of tracked accounts, spawning trackers on demand.
pub struct AccountRegistry {
    config: Arc<ConnectorConfig>,
    gateway: Arc<dyn LedgerGateway>,
    submitter: Option<Arc<dyn TransactionSubmitter>>,
    accounts: DashMap<Address, AccountHandle>,
}

impl AccountRegistry {
    pub fn new(
        config: Arc<ConnectorConfig>,
        gateway: Arc<dyn LedgerGateway>,
        submitter: Option<Arc<dyn TransactionSubmitter>>,
    ) -> Self {
        Self {
            config,
            gateway,
            submitter,
            accounts: DashMap::new(),
        }
    }

    /// The handle for `address`, spawning a tracker task on first use.
    pub fn account(&self, address: &Address) -> AccountHandle {
        if let Some(handle) = self.accounts.get(address) {
            return handle.clone();
        }
        let handle = self.accounts.entry(address.clone()).or_insert_with(|| {
            let (tracker, handle) = AccountTracker::new(
                Arc::clone(&self.config),
                Arc::clone(&self.gateway),
                self.submitter.clone(),
                address.clone(),
            );
            tokio::spawn(tracker.run());
            tracing::debug!("Spawned account tracker for {}", address);
            handle
        });
        handle.clone()
    }

    /// Whether a tracker for `address` already exists.
    pub fn contains(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    /// The number of tracked accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Routes `notification` to every tracked account it touches.
    ///
    /// Returns how many trackers the notification was delivered to.
    /// Accounts the registry does not track are skipped, never spawned.
    pub async fn dispatch(&self, notification: TransactionNotification) -> usize {
        // Handles are cloned out first so no map shard stays locked
        // across an await.
        let targets: Vec<AccountHandle> = extract_addresses(&notification)
            .into_iter()
            .filter_map(|address| self.accounts.get(&address).map(|handle| handle.clone()))
            .collect();

        let delivered = targets.len();
        for handle in targets {
            handle.notify(notification.clone()).await;
        }
        delivered
    }

    /// Addresses whose trackers currently hold an active subscription.
    ///
    /// Transports that assemble one bulk subscribe request use this to
    /// rebuild their set after a reconnect.
    pub async fn subscription_addresses(&self) -> Vec<Address> {
        let handles: Vec<AccountHandle> =
            self.accounts.iter().map(|entry| entry.value().clone()).collect();

        let mut addresses = Vec::new();
        for handle in handles {
            if let Ok(count) = handle.subscriber_count().await {
                if count > 0 {
                    addresses.push(handle.address().clone());
                }
            }
        }
        addresses
    }

    /// Stops every tracker and clears the registry.
    pub async fn shutdown(&self) {
        let handles: Vec<AccountHandle> =
            self.accounts.iter().map(|entry| entry.value().clone()).collect();
        self.accounts.clear();
        for handle in handles {
            handle.stop().await;
        }
        tracing::info!("Account registry shut down");
    }
}

/// Collects every address a notification can concern: the sending
/// account, the payment destination if any, and the owner of each
/// affected account root.
fn extract_addresses(notification: &TransactionNotification) -> Vec<Address> {
    let mut candidates: Vec<&str> = Vec::new();
    if let Some(account) = notification.account() {
        candidates.push(account);
    }
    if let Some(destination) = notification
        .transaction
        .get("Destination")
        .and_then(Value::as_str)
    {
        candidates.push(destination);
    }
    if let Some(meta) = &notification.meta {
        for node in &meta.affected_nodes {
            if node.is_account_root() {
                if let Some(account) = node.account() {
                    candidates.push(account);
                }
            }
        }
    }

    let mut addresses = Vec::new();
    for candidate in candidates {
        if let Ok(address) = candidate.parse::<Address>() {
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
    }
    addresses
}
