//! # Account Tracker
//!
//! The `AccountTracker` is a background worker that owns the live state
//! of one tracked account.
//!
//! ## Purpose
//! All mutable state (the cached entry, the trust-line cache, the
//! subscription refcount and the listener registry) lives inside the
//! tracker task and is touched only while processing commands from its
//! channel. Commands are processed strictly in arrival order, so the
//! merges and event emissions belonging to one notification can never
//! interleave with another's, and external readers only ever receive
//! cloned snapshots.
//!
//! The tracker also decides when the remote node needs to push
//! notifications for its account: the first subscription-holding
//! listener triggers one subscribe request, the last one leaving
//! triggers one unsubscribe request, and a reconnecting gateway gets the
//! account re-announced.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::account::AccountHandle;
use crate::address::Address;
use crate::config::ConnectorConfig;
use crate::entry::{AccountEntry, Fields};
use crate::events::{AccountEvent, EventKind};
use crate::gateway::{ConnectionSignal, LedgerGateway, TrustLine};
use crate::meta::TransactionNotification;
use crate::submitter::TransactionSubmitter;
use crate::subscription::ListenerId;

/// A background worker owning the state of one tracked account.
///
/// It receives commands from its [`AccountHandle`], folds transaction
/// metadata into the cached entry, and forwards typed events to the
/// listeners registered for each event kind.
pub struct AccountTracker {
    address: Address,
    gateway: Arc<dyn LedgerGateway>,
    entry: AccountEntry,
    lines: Vec<TrustLine>,
    subscribed: u32,
    listeners: HashMap<ListenerId, Listener>,
    next_listener_id: u64,
    command_rx: mpsc::Receiver<AccountCommand>,
    signal_rx: broadcast::Receiver<ConnectionSignal>,
    signals_open: bool,
}

struct Listener {
    kind: EventKind,
    events_tx: mpsc::Sender<AccountEvent>,
}

/// Commands processed by the tracker task.
#[derive(Debug)]
pub(crate) enum AccountCommand {
    Register {
        kind: EventKind,
        events_tx: mpsc::Sender<AccountEvent>,
        reply: oneshot::Sender<ListenerId>,
    },
    Unregister(ListenerId),
    Notify(TransactionNotification),
    MergeEntry {
        fields: Fields,
        reply: oneshot::Sender<AccountEntry>,
    },
    ReplaceLines {
        lines: Vec<TrustLine>,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<AccountEntry>,
    },
    CachedLines {
        reply: oneshot::Sender<Vec<TrustLine>>,
    },
    SubscriberCount {
        reply: oneshot::Sender<u32>,
    },
    Shutdown,
}

impl AccountTracker {
    /// Creates a tracker and the handle that drives it.
    ///
    /// The tracker does nothing until [`run`](Self::run) is awaited,
    /// typically on its own task.
    pub fn new(
        config: Arc<ConnectorConfig>,
        gateway: Arc<dyn LedgerGateway>,
        submitter: Option<Arc<dyn TransactionSubmitter>>,
        address: Address,
    ) -> (Self, AccountHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.channels.tracker_command_buffer);
        let signal_rx = gateway.signals();
        let tracker = Self {
            address: address.clone(),
            gateway: Arc::clone(&gateway),
            entry: AccountEntry::new(),
            lines: Vec::new(),
            subscribed: 0,
            listeners: HashMap::new(),
            next_listener_id: 0,
            command_rx,
            signal_rx,
            signals_open: true,
        };
        let handle = AccountHandle::new(address, command_tx, gateway, submitter, config);
        (tracker, handle)
    }

    /// Runs the tracker loop until shutdown or until every handle is gone.
    pub async fn run(mut self) -> anyhow::Result<()> {
        tracing::info!("Account tracker for {} started", self.address);
        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    if self.handle_command(command).await {
                        break;
                    }
                },
                signal = self.signal_rx.recv(), if self.signals_open => match signal {
                    Ok(signal) => self.handle_signal(signal).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Tracker for {} lagged {} connection signals",
                            self.address,
                            skipped
                        );
                        // A lag may have swallowed a prepare-subscribe.
                        if self.subscribed > 0 {
                            self.announce_subscription().await;
                        }
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Connection signals for {} closed", self.address);
                        self.signals_open = false;
                    }
                },
                else => {
                    tracing::info!(
                        "All channels for {} closed. Tracker shutting down.",
                        self.address
                    );
                    break;
                }
            }
        }
        tracing::info!("Account tracker for {} stopped", self.address);
        Ok(())
    }

    /// Handles one command. Returns `true` if the tracker should shut down.
    async fn handle_command(&mut self, command: AccountCommand) -> bool {
        match command {
            AccountCommand::Register {
                kind,
                events_tx,
                reply,
            } => {
                let id = ListenerId(self.next_listener_id);
                self.next_listener_id += 1;
                self.listeners.insert(id, Listener { kind, events_tx });
                tracing::debug!(
                    "Registered {:?} listener {:?} for {}",
                    kind,
                    id,
                    self.address
                );
                if kind.requires_subscription() {
                    self.subscriber_added().await;
                }
                let _ = reply.send(id);
            }
            AccountCommand::Unregister(id) => {
                // Unknown ids happen when a listener is pruned while its
                // guard is closing; nothing left to do then.
                if let Some(listener) = self.listeners.remove(&id) {
                    tracing::debug!(
                        "Unregistered {:?} listener {:?} for {}",
                        listener.kind,
                        id,
                        self.address
                    );
                    if listener.kind.requires_subscription() {
                        self.subscriber_removed().await;
                    }
                }
            }
            AccountCommand::Notify(notification) => {
                self.apply_notification(notification).await;
            }
            AccountCommand::MergeEntry { fields, reply } => {
                let balance_before = self.entry.balance().map(str::to_owned);
                self.entry.merge(&fields);
                self.emit_entry_events(balance_before).await;
                let _ = reply.send(self.entry.clone());
            }
            AccountCommand::ReplaceLines { lines, reply } => {
                self.lines = lines;
                self.emit(AccountEvent::Lines(self.lines.clone())).await;
                let _ = reply.send(());
            }
            AccountCommand::Snapshot { reply } => {
                let _ = reply.send(self.entry.clone());
            }
            AccountCommand::CachedLines { reply } => {
                let _ = reply.send(self.lines.clone());
            }
            AccountCommand::SubscriberCount { reply } => {
                let _ = reply.send(self.subscribed);
            }
            AccountCommand::Shutdown => {
                tracing::info!("Received shutdown command for {}. Exiting.", self.address);
                return true;
            }
        }
        false
    }

    /// Applies one validated-transaction notification.
    ///
    /// The entry merge always happens, keeping the cache aligned with
    /// the ledger; only the transaction events are gated on the
    /// subscription refcount. Within one notification the entry event is
    /// emitted before the transaction events.
    async fn apply_notification(&mut self, notification: TransactionNotification) {
        let mut entry_changed = false;
        let balance_before = self.entry.balance().map(str::to_owned);

        if let Some(meta) = &notification.meta {
            for node in &meta.affected_nodes {
                if !node.is_account_root() || node.account() != Some(self.address.as_str()) {
                    continue;
                }
                let diff = node.diff();
                // Created nodes carry NewFields, modified ones FinalFields;
                // merging new first lets final win where both appear.
                self.entry.merge(&diff.new_fields);
                self.entry.merge(&diff.final_fields);
                entry_changed = true;
            }
        }

        if entry_changed {
            self.emit_entry_events(balance_before).await;
        }

        if self.subscribed == 0 {
            // A notification can trail the last unsubscription; state
            // stays current but transaction events stay quiet.
            tracing::debug!(
                "Dropping transaction events for {}: no subscribers",
                self.address
            );
            return;
        }

        let outbound = notification
            .account()
            .map(|account| account == self.address.as_str());

        self.emit(AccountEvent::Transaction(notification.clone())).await;
        match outbound {
            Some(true) => {
                self.emit(AccountEvent::TransactionOutbound(notification))
                    .await;
            }
            Some(false) => {
                self.emit(AccountEvent::TransactionInbound(notification))
                    .await;
            }
            None => {}
        }
    }

    /// Emits the updated entry image and, when the balance moved with
    /// it, a balance event.
    async fn emit_entry_events(&mut self, balance_before: Option<String>) {
        self.emit(AccountEvent::Entry(self.entry.clone())).await;
        let balance_after = self.entry.balance().map(str::to_owned);
        if let Some(balance) = balance_after {
            if balance_before.as_deref() != Some(balance.as_str()) {
                self.emit(AccountEvent::Balance(balance)).await;
            }
        }
    }

    /// Delivers `event` to every listener of its kind, pruning listeners
    /// whose receiving side is gone.
    async fn emit(&mut self, event: AccountEvent) {
        let kind = event.kind();
        let sends = self
            .listeners
            .iter()
            .filter(|(_, listener)| listener.kind == kind)
            .map(|(id, listener)| {
                let id = *id;
                let events_tx = &listener.events_tx;
                let event_clone = event.clone();
                async move {
                    if events_tx.send(event_clone).await.is_err() {
                        tracing::warn!("Listener {:?} disconnected. It will be removed.", id);
                        return Some(id);
                    }
                    None
                }
            });

        let results = future::join_all(sends).await;
        for id in results.into_iter().flatten() {
            if let Some(listener) = self.listeners.remove(&id) {
                if listener.kind.requires_subscription() {
                    self.subscriber_removed().await;
                }
            }
        }
    }

    /// Bumps the subscription refcount, asking the node for
    /// notifications on the 0 to 1 edge.
    async fn subscriber_added(&mut self) {
        self.subscribed += 1;
        if self.subscribed != 1 {
            return;
        }
        if self.gateway.is_connected() {
            self.announce_subscription().await;
        } else {
            tracing::debug!(
                "Gateway for {} is disconnected; subscription deferred to reconnect",
                self.address
            );
        }
    }

    /// Drops the subscription refcount, releasing the node subscription
    /// on the 1 to 0 edge. A drop at zero is ignored.
    async fn subscriber_removed(&mut self) {
        if self.subscribed == 0 {
            tracing::debug!(
                "Ignoring unsubscribe for {} with no active subscription",
                self.address
            );
            return;
        }
        self.subscribed -= 1;
        if self.subscribed > 0 || !self.gateway.is_connected() {
            return;
        }
        if let Err(err) = self
            .gateway
            .unsubscribe_accounts(std::slice::from_ref(&self.address))
            .await
        {
            tracing::warn!("Unsubscribe request for {} failed: {}", self.address, err);
        }
    }

    async fn handle_signal(&mut self, signal: ConnectionSignal) {
        match signal {
            ConnectionSignal::PrepareSubscribe => {
                if self.subscribed > 0 {
                    tracing::info!(
                        "Re-announcing subscription for {} after reconnect",
                        self.address
                    );
                    self.announce_subscription().await;
                }
            }
            ConnectionSignal::Connected => {
                tracing::debug!("Gateway connected for {}", self.address);
            }
            ConnectionSignal::Disconnected => {
                tracing::debug!("Gateway disconnected for {}", self.address);
            }
        }
    }

    /// Sends one subscribe request for this account. Failures are logged
    /// and dropped, never retried.
    async fn announce_subscription(&self) {
        if let Err(err) = self
            .gateway
            .subscribe_accounts(std::slice::from_ref(&self.address))
            .await
        {
            tracing::warn!("Subscribe request for {} failed: {}", self.address, err);
        }
    }
}
