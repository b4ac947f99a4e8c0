//! # Account Handle
//!
//! [`AccountHandle`] is the public face of a tracked account: a cheaply
//! clonable handle that registers listeners, feeds notifications to the
//! tracker task, runs node queries and validates signing keys. All
//! tracker-side state is reached through the command channel, so every
//! operation resolves exactly once, with an error rather than a hang
//! when the tracker task is gone.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::address::{resolve_signing_address, Address};
use crate::config::ConnectorConfig;
use crate::entry::{AccountEntry, Fields};
use crate::error::{ConnectorError, GatewayError, Result};
use crate::events::EventKind;
use crate::gateway::{AccountInfoResponse, LedgerGateway, TrustLine};
use crate::meta::TransactionNotification;
use crate::submitter::TransactionSubmitter;
use crate::subscription::EventSubscription;
use crate::tracker::AccountCommand;

/// A handle to one tracked account.
///
/// Clones share the same tracker task. The handle stays usable after
/// the tracker stops; operations then fail with
/// [`ConnectorError::TrackerClosed`].
#[derive(Clone)]
pub struct AccountHandle {
    address: Address,
    command_tx: mpsc::Sender<AccountCommand>,
    gateway: Arc<dyn LedgerGateway>,
    submitter: Option<Arc<dyn TransactionSubmitter>>,
    config: Arc<ConnectorConfig>,
}

impl AccountHandle {
    pub(crate) fn new(
        address: Address,
        command_tx: mpsc::Sender<AccountCommand>,
        gateway: Arc<dyn LedgerGateway>,
        submitter: Option<Arc<dyn TransactionSubmitter>>,
        config: Arc<ConnectorConfig>,
    ) -> Self {
        Self {
            address,
            command_tx,
            gateway,
            submitter,
            config,
        }
    }

    /// The tracked account's address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Opens a subscription for one kind of account event.
    ///
    /// Listeners for [`EventKind::Transaction`] and [`EventKind::Entry`]
    /// hold the account's node subscription: the first one registered
    /// triggers a subscribe request, the last one leaving triggers an
    /// unsubscribe request.
    pub async fn subscribe(&self, kind: EventKind) -> Result<EventSubscription> {
        let (events_tx, events_rx) = mpsc::channel(self.config.channels.listener_event_buffer);
        let id = self
            .request(|reply| AccountCommand::Register {
                kind,
                events_tx,
                reply,
            })
            .await?;
        Ok(EventSubscription::new(
            kind,
            id,
            events_rx,
            self.command_tx.clone(),
        ))
    }

    /// Feeds one validated-transaction notification to the tracker.
    ///
    /// Notifications are processed strictly in the order delivered.
    pub async fn notify(&self, notification: TransactionNotification) {
        if self
            .command_tx
            .send(AccountCommand::Notify(notification))
            .await
            .is_err()
        {
            tracing::warn!(
                "Failed to deliver notification: tracker for {} may be down",
                self.address
            );
        }
    }

    /// A snapshot of the cached account entry.
    pub async fn snapshot(&self) -> Result<AccountEntry> {
        self.request(|reply| AccountCommand::Snapshot { reply }).await
    }

    /// A snapshot of the cached trust lines, from the last
    /// [`lines`](Self::lines) fetch.
    pub async fn cached_lines(&self) -> Result<Vec<TrustLine>> {
        self.request(|reply| AccountCommand::CachedLines { reply })
            .await
    }

    /// The current subscription refcount.
    pub async fn subscriber_count(&self) -> Result<u32> {
        self.request(|reply| AccountCommand::SubscriberCount { reply })
            .await
    }

    /// Fetches the account root from the node, without touching the cache.
    ///
    /// A missing account surfaces as [`ConnectorError::AccountNotFound`].
    pub async fn info(&self) -> Result<AccountInfoResponse> {
        match self.gateway.account_info(&self.address).await {
            Ok(response) => Ok(response),
            Err(err) if err.is_account_not_found() => {
                Err(ConnectorError::AccountNotFound(self.address.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetches the account root and folds it into the cached entry.
    ///
    /// The tracker emits an entry event for the merge; the returned
    /// snapshot is the entry as the cache now holds it.
    pub async fn entry(&self) -> Result<AccountEntry> {
        let info = self.info().await?;
        self.request(|reply| AccountCommand::MergeEntry {
            fields: info.account_data,
            reply,
        })
        .await
    }

    /// The sequence number the account's next transaction should carry.
    ///
    /// An account the ledger has never seen starts at sequence 1.
    pub async fn next_sequence(&self) -> Result<u32> {
        match self.gateway.account_info(&self.address).await {
            Ok(response) => response
                .account_data
                .get("Sequence")
                .and_then(Value::as_u64)
                .map(|sequence| sequence as u32)
                .ok_or_else(|| {
                    ConnectorError::Gateway(GatewayError::Transport(
                        "account_info response carries no Sequence field".to_string(),
                    ))
                }),
            Err(err) if err.is_account_not_found() => Ok(1),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetches the account's trust lines, replacing the cached set.
    ///
    /// The tracker emits a lines event for the replacement.
    pub async fn lines(&self) -> Result<Vec<TrustLine>> {
        let response = self
            .gateway
            .account_lines(&self.address)
            .await
            .map_err(ConnectorError::from)?;
        self.request(|reply| AccountCommand::ReplaceLines {
            lines: response.lines.clone(),
            reply,
        })
        .await?;
        Ok(response.lines)
    }

    /// Finds the trust line for `currency` against `counterparty`.
    ///
    /// A line that does not exist is an `Ok(None)`, not an error.
    pub async fn line(&self, currency: &str, counterparty: &Address) -> Result<Option<TrustLine>> {
        let lines = self.lines().await?;
        Ok(lines
            .into_iter()
            .find(|line| line.account == *counterparty && line.currency == currency))
    }

    /// Decides whether `public_key` currently signs for this account.
    ///
    /// The key may be given as a hex-encoded public key or directly as
    /// the address it resolves to. For a funded account the key is
    /// active if it is the assigned regular key, or if it is the master
    /// key and the master key has not been disabled. For an account the
    /// ledger has never seen, only the key that would own the address
    /// can claim it.
    pub async fn public_key_is_active(&self, public_key: &str) -> Result<bool> {
        let resolved = resolve_signing_address(public_key).map_err(ConnectorError::from)?;

        let account_root = match self.gateway.account_info(&self.address).await {
            Ok(response) => Some(AccountEntry::from(response.account_data)),
            Err(err) if err.is_account_not_found() => None,
            Err(err) => return Err(err.into()),
        };

        Ok(match account_root {
            None => resolved == self.address,
            Some(root) => {
                let regular_match = root.regular_key() == Some(resolved.as_str());
                let master_match =
                    root.account() == Some(resolved.as_str()) && !root.master_key_disabled();
                regular_match || master_match
            }
        })
    }

    /// Hands `tx` to the configured transaction submitter.
    pub async fn submit(&self, tx: Fields) -> Result<()> {
        match &self.submitter {
            Some(submitter) => submitter.submit(tx).await.map_err(ConnectorError::from),
            None => Err(ConnectorError::SubmitterUnavailable(self.address.clone())),
        }
    }

    /// Shuts the tracker task down.
    pub async fn stop(&self) {
        if self
            .command_tx
            .send(AccountCommand::Shutdown)
            .await
            .is_err()
        {
            tracing::warn!(
                "Failed to send shutdown to tracker for {}: it may already be down",
                self.address
            );
        }
    }

    /// Sends a command carrying a reply channel and awaits the answer.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> AccountCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| ConnectorError::TrackerClosed(self.address.clone()))?;
        reply_rx
            .await
            .map_err(|_| ConnectorError::TrackerClosed(self.address.clone()))
    }
}

impl fmt::Debug for AccountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountHandle")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
