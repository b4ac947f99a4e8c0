//! # Ledger Gateway
//!
//! The transport seam. A [`LedgerGateway`] implementation owns the
//! connection to a ledger node: it answers point queries and maintains
//! the set of accounts the node pushes notifications for. The connector
//! never reconnects or retries on its own; it reacts to the gateway's
//! connection signals instead, and feeds inbound stream messages to the
//! trackers through [`AccountHandle::notify`](crate::account::AccountHandle::notify)
//! or [`AccountRegistry::dispatch`](crate::registry::AccountRegistry::dispatch).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::address::Address;
use crate::entry::Fields;
use crate::error::GatewayError;

/// Connection lifecycle notices broadcast by a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSignal {
    /// The node connection is up.
    Connected,
    /// The node connection dropped. Subscriptions held on the node are
    /// gone with it.
    Disconnected,
    /// The gateway is about to rebuild its subscription set after a
    /// reconnect; trackers re-announce the accounts they still need.
    PrepareSubscribe,
}

/// Response to an `account_info` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfoResponse {
    /// The account root as the node currently has it.
    pub account_data: Fields,
    #[serde(default)]
    pub ledger_index: Option<u64>,
    #[serde(default)]
    pub validated: bool,
}

/// One trust line from an `account_lines` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustLine {
    /// The counterparty of the line.
    pub account: Address,
    pub currency: String,
    pub balance: String,
    pub limit: String,
    pub limit_peer: String,
    #[serde(default)]
    pub quality_in: u32,
    #[serde(default)]
    pub quality_out: u32,
    #[serde(default)]
    pub no_ripple: bool,
}

/// Response to an `account_lines` query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountLinesResponse {
    pub lines: Vec<TrustLine>,
    #[serde(default)]
    pub ledger_index: Option<u64>,
}

/// A trait abstracting over the connection to a ledger node.
///
/// Implementations are expected to multiplex one underlying connection
/// across many trackers, which is why subscribe/unsubscribe take slices:
/// a transport can batch several accounts into a single node request.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Fetches the current account root for `address`.
    ///
    /// A missing account comes back as the node's `actNotFound` error,
    /// i.e. a [`GatewayError::Remote`] for which
    /// [`GatewayError::is_account_not_found`] holds.
    async fn account_info(&self, address: &Address)
        -> Result<AccountInfoResponse, GatewayError>;

    /// Fetches the trust lines of `address`.
    async fn account_lines(&self, address: &Address)
        -> Result<AccountLinesResponse, GatewayError>;

    /// Asks the node to start pushing notifications for `accounts`.
    async fn subscribe_accounts(&self, accounts: &[Address]) -> Result<(), GatewayError>;

    /// Asks the node to stop pushing notifications for `accounts`.
    async fn unsubscribe_accounts(&self, accounts: &[Address]) -> Result<(), GatewayError>;

    /// Whether the node connection is currently up.
    fn is_connected(&self) -> bool;

    /// A fresh receiver for connection lifecycle signals.
    fn signals(&self) -> broadcast::Receiver<ConnectionSignal>;
}
