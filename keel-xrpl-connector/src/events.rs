//! # Account Events
//!
//! The typed events a tracker delivers to its listeners. Each
//! subscription is opened for exactly one [`EventKind`] and receives
//! only events of that kind, so listeners never filter a firehose.

use crate::entry::AccountEntry;
use crate::gateway::TrustLine;
use crate::meta::TransactionNotification;

/// An event delivered to account listeners.
#[derive(Debug, Clone)]
pub enum AccountEvent {
    /// The cached account entry changed; carries the full updated image.
    Entry(AccountEntry),
    /// A validated transaction touched the account.
    Transaction(TransactionNotification),
    /// A transaction another party sent to the account.
    TransactionInbound(TransactionNotification),
    /// A transaction the account itself sent.
    TransactionOutbound(TransactionNotification),
    /// The trust-line cache was replaced by a fresh fetch.
    Lines(Vec<TrustLine>),
    /// The validated balance changed, in drops.
    Balance(String),
    /// A proposed (not yet validated) balance. Reserved for transports
    /// that feed the proposed stream; the tracker itself never emits it.
    BalanceProposed(String),
}

/// The categories an event subscription can be opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Entry,
    Transaction,
    TransactionInbound,
    TransactionOutbound,
    Lines,
    Balance,
    BalanceProposed,
}

impl AccountEvent {
    /// The kind bucket this event is delivered under.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Entry(_) => EventKind::Entry,
            Self::Transaction(_) => EventKind::Transaction,
            Self::TransactionInbound(_) => EventKind::TransactionInbound,
            Self::TransactionOutbound(_) => EventKind::TransactionOutbound,
            Self::Lines(_) => EventKind::Lines,
            Self::Balance(_) => EventKind::Balance,
            Self::BalanceProposed(_) => EventKind::BalanceProposed,
        }
    }
}

impl EventKind {
    /// Whether listeners of this kind need the node to push account
    /// notifications, and therefore hold the account's subscription
    /// refcount. Only the two primary kinds do; the derived kinds ride
    /// along without counting.
    pub fn requires_subscription(self) -> bool {
        matches!(self, Self::Transaction | Self::Entry)
    }
}
