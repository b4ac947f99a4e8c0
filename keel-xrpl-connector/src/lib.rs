//! A core Rust library for maintaining live views of accounts on an
//! XRPL-style ledger node.
//!
//! This crate provides the primary building blocks for backend services
//! that follow ledger accounts: a per-account background tracker that
//! folds validated-transaction metadata into a cached account entry,
//! reference-counted node subscriptions, typed event delivery, and the
//! signing-key validation pipeline. The node connection itself stays
//! behind the [`gateway::LedgerGateway`] trait, so the same tracking
//! logic runs against a WebSocket transport, a test double or an
//! in-process simulator.
//!
//! # Key Components
//!
//! *   [`registry::AccountRegistry`]: The usual entry point. Spawns one
//!     tracker per address and routes inbound notifications to every
//!     account they touch.
//! *   [`account::AccountHandle`]: Queries, signing-key validation,
//!     subscriptions and notification feeding for one account.
//! *   [`tracker::AccountTracker`]: The background worker owning the
//!     account's cached state.
//! *   [`subscription::EventSubscription`]: A per-kind event stream that
//!     unregisters itself on close or drop.

/// The public handle for one tracked account.
pub mod account;
/// Address parsing, encoding and account-ID derivation.
pub mod address;
/// Defines configuration structures for the connector.
pub mod config;
/// The account-entry cache and its merge semantics.
pub mod entry;
/// Error types shared across the connector.
pub mod error;
/// Typed events delivered to account listeners.
pub mod events;
/// The transport seam to the ledger node.
pub mod gateway;
/// Wire types for transaction notifications and their metadata.
pub mod meta;
/// One tracker per address, with notification routing.
pub mod registry;
/// The seam to whatever queue manages transaction submission.
pub mod submitter;
/// Listener handles with automatic unregistration.
pub mod subscription;
/// The background worker owning per-account state.
pub mod tracker;
