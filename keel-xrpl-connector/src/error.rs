//! # Connector Errors
//!
//! Error types shared across the connector. [`AddressError`] covers the
//! address codec and public-key resolution, [`GatewayError`] everything
//! reported by or about the remote node, and [`ConnectorError`] is the
//! surface the account API exposes to callers.

use thiserror::Error;

use crate::address::Address;

/// A convenience alias for results produced by the account API.
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// The error code a ledger node returns when a queried account does not
/// exist in the ledger.
pub const ACT_NOT_FOUND: &str = "actNotFound";

/// Errors produced while decoding, encoding or deriving addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The input is not valid base58 for the ledger alphabet.
    #[error("invalid base58 encoding")]
    Encoding,
    /// The decoded payload has the wrong length.
    #[error("decoded payload is {0} bytes, expected 21")]
    Length(usize),
    /// The trailing 4-byte double-SHA256 checksum does not match.
    #[error("address checksum mismatch")]
    Checksum,
    /// The version byte is not the account-ID version.
    #[error("unexpected version byte {0:#04x}")]
    Version(u8),
    /// The input is neither a classic address nor a hex-encoded public key.
    #[error("input is neither a classic address nor a hex public key")]
    PublicKeyFormat,
}

/// Errors surfaced by a [`LedgerGateway`](crate::gateway::LedgerGateway)
/// implementation.
///
/// `Remote` carries an error the node itself reported, with the node's
/// error code preserved verbatim so callers can match on it. `Transport`
/// covers everything that prevented a well-formed answer. The connector
/// never retries either variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("node error {code}: {message}")]
    Remote { code: String, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Builds the node-reported error for a missing account.
    pub fn account_not_found() -> Self {
        Self::Remote {
            code: ACT_NOT_FOUND.to_string(),
            message: "Account not found.".to_string(),
        }
    }

    /// Whether this is the node's "account does not exist" error.
    pub fn is_account_not_found(&self) -> bool {
        matches!(self, Self::Remote { code, .. } if code == ACT_NOT_FOUND)
    }
}

/// The top-level error type for account operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error(transparent)]
    Address(#[from] AddressError),
    /// The tracked account does not exist in the ledger.
    #[error("account {0} not found in the ledger")]
    AccountNotFound(Address),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The background task owning this account's state has shut down.
    #[error("tracker for account {0} is no longer running")]
    TrackerClosed(Address),
    /// A submit was requested but no submitter was wired in.
    #[error("no transaction submitter configured for account {0}")]
    SubmitterUnavailable(Address),
}
