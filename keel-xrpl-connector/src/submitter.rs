//! Pluggable transaction submission.

use async_trait::async_trait;

use crate::entry::Fields;
use crate::error::GatewayError;

/// A trait for whatever queue manages transaction submission.
///
/// Retry, backoff and finality tracking live behind this seam; the
/// account API only hands transactions over.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Queues `tx` for submission to the ledger.
    async fn submit(&self, tx: Fields) -> Result<(), GatewayError>;
}
