//! # Account Entry Cache
//!
//! The in-memory image of an account's ledger entry (its `AccountRoot`
//! node). The image is built up incrementally: full `account_info`
//! fetches and per-transaction metadata diffs both land here through
//! [`AccountEntry::merge`], so the cache converges on the node's view
//! without ever being cleared.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The field map used across account roots, transactions and metadata
/// diffs. Field names are the node's wire names (`Sequence`, `Balance`,
/// `Flags`, ...).
pub type Fields = Map<String, Value>;

/// Ledger entry type of an account root node.
pub const ACCOUNT_ROOT: &str = "AccountRoot";

/// Flag bit on an account root marking the master key as disabled.
pub const LSF_DISABLE_MASTER: u32 = 0x0010_0000;

/// A shallow-merged snapshot of an account's ledger entry.
///
/// Keys are only ever overwritten by newer values, never partially
/// cleared; a full fetch is just a merge whose update happens to cover
/// every field. The tracker task owns the live instance; everything
/// handed out of it is a clone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountEntry {
    fields: Fields,
}

impl AccountEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `update` into the entry, shallow, last writer wins per key.
    pub fn merge(&mut self, update: &Fields) {
        for (key, value) in update {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Whether no field has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All observed fields.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// A single field by wire name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The account's next transaction sequence number, if observed.
    pub fn sequence(&self) -> Option<u32> {
        self.get("Sequence").and_then(Value::as_u64).map(|s| s as u32)
    }

    /// The validated balance in drops, if observed. The node transmits
    /// balances as decimal strings.
    pub fn balance(&self) -> Option<&str> {
        self.get("Balance").and_then(Value::as_str)
    }

    /// The account root's flag bits. Absent counts as no flags set.
    pub fn flags(&self) -> u32 {
        self.get("Flags").and_then(Value::as_u64).unwrap_or(0) as u32
    }

    /// The currently assigned regular key, if any.
    pub fn regular_key(&self) -> Option<&str> {
        self.get("RegularKey").and_then(Value::as_str)
    }

    /// The owning address as transmitted in the entry itself.
    pub fn account(&self) -> Option<&str> {
        self.get("Account").and_then(Value::as_str)
    }

    /// Whether the master key has been disabled for this account.
    pub fn master_key_disabled(&self) -> bool {
        self.flags() & LSF_DISABLE_MASTER != 0
    }
}

impl From<Fields> for AccountEntry {
    fn from(fields: Fields) -> Self {
        Self { fields }
    }
}
