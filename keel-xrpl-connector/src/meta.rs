//! # Transaction Notifications and Metadata
//!
//! Wire types for the messages a node pushes on its transaction stream.
//! The outer envelope uses the stream's lowercase field names; the
//! metadata block inside keeps the ledger's PascalCase names. Both are
//! deserialized as-is so nothing of the node's vocabulary is lost.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::{Fields, ACCOUNT_ROOT};

/// One validated-transaction message from the node's account stream.
///
/// `transaction` is the transaction as submitted; `meta` describes what
/// the transaction did to the ledger. Notifications are transient: they
/// are dispatched once, in arrival order, and not retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionNotification {
    pub transaction: Fields,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
    #[serde(default)]
    pub ledger_index: Option<u64>,
    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub engine_result: Option<String>,
}

impl TransactionNotification {
    /// The sending account of the transaction, if the field is present.
    pub fn account(&self) -> Option<&str> {
        self.transaction.get("Account").and_then(Value::as_str)
    }

    /// The transaction type (`Payment`, `SetRegularKey`, ...).
    pub fn transaction_type(&self) -> Option<&str> {
        self.transaction.get("TransactionType").and_then(Value::as_str)
    }

    /// The transaction hash, if the stream included one.
    pub fn hash(&self) -> Option<&str> {
        self.transaction.get("hash").and_then(Value::as_str)
    }
}

/// The metadata block of a validated transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TransactionMeta {
    pub affected_nodes: Vec<AffectedNode>,
    pub transaction_index: Option<u64>,
    pub transaction_result: Option<String>,
}

/// One entry of `AffectedNodes`: a ledger node the transaction created,
/// modified or deleted, tagged the way the node transmits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AffectedNode {
    CreatedNode(NodeDiff),
    ModifiedNode(NodeDiff),
    DeletedNode(NodeDiff),
}

/// The field diff carried by an affected node.
///
/// Created nodes populate `new_fields`; modified and deleted nodes
/// populate `final_fields` (the state after the transaction) and
/// `previous_fields` (the fields that changed, with their prior values).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NodeDiff {
    pub ledger_entry_type: String,
    pub ledger_index: Option<String>,
    pub new_fields: Fields,
    pub final_fields: Fields,
    pub previous_fields: Fields,
}

impl AffectedNode {
    /// The wrapped diff, independent of the lifecycle tag.
    pub fn diff(&self) -> &NodeDiff {
        match self {
            Self::CreatedNode(diff) | Self::ModifiedNode(diff) | Self::DeletedNode(diff) => diff,
        }
    }

    /// The ledger entry type of the affected node.
    pub fn entry_type(&self) -> &str {
        &self.diff().ledger_entry_type
    }

    /// Whether the affected node is an account root.
    pub fn is_account_root(&self) -> bool {
        self.entry_type() == ACCOUNT_ROOT
    }

    /// The `Account` field of the affected entry, wherever the diff
    /// carries it (final state first, then newly created fields, then
    /// prior values).
    pub fn account(&self) -> Option<&str> {
        let diff = self.diff();
        diff.final_fields
            .get("Account")
            .or_else(|| diff.new_fields.get("Account"))
            .or_else(|| diff.previous_fields.get("Account"))
            .and_then(Value::as_str)
    }
}
