//! Audit log domain model.
//!
//! # Invariants
//! - Entries are immutable once written.
//! - `id` grows monotonically in write order.

use serde::{Deserialize, Serialize};

/// Entity table an audit entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTable {
    Categories,
    Books,
    Authors,
}

impl AuditTable {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Books => "books",
            Self::Authors => "authors",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "categories" => Some(Self::Categories),
            "books" => Some(Self::Books),
            "authors" => Some(Self::Authors),
            _ => None,
        }
    }
}

/// Kind of mutation recorded by one audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOperation {
    Insert,
    Update,
    Delete,
    UpdateStatus,
}

impl AuditOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::UpdateStatus => "UPDATE_STATUS",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            "UPDATE_STATUS" => Some(Self::UpdateStatus),
            _ => None,
        }
    }
}

/// One persisted audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub table: AuditTable,
    /// Target record id in text form.
    pub record_id: String,
    pub operation: AuditOperation,
    /// JSON snapshot before the mutation.
    pub data_before: Option<String>,
    /// JSON snapshot after the mutation.
    pub data_after: Option<String>,
    /// Epoch milliseconds captured when the entry was recorded.
    pub timestamp: i64,
    pub actor: Option<String>,
}
