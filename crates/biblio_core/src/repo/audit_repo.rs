//! Append-only audit trail.
//!
//! # Responsibility
//! - Persist one before/after snapshot entry per catalog mutation.
//! - Expose newest-first history reads as live queries.
//!
//! # Invariants
//! - Entries are never updated (a schema trigger aborts `UPDATE`).
//! - The only removal path is `purge_before`.
//! - Timestamps are captured when the entry is recorded.

use crate::db::Store;
use crate::live::LiveQuery;
use crate::model::audit::{AuditLogEntry, AuditOperation, AuditTable};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::rows::now_epoch_ms;
use log::info;
use rusqlite::{params, Connection, Row};
use serde::Serialize;

const AUDIT_SELECT_SQL: &str = "SELECT
    id,
    table_name,
    record_id,
    operation,
    data_before,
    data_after,
    timestamp,
    actor
FROM audit_log";

/// Audit trail contract.
pub trait AuditTrail {
    /// Appends one entry in its own transaction and returns its id.
    ///
    /// `actor` names who made the change; `None` falls back to the
    /// configured actor.
    fn record(
        &self,
        table: AuditTable,
        record_id: &str,
        operation: AuditOperation,
        data_before: Option<String>,
        data_after: Option<String>,
        actor: Option<&str>,
    ) -> RepoResult<i64>;

    /// Entries for one record, newest first.
    fn history(
        &self,
        table: AuditTable,
        record_id: &str,
    ) -> RepoResult<LiveQuery<Vec<AuditLogEntry>>>;

    /// Most recent entries across all tables, newest first.
    fn recent(&self, limit: usize) -> RepoResult<LiveQuery<Vec<AuditLogEntry>>>;

    /// Deletes entries strictly older than `cutoff_epoch_ms`.
    fn purge_before(&self, cutoff_epoch_ms: i64) -> RepoResult<usize>;
}

/// SQLite-backed audit trail.
#[derive(Debug, Clone)]
pub struct SqliteAuditTrail {
    store: Store,
}

impl SqliteAuditTrail {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl AuditTrail for SqliteAuditTrail {
    fn record(
        &self,
        table: AuditTable,
        record_id: &str,
        operation: AuditOperation,
        data_before: Option<String>,
        data_after: Option<String>,
        actor: Option<&str>,
    ) -> RepoResult<i64> {
        let actor = actor.or(self.store.config().actor.as_deref());
        self.store.write(|tx| {
            record_audit(
                tx,
                actor,
                table,
                record_id,
                operation,
                data_before.as_deref(),
                data_after.as_deref(),
            )
        })
    }

    fn history(
        &self,
        table: AuditTable,
        record_id: &str,
    ) -> RepoResult<LiveQuery<Vec<AuditLogEntry>>> {
        let record_id = record_id.to_string();
        LiveQuery::new(&self.store, "audit_history", move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "{AUDIT_SELECT_SQL}
                 WHERE table_name = ?1
                   AND record_id = ?2
                 ORDER BY timestamp DESC, id DESC;"
            ))?;
            let mut rows = stmt.query(params![table.as_str(), record_id])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(parse_audit_row(row)?);
            }
            Ok(entries)
        })
    }

    fn recent(&self, limit: usize) -> RepoResult<LiveQuery<Vec<AuditLogEntry>>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        LiveQuery::new(&self.store, "audit_recent", move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "{AUDIT_SELECT_SQL}
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1;"
            ))?;
            let mut rows = stmt.query([limit])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(parse_audit_row(row)?);
            }
            Ok(entries)
        })
    }

    fn purge_before(&self, cutoff_epoch_ms: i64) -> RepoResult<usize> {
        let removed = self.store.write(|tx| {
            tx.execute(
                "DELETE FROM audit_log WHERE timestamp < ?1;",
                [cutoff_epoch_ms],
            )
        })?;
        info!(
            "event=audit_purge module=repo status=ok cutoff={} removed={}",
            cutoff_epoch_ms, removed
        );
        Ok(removed)
    }
}

/// Appends one audit entry on an already open connection or transaction.
pub(crate) fn record_audit(
    conn: &Connection,
    actor: Option<&str>,
    table: AuditTable,
    record_id: &str,
    operation: AuditOperation,
    data_before: Option<&str>,
    data_after: Option<&str>,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO audit_log (
            table_name,
            record_id,
            operation,
            data_before,
            data_after,
            timestamp,
            actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            table.as_str(),
            record_id,
            operation.as_str(),
            data_before,
            data_after,
            now_epoch_ms(),
            actor,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// JSON snapshot of an entity as stored in `data_before`/`data_after`.
pub(crate) fn snapshot<T: Serialize>(value: &T) -> RepoResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn parse_audit_row(row: &Row<'_>) -> RepoResult<AuditLogEntry> {
    let table_text: String = row.get("table_name")?;
    let operation_text: String = row.get("operation")?;
    Ok(AuditLogEntry {
        id: row.get("id")?,
        table: AuditTable::parse(&table_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid table `{table_text}` in audit_log"))
        })?,
        record_id: row.get("record_id")?,
        operation: AuditOperation::parse(&operation_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid operation `{operation_text}` in audit_log"
            ))
        })?,
        data_before: row.get("data_before")?,
        data_after: row.get("data_after")?,
        timestamp: row.get("timestamp")?,
        actor: row.get("actor")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{record_audit, AuditTrail, SqliteAuditTrail};
    use crate::db::Store;
    use crate::model::audit::{AuditOperation, AuditTable};

    #[test]
    fn entries_cannot_be_rewritten() {
        let store = Store::open_in_memory().unwrap();
        store
            .write(|tx| {
                record_audit(
                    tx,
                    None,
                    AuditTable::Authors,
                    "a-1",
                    AuditOperation::Insert,
                    None,
                    Some("{}"),
                )
            })
            .unwrap();

        let result: Result<usize, rusqlite::Error> = store.write(|tx| {
            tx.execute("UPDATE audit_log SET operation = 'DELETE';", [])
        });
        assert!(result.is_err());
    }

    #[test]
    fn record_uses_configured_actor() {
        let store = Store::open(&crate::CatalogConfig::default().with_actor("librarian")).unwrap();
        let trail = SqliteAuditTrail::new(store);
        trail
            .record(
                AuditTable::Books,
                "b-1",
                AuditOperation::UpdateStatus,
                Some(r#"{"borrow_status":"AVAILABLE"}"#.to_string()),
                Some(r#"{"borrow_status":"BORROWED"}"#.to_string()),
                None,
            )
            .unwrap();

        let history = trail.history(AuditTable::Books, "b-1").unwrap();
        let entries = history.current().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor.as_deref(), Some("librarian"));
        assert_eq!(entries[0].operation, AuditOperation::UpdateStatus);
    }

    #[test]
    fn explicit_actor_wins_over_configured_one() {
        let store = Store::open(&crate::CatalogConfig::default().with_actor("librarian")).unwrap();
        let trail = SqliteAuditTrail::new(store);
        trail
            .record(
                AuditTable::Authors,
                "a-1",
                AuditOperation::Update,
                None,
                None,
                Some("night-shift"),
            )
            .unwrap();
        trail
            .record(AuditTable::Authors, "a-1", AuditOperation::Delete, None, None, None)
            .unwrap();

        let entries = trail.history(AuditTable::Authors, "a-1").unwrap().current().unwrap();
        let actors: Vec<_> = entries.iter().map(|entry| entry.actor.as_deref()).collect();
        assert_eq!(actors, vec![Some("librarian"), Some("night-shift")]);
    }
}
