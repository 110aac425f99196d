//! Author repository.
//!
//! Deleting an author never touches its book links; book reads simply stop
//! listing a soft-deleted author. Purging a soft-deleted author drops those
//! links with it.

use crate::db::Store;
use crate::live::LiveQuery;
use crate::model::audit::{AuditOperation, AuditTable};
use crate::model::author::{Author, AuthorId};
use crate::repo::audit_repo::{record_audit, snapshot};
use crate::repo::error::{log_mutation, RepoError, RepoResult};
use crate::repo::rows::{list_active_authors, load_author, now_epoch_ms};
use rusqlite::{params, Connection};

/// Author data access contract.
pub trait AuthorRepository {
    fn create(&self, author: &Author) -> RepoResult<AuthorId>;
    fn update(&self, author: &Author) -> RepoResult<()>;
    fn delete(&self, id: AuthorId) -> RepoResult<()>;
    fn hard_delete(&self, id: AuthorId) -> RepoResult<()>;
    fn list(&self) -> RepoResult<LiveQuery<Vec<Author>>>;
    fn get_by_id(&self, id: AuthorId) -> RepoResult<LiveQuery<Option<Author>>>;
}

/// SQLite-backed author repository.
#[derive(Debug, Clone)]
pub struct SqliteAuthorRepository {
    store: Store,
}

impl SqliteAuthorRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl AuthorRepository for SqliteAuthorRepository {
    fn create(&self, author: &Author) -> RepoResult<AuthorId> {
        let actor = self.store.config().actor.as_deref();
        let result = author.validate().map_err(RepoError::from).and_then(|()| {
            self.store.write(|tx| {
                tx.execute(
                    "INSERT INTO authors (
                        id,
                        name,
                        biography,
                        is_deleted,
                        deleted_at
                    ) VALUES (?1, ?2, ?3, 0, NULL);",
                    params![
                        author.id.to_string(),
                        author.name.as_str(),
                        author.biography.as_str(),
                    ],
                )?;

                let persisted = require_active(tx, author.id)?;
                record_audit(
                    tx,
                    actor,
                    AuditTable::Authors,
                    &author.id.to_string(),
                    AuditOperation::Insert,
                    None,
                    Some(&snapshot(&persisted)?),
                )?;
                Ok(author.id)
            })
        });
        log_mutation("author_create", &author.id, &result);
        result
    }

    fn update(&self, author: &Author) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = author.validate().map_err(RepoError::from).and_then(|()| {
            self.store.write(|tx| {
                let before = require_active(tx, author.id)?;
                tx.execute(
                    "UPDATE authors
                     SET
                        name = ?1,
                        biography = ?2
                     WHERE id = ?3
                       AND is_deleted = 0;",
                    params![
                        author.name.as_str(),
                        author.biography.as_str(),
                        author.id.to_string(),
                    ],
                )?;

                let after = require_active(tx, author.id)?;
                record_audit(
                    tx,
                    actor,
                    AuditTable::Authors,
                    &author.id.to_string(),
                    AuditOperation::Update,
                    Some(&snapshot(&before)?),
                    Some(&snapshot(&after)?),
                )?;
                Ok(())
            })
        });
        log_mutation("author_update", &author.id, &result);
        result
    }

    fn delete(&self, id: AuthorId) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = self.store.write(|tx| {
            let before = require_active(tx, id)?;
            tx.execute(
                "UPDATE authors
                 SET
                    is_deleted = 1,
                    deleted_at = ?2
                 WHERE id = ?1;",
                params![id.to_string(), now_epoch_ms()],
            )?;
            record_audit(
                tx,
                actor,
                AuditTable::Authors,
                &id.to_string(),
                AuditOperation::Delete,
                Some(&snapshot(&before)?),
                None,
            )?;
            Ok(())
        });
        log_mutation("author_delete", &id, &result);
        result
    }

    fn hard_delete(&self, id: AuthorId) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = self.store.write(|tx| {
            let tombstone = load_author(tx, id, true)?.ok_or(RepoError::AuthorNotFound(id))?;
            if !tombstone.is_deleted {
                return Err(RepoError::StillActive {
                    table: AuditTable::Authors,
                    id,
                });
            }

            tx.execute("DELETE FROM authors WHERE id = ?1;", [id.to_string()])?;
            record_audit(
                tx,
                actor,
                AuditTable::Authors,
                &id.to_string(),
                AuditOperation::Delete,
                Some(&snapshot(&tombstone)?),
                None,
            )?;
            Ok(())
        });
        log_mutation("author_hard_delete", &id, &result);
        result
    }

    fn list(&self) -> RepoResult<LiveQuery<Vec<Author>>> {
        LiveQuery::new(&self.store, "author_list", list_active_authors)
    }

    fn get_by_id(&self, id: AuthorId) -> RepoResult<LiveQuery<Option<Author>>> {
        LiveQuery::new(&self.store, "author_get", move |conn| {
            load_author(conn, id, false)
        })
    }
}

fn require_active(conn: &Connection, id: AuthorId) -> RepoResult<Author> {
    load_author(conn, id, false)?.ok_or(RepoError::AuthorNotFound(id))
}
