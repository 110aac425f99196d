//! Book repository.
//!
//! # Responsibility
//! - Persist books together with their author links and audit entries.
//! - Gate deletion on borrow status.
//! - Serve live reads of books with their active authors.
//!
//! # Invariants
//! - A book is created with at least one active author, atomically.
//! - A borrowed book is never soft-deleted.
//! - Only soft-deleted books are physically removed.
//! - Every successful mutation appends exactly one audit entry.

use crate::db::Store;
use crate::live::LiveQuery;
use crate::model::audit::{AuditOperation, AuditTable};
use crate::model::author::AuthorId;
use crate::model::book::{Book, BookAuthor, BookId, BookWithAuthors, BorrowStatus};
use crate::model::category::CategoryId;
use crate::repo::audit_repo::{record_audit, snapshot};
use crate::repo::error::{log_mutation, RepoError, RepoResult};
use crate::repo::rows::{
    insert_book_author, list_book_authors, load_author, load_book, load_category, now_epoch_ms,
    parse_book_row, query_books, BOOK_SELECT_SQL,
};
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeSet;

/// Book data access contract.
pub trait BookRepository {
    /// Creates a book linked to `author_ids`. Duplicate ids are collapsed.
    fn create(&self, book: &Book, author_ids: &[AuthorId]) -> RepoResult<BookId>;
    fn update(&self, book: &Book) -> RepoResult<()>;
    fn delete(&self, id: BookId) -> RepoResult<()>;
    /// Physically removes a soft-deleted book and its author links.
    fn hard_delete(&self, id: BookId) -> RepoResult<()>;
    /// Sets the borrow status. Any transition is allowed.
    fn update_borrow_status(&self, id: BookId, status: BorrowStatus) -> RepoResult<()>;
    fn list(&self) -> RepoResult<LiveQuery<Vec<BookWithAuthors>>>;
    fn get_by_id(&self, id: BookId) -> RepoResult<LiveQuery<Option<BookWithAuthors>>>;
    fn list_by_category(
        &self,
        category_id: CategoryId,
    ) -> RepoResult<LiveQuery<Vec<BookWithAuthors>>>;
    /// Books in the category and all of its active descendants.
    fn list_by_category_recursive(&self, category_id: CategoryId)
        -> RepoResult<LiveQuery<Vec<Book>>>;
}

/// SQLite-backed book repository.
#[derive(Debug, Clone)]
pub struct SqliteBookRepository {
    store: Store,
}

impl SqliteBookRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl BookRepository for SqliteBookRepository {
    fn create(&self, book: &Book, author_ids: &[AuthorId]) -> RepoResult<BookId> {
        let actor = self.store.config().actor.as_deref();
        let result = book.validate().map_err(RepoError::from).and_then(|()| {
            if author_ids.is_empty() {
                return Err(RepoError::AuthorsRequired);
            }
            let author_ids: BTreeSet<AuthorId> = author_ids.iter().copied().collect();

            self.store.write(|tx| {
                check_category(tx, book.category_id)?;
                for author_id in &author_ids {
                    if load_author(tx, *author_id, false)?.is_none() {
                        return Err(RepoError::AuthorNotFound(*author_id));
                    }
                }

                tx.execute(
                    "INSERT INTO books (
                        id,
                        title,
                        entry_date,
                        category_id,
                        borrow_status,
                        code,
                        is_deleted,
                        deleted_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL);",
                    params![
                        book.id.to_string(),
                        book.title.as_str(),
                        book.entry_date.as_str(),
                        book.category_id.map(|id| id.to_string()),
                        book.borrow_status.as_str(),
                        book.code.as_str(),
                    ],
                )?;
                for author_id in &author_ids {
                    insert_book_author(
                        tx,
                        BookAuthor {
                            book_id: book.id,
                            author_id: *author_id,
                        },
                    )?;
                }

                let persisted = require_active(tx, book.id)?;
                record_audit(
                    tx,
                    actor,
                    AuditTable::Books,
                    &book.id.to_string(),
                    AuditOperation::Insert,
                    None,
                    Some(&snapshot(&persisted)?),
                )?;
                Ok(book.id)
            })
        });
        log_mutation("book_create", &book.id, &result);
        result
    }

    fn update(&self, book: &Book) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = book.validate().map_err(RepoError::from).and_then(|()| {
            self.store.write(|tx| {
                let before = require_active(tx, book.id)?;
                check_category(tx, book.category_id)?;

                tx.execute(
                    "UPDATE books
                     SET
                        title = ?1,
                        entry_date = ?2,
                        category_id = ?3,
                        borrow_status = ?4,
                        code = ?5
                     WHERE id = ?6
                       AND is_deleted = 0;",
                    params![
                        book.title.as_str(),
                        book.entry_date.as_str(),
                        book.category_id.map(|id| id.to_string()),
                        book.borrow_status.as_str(),
                        book.code.as_str(),
                        book.id.to_string(),
                    ],
                )?;

                let after = require_active(tx, book.id)?;
                record_audit(
                    tx,
                    actor,
                    AuditTable::Books,
                    &book.id.to_string(),
                    AuditOperation::Update,
                    Some(&snapshot(&before)?),
                    Some(&snapshot(&after)?),
                )?;
                Ok(())
            })
        });
        log_mutation("book_update", &book.id, &result);
        result
    }

    fn delete(&self, id: BookId) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = self.store.write(|tx| {
            let before = require_active(tx, id)?;
            if before.borrow_status == BorrowStatus::Borrowed {
                return Err(RepoError::BookBorrowed(id));
            }

            tx.execute(
                "UPDATE books
                 SET
                    is_deleted = 1,
                    deleted_at = ?2
                 WHERE id = ?1;",
                params![id.to_string(), now_epoch_ms()],
            )?;
            record_audit(
                tx,
                actor,
                AuditTable::Books,
                &id.to_string(),
                AuditOperation::Delete,
                Some(&snapshot(&before)?),
                None,
            )?;
            Ok(())
        });
        log_mutation("book_delete", &id, &result);
        result
    }

    fn hard_delete(&self, id: BookId) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = self.store.write(|tx| {
            let tombstone = load_book(tx, id, true)?.ok_or(RepoError::BookNotFound(id))?;
            if !tombstone.is_deleted {
                return Err(RepoError::StillActive {
                    table: AuditTable::Books,
                    id,
                });
            }

            // book_authors rows go with it through ON DELETE CASCADE.
            tx.execute("DELETE FROM books WHERE id = ?1;", [id.to_string()])?;
            record_audit(
                tx,
                actor,
                AuditTable::Books,
                &id.to_string(),
                AuditOperation::Delete,
                Some(&snapshot(&tombstone)?),
                None,
            )?;
            Ok(())
        });
        log_mutation("book_hard_delete", &id, &result);
        result
    }

    fn update_borrow_status(&self, id: BookId, status: BorrowStatus) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = self.store.write(|tx| {
            let before = require_active(tx, id)?;
            tx.execute(
                "UPDATE books
                 SET borrow_status = ?2
                 WHERE id = ?1;",
                params![id.to_string(), status.as_str()],
            )?;
            record_audit(
                tx,
                actor,
                AuditTable::Books,
                &id.to_string(),
                AuditOperation::UpdateStatus,
                Some(&json!({ "borrow_status": before.borrow_status }).to_string()),
                Some(&json!({ "borrow_status": status }).to_string()),
            )?;
            Ok(())
        });
        log_mutation("book_update_status", &id, &result);
        result
    }

    fn list(&self) -> RepoResult<LiveQuery<Vec<BookWithAuthors>>> {
        LiveQuery::new(&self.store, "book_list", |conn| {
            with_authors(conn, query_books(conn, "", params![])?)
        })
    }

    fn get_by_id(&self, id: BookId) -> RepoResult<LiveQuery<Option<BookWithAuthors>>> {
        LiveQuery::new(&self.store, "book_get", move |conn| {
            let Some(book) = load_book(conn, id, false)? else {
                return Ok(None);
            };
            let authors = list_book_authors(conn, book.id)?;
            Ok(Some(BookWithAuthors { book, authors }))
        })
    }

    fn list_by_category(
        &self,
        category_id: CategoryId,
    ) -> RepoResult<LiveQuery<Vec<BookWithAuthors>>> {
        let category_text = category_id.to_string();
        LiveQuery::new(&self.store, "book_list_by_category", move |conn| {
            let books = query_books(conn, "AND category_id = ?1", params![category_text])?;
            with_authors(conn, books)
        })
    }

    fn list_by_category_recursive(
        &self,
        category_id: CategoryId,
    ) -> RepoResult<LiveQuery<Vec<Book>>> {
        let category_text = category_id.to_string();
        LiveQuery::new(&self.store, "book_list_by_subtree", move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "WITH RECURSIVE subtree(id) AS (
                    SELECT id
                    FROM categories
                    WHERE id = ?1
                      AND is_deleted = 0
                    UNION
                    SELECT child.id
                    FROM categories child
                    INNER JOIN subtree parent ON child.parent_id = parent.id
                    WHERE child.is_deleted = 0
                )
                {BOOK_SELECT_SQL}
                WHERE is_deleted = 0
                  AND category_id IN (SELECT id FROM subtree)
                ORDER BY title ASC, id ASC;"
            ))?;
            let mut rows = stmt.query([&category_text])?;
            let mut books = Vec::new();
            while let Some(row) = rows.next()? {
                books.push(parse_book_row(row)?);
            }
            Ok(books)
        })
    }
}

fn require_active(conn: &Connection, id: BookId) -> RepoResult<Book> {
    load_book(conn, id, false)?.ok_or(RepoError::BookNotFound(id))
}

fn check_category(conn: &Connection, category_id: Option<CategoryId>) -> RepoResult<()> {
    match category_id {
        Some(id) if load_category(conn, id, false)?.is_none() => {
            Err(RepoError::CategoryNotFound(id))
        }
        _ => Ok(()),
    }
}

fn with_authors(conn: &Connection, books: Vec<Book>) -> RepoResult<Vec<BookWithAuthors>> {
    books
        .into_iter()
        .map(|book| {
            let authors = list_book_authors(conn, book.id)?;
            Ok(BookWithAuthors { book, authors })
        })
        .collect()
}
