//! Category repository.
//!
//! # Responsibility
//! - Validate, cycle-check, persist and audit category mutations in one
//!   transaction each.
//! - Serve live reads over active categories.
//!
//! # Invariants
//! - No active category is left under a soft-deleted parent.
//! - A delete is refused while any active book directly in the category is
//!   borrowed; descendants are not inspected.
//! - Every row a mutation changes gets exactly one audit entry, so a
//!   record's newest snapshot always matches its stored state.
//! - Only soft-deleted, unreferenced categories are physically removed.

use crate::db::Store;
use crate::live::LiveQuery;
use crate::model::audit::{AuditOperation, AuditTable};
use crate::model::book::BorrowStatus;
use crate::model::category::{Category, CategoryId, CategoryWithBooks, CategoryWithChildren};
use crate::model::validation::ValidationError;
use crate::repo::audit_repo::{record_audit, snapshot};
use crate::repo::cycle_guard::CycleGuard;
use crate::repo::error::{log_mutation, RepoError, RepoResult};
use crate::repo::rows::{load_book, load_category, now_epoch_ms, query_books, query_categories};
use rusqlite::{params, Connection};

/// Category data access contract.
pub trait CategoryRepository {
    fn create(&self, category: &Category) -> RepoResult<CategoryId>;
    fn update(&self, category: &Category) -> RepoResult<()>;
    /// Soft-deletes a category. Its direct books are either moved to
    /// uncategorized or soft-deleted with it; its direct children are lifted
    /// to its own parent.
    fn delete(&self, id: CategoryId, move_books_to_uncategorized: bool) -> RepoResult<()>;
    /// Physically removes a soft-deleted category that nothing references.
    fn hard_delete(&self, id: CategoryId) -> RepoResult<()>;
    fn list(&self) -> RepoResult<LiveQuery<Vec<Category>>>;
    fn get_by_id(&self, id: CategoryId) -> RepoResult<LiveQuery<Option<Category>>>;
    fn list_roots(&self) -> RepoResult<LiveQuery<Vec<Category>>>;
    fn list_children(&self, parent_id: CategoryId) -> RepoResult<LiveQuery<Vec<Category>>>;
    fn get_with_children(
        &self,
        id: CategoryId,
    ) -> RepoResult<LiveQuery<Option<CategoryWithChildren>>>;
    fn get_with_books(&self, id: CategoryId) -> RepoResult<LiveQuery<Option<CategoryWithBooks>>>;
    /// Borrowed active books anywhere under `id`, the category included.
    fn count_borrowed_in_subtree(&self, id: CategoryId) -> RepoResult<usize>;
}

/// SQLite-backed category repository.
#[derive(Debug, Clone)]
pub struct SqliteCategoryRepository {
    store: Store,
}

impl SqliteCategoryRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn guard<'conn>(&self, conn: &'conn Connection) -> CycleGuard<'conn> {
        CycleGuard::new(conn, self.store.config().max_category_depth)
    }

    /// Parent must be active, and linking must not close a cycle.
    fn check_parent(
        &self,
        conn: &Connection,
        category_id: CategoryId,
        parent_id: CategoryId,
    ) -> RepoResult<()> {
        if load_category(conn, parent_id, false)?.is_none() {
            return Err(RepoError::CategoryNotFound(parent_id));
        }
        if self
            .guard(conn)
            .would_create_cycle(category_id, Some(parent_id))?
        {
            return Err(RepoError::CyclicReference {
                category_id,
                parent_id,
            });
        }
        Ok(())
    }
}

impl CategoryRepository for SqliteCategoryRepository {
    fn create(&self, category: &Category) -> RepoResult<CategoryId> {
        let actor = self.store.config().actor.as_deref();
        let result = validate_category(category).and_then(|()| {
            self.store.write(|tx| {
                if let Some(parent_id) = category.parent_id {
                    self.check_parent(tx, category.id, parent_id)?;
                }

                tx.execute(
                    "INSERT INTO categories (
                        id,
                        name,
                        description,
                        parent_id,
                        is_deleted,
                        deleted_at
                    ) VALUES (?1, ?2, ?3, ?4, 0, NULL);",
                    params![
                        category.id.to_string(),
                        category.name.as_str(),
                        category.description.as_str(),
                        category.parent_id.map(|id| id.to_string()),
                    ],
                )?;

                let persisted = require_active(tx, category.id)?;
                record_audit(
                    tx,
                    actor,
                    AuditTable::Categories,
                    &category.id.to_string(),
                    AuditOperation::Insert,
                    None,
                    Some(&snapshot(&persisted)?),
                )?;
                Ok(category.id)
            })
        });
        log_mutation("category_create", &category.id, &result);
        result
    }

    fn update(&self, category: &Category) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = validate_category(category).and_then(|()| {
            self.store.write(|tx| {
                let before = require_active(tx, category.id)?;
                if category.parent_id != before.parent_id {
                    if let Some(parent_id) = category.parent_id {
                        self.check_parent(tx, category.id, parent_id)?;
                    }
                }

                tx.execute(
                    "UPDATE categories
                     SET
                        name = ?1,
                        description = ?2,
                        parent_id = ?3
                     WHERE id = ?4
                       AND is_deleted = 0;",
                    params![
                        category.name.as_str(),
                        category.description.as_str(),
                        category.parent_id.map(|id| id.to_string()),
                        category.id.to_string(),
                    ],
                )?;

                let after = require_active(tx, category.id)?;
                record_audit(
                    tx,
                    actor,
                    AuditTable::Categories,
                    &category.id.to_string(),
                    AuditOperation::Update,
                    Some(&snapshot(&before)?),
                    Some(&snapshot(&after)?),
                )?;
                Ok(())
            })
        });
        log_mutation("category_update", &category.id, &result);
        result
    }

    fn delete(&self, id: CategoryId, move_books_to_uncategorized: bool) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = self.store.write(|tx| {
            let before = require_active(tx, id)?;
            let id_text = id.to_string();

            let borrowed: i64 = tx.query_row(
                "SELECT COUNT(*)
                 FROM books
                 WHERE category_id = ?1
                   AND is_deleted = 0
                   AND borrow_status = ?2;",
                params![id_text, BorrowStatus::Borrowed.as_str()],
                |row| row.get(0),
            )?;
            if borrowed > 0 {
                return Err(RepoError::BorrowedBooksInCategory(id));
            }

            let deleted_at = now_epoch_ms();
            for book in query_books(tx, "AND category_id = ?1", params![id_text])? {
                let book_text = book.id.to_string();
                let operation = if move_books_to_uncategorized {
                    tx.execute(
                        "UPDATE books SET category_id = NULL WHERE id = ?1;",
                        [&book_text],
                    )?;
                    AuditOperation::Update
                } else {
                    tx.execute(
                        "UPDATE books
                         SET
                            is_deleted = 1,
                            deleted_at = ?2
                         WHERE id = ?1;",
                        params![book_text, deleted_at],
                    )?;
                    AuditOperation::Delete
                };
                let after = load_book(tx, book.id, true)?
                    .filter(|_| operation == AuditOperation::Update)
                    .map(|row| snapshot(&row))
                    .transpose()?;
                record_audit(
                    tx,
                    actor,
                    AuditTable::Books,
                    &book_text,
                    operation,
                    Some(&snapshot(&book)?),
                    after.as_deref(),
                )?;
            }

            // Direct children move up to the deleted category's parent.
            for child in query_categories(tx, "AND parent_id = ?1", params![id_text])? {
                let child_text = child.id.to_string();
                tx.execute(
                    "UPDATE categories SET parent_id = ?2 WHERE id = ?1;",
                    params![child_text, before.parent_id.map(|parent| parent.to_string())],
                )?;
                let lifted = require_active(tx, child.id)?;
                record_audit(
                    tx,
                    actor,
                    AuditTable::Categories,
                    &child_text,
                    AuditOperation::Update,
                    Some(&snapshot(&child)?),
                    Some(&snapshot(&lifted)?),
                )?;
            }

            tx.execute(
                "UPDATE categories
                 SET
                    is_deleted = 1,
                    deleted_at = ?2
                 WHERE id = ?1;",
                params![id_text, deleted_at],
            )?;

            record_audit(
                tx,
                actor,
                AuditTable::Categories,
                &id_text,
                AuditOperation::Delete,
                Some(&snapshot(&before)?),
                None,
            )?;
            Ok(())
        });
        log_mutation("category_delete", &id, &result);
        result
    }

    fn hard_delete(&self, id: CategoryId) -> RepoResult<()> {
        let actor = self.store.config().actor.as_deref();
        let result = self.store.write(|tx| {
            let tombstone =
                load_category(tx, id, true)?.ok_or(RepoError::CategoryNotFound(id))?;
            if !tombstone.is_deleted {
                return Err(RepoError::StillActive {
                    table: AuditTable::Categories,
                    id,
                });
            }

            let id_text = id.to_string();
            let referenced: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE parent_id = ?1)
                     OR EXISTS(SELECT 1 FROM books WHERE category_id = ?1);",
                [&id_text],
                |row| row.get(0),
            )?;
            if referenced {
                return Err(RepoError::CategoryInUse(id));
            }

            tx.execute("DELETE FROM categories WHERE id = ?1;", [&id_text])?;
            record_audit(
                tx,
                actor,
                AuditTable::Categories,
                &id_text,
                AuditOperation::Delete,
                Some(&snapshot(&tombstone)?),
                None,
            )?;
            Ok(())
        });
        log_mutation("category_hard_delete", &id, &result);
        result
    }

    fn list(&self) -> RepoResult<LiveQuery<Vec<Category>>> {
        LiveQuery::new(&self.store, "category_list", |conn| {
            query_categories(conn, "", params![])
        })
    }

    fn get_by_id(&self, id: CategoryId) -> RepoResult<LiveQuery<Option<Category>>> {
        LiveQuery::new(&self.store, "category_get", move |conn| {
            load_category(conn, id, false)
        })
    }

    fn list_roots(&self) -> RepoResult<LiveQuery<Vec<Category>>> {
        LiveQuery::new(&self.store, "category_roots", |conn| {
            query_categories(conn, "AND parent_id IS NULL", params![])
        })
    }

    fn list_children(&self, parent_id: CategoryId) -> RepoResult<LiveQuery<Vec<Category>>> {
        let parent_text = parent_id.to_string();
        LiveQuery::new(&self.store, "category_children", move |conn| {
            query_categories(conn, "AND parent_id = ?1", params![parent_text])
        })
    }

    fn get_with_children(
        &self,
        id: CategoryId,
    ) -> RepoResult<LiveQuery<Option<CategoryWithChildren>>> {
        LiveQuery::new(&self.store, "category_with_children", move |conn| {
            let Some(category) = load_category(conn, id, false)? else {
                return Ok(None);
            };
            let children =
                query_categories(conn, "AND parent_id = ?1", params![id.to_string()])?;
            Ok(Some(CategoryWithChildren { category, children }))
        })
    }

    fn get_with_books(&self, id: CategoryId) -> RepoResult<LiveQuery<Option<CategoryWithBooks>>> {
        LiveQuery::new(&self.store, "category_with_books", move |conn| {
            let Some(category) = load_category(conn, id, false)? else {
                return Ok(None);
            };
            let books = query_books(conn, "AND category_id = ?1", params![id.to_string()])?;
            Ok(Some(CategoryWithBooks { category, books }))
        })
    }

    fn count_borrowed_in_subtree(&self, id: CategoryId) -> RepoResult<usize> {
        self.store.read(|conn| {
            require_active(conn, id)?;
            let subtree = self.guard(conn).collect_subtree_ids(id)?;
            let mut stmt = conn.prepare_cached(
                "SELECT COUNT(*)
                 FROM books
                 WHERE category_id = ?1
                   AND is_deleted = 0
                   AND borrow_status = ?2;",
            )?;
            let mut total = 0_usize;
            for category_id in subtree {
                let count: i64 = stmt.query_row(
                    params![category_id.to_string(), BorrowStatus::Borrowed.as_str()],
                    |row| row.get(0),
                )?;
                total += usize::try_from(count).unwrap_or(0);
            }
            Ok(total)
        })
    }
}

/// Field validation, with self-parenting reported as a cycle.
fn validate_category(category: &Category) -> RepoResult<()> {
    match category.validate() {
        Ok(()) => Ok(()),
        Err(ValidationError::SelfParent(id)) => Err(RepoError::CyclicReference {
            category_id: id,
            parent_id: id,
        }),
        Err(err) => Err(err.into()),
    }
}

fn require_active(conn: &Connection, id: CategoryId) -> RepoResult<Category> {
    load_category(conn, id, false)?.ok_or(RepoError::CategoryNotFound(id))
}
