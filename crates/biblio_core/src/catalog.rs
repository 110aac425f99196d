//! Startup bundle wiring one store to every repository.

use crate::config::CatalogConfig;
use crate::db::{DbResult, Store};
use crate::repo::{
    SqliteAuditTrail, SqliteAuthorRepository, SqliteBookRepository, SqliteCategoryRepository,
};

/// All catalog repositories over one shared store.
///
/// Construct once at startup and hand out the repositories (or clones of
/// the whole bundle) to callers.
#[derive(Debug, Clone)]
pub struct Catalog {
    store: Store,
    categories: SqliteCategoryRepository,
    books: SqliteBookRepository,
    authors: SqliteAuthorRepository,
    audit: SqliteAuditTrail,
}

impl Catalog {
    /// Opens (or creates) the configured database and applies migrations.
    pub fn open(config: &CatalogConfig) -> DbResult<Self> {
        Ok(Self::from_store(Store::open(config)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&CatalogConfig::default())
    }

    pub fn from_store(store: Store) -> Self {
        Self {
            categories: SqliteCategoryRepository::new(store.clone()),
            books: SqliteBookRepository::new(store.clone()),
            authors: SqliteAuthorRepository::new(store.clone()),
            audit: SqliteAuditTrail::new(store.clone()),
            store,
        }
    }

    pub fn categories(&self) -> &SqliteCategoryRepository {
        &self.categories
    }

    pub fn books(&self) -> &SqliteBookRepository {
        &self.books
    }

    pub fn authors(&self) -> &SqliteAuthorRepository {
        &self.authors
    }

    pub fn audit(&self) -> &SqliteAuditTrail {
        &self.audit
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}
