//! Core of the biblio library catalog.
//! Owns every catalog invariant: validation, hierarchy integrity, soft
//! deletion and the audit trail.

pub mod catalog;
pub mod config;
pub mod db;
pub mod live;
pub mod logging;
pub mod model;
pub mod repo;

pub use catalog::Catalog;
pub use config::CatalogConfig;
pub use db::{DbError, DbResult, Store};
pub use live::{LiveQuery, LiveValue, Subscription};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingStatus};
pub use model::audit::{AuditLogEntry, AuditOperation, AuditTable};
pub use model::author::{Author, AuthorId};
pub use model::book::{Book, BookAuthor, BookId, BookWithAuthors, BorrowStatus};
pub use model::category::{Category, CategoryId, CategoryWithBooks, CategoryWithChildren};
pub use model::validation::{is_valid_entry_date, ValidationError};
pub use repo::{
    AuditTrail, AuthorRepository, BookRepository, CategoryRepository, CycleGuard, ErrorKind,
    RepoError, RepoResult, SqliteAuditTrail, SqliteAuthorRepository, SqliteBookRepository,
    SqliteCategoryRepository,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
