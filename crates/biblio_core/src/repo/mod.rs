//! Repository layer: catalog data access contracts and their SQLite
//! implementations.
//!
//! # Responsibility
//! - Orchestrate validation, hierarchy checks, storage and audit for every
//!   mutation inside one transaction.
//! - Expose reads as live queries over active rows only.
//!
//! # Invariants
//! - Repository writes run `validate()` before touching storage.
//! - Business outcomes (`CyclicReference`, `*NotFound`, ...) are returned as
//!   semantic errors, never as storage errors.

pub mod audit_repo;
pub mod author_repo;
pub mod book_repo;
pub mod category_repo;
pub mod cycle_guard;
pub mod error;
mod rows;

pub use audit_repo::{AuditTrail, SqliteAuditTrail};
pub use author_repo::{AuthorRepository, SqliteAuthorRepository};
pub use book_repo::{BookRepository, SqliteBookRepository};
pub use category_repo::{CategoryRepository, SqliteCategoryRepository};
pub use cycle_guard::CycleGuard;
pub use error::{ErrorKind, RepoError, RepoResult};
