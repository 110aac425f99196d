//! Repository error taxonomy.
//!
//! # Invariants
//! - Expected business outcomes (validation, rule violations, not-found)
//!   are distinct variants, never storage errors.
//! - `ErrorKind` classification of a variant never changes.

use crate::db::DbError;
use crate::model::audit::AuditTable;
use crate::model::author::AuthorId;
use crate::model::book::BookId;
use crate::model::category::CategoryId;
use crate::model::validation::ValidationError;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Stable classification of repository failures for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A field violates a stated rule.
    Validation,
    /// The operation would break a catalog invariant.
    BusinessRule,
    /// The referenced record does not exist or is soft-deleted.
    NotFound,
    /// Unexpected storage or runtime failure.
    Storage,
}

/// Error returned by every catalog repository operation.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    /// Linking `category_id` under `parent_id` would close a cycle.
    CyclicReference {
        category_id: CategoryId,
        parent_id: CategoryId,
    },
    /// Category still has directly assigned books in BORROWED state.
    BorrowedBooksInCategory(CategoryId),
    /// Book is currently borrowed.
    BookBorrowed(BookId),
    /// Book creation was attempted without any author.
    AuthorsRequired,
    /// Hard delete targets a row that was never soft-deleted.
    StillActive { table: AuditTable, id: uuid::Uuid },
    /// Hard delete targets a category other rows still point at.
    CategoryInUse(CategoryId),
    CategoryNotFound(CategoryId),
    BookNotFound(BookId),
    AuthorNotFound(AuthorId),
    /// Parent-chain walk exceeded the configured depth bound.
    HierarchyTooDeep {
        category_id: CategoryId,
        max_depth: usize,
    },
    /// Live query subscription was requested outside a Tokio runtime.
    NoRuntime,
    Db(DbError),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::CyclicReference { .. }
            | Self::BorrowedBooksInCategory(_)
            | Self::BookBorrowed(_)
            | Self::AuthorsRequired
            | Self::StillActive { .. }
            | Self::CategoryInUse(_) => ErrorKind::BusinessRule,
            Self::CategoryNotFound(_) | Self::BookNotFound(_) | Self::AuthorNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::HierarchyTooDeep { .. } | Self::NoRuntime | Self::Db(_) | Self::InvalidData(_) => {
                ErrorKind::Storage
            }
        }
    }

    /// Short machine-readable reason used in log events.
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::CyclicReference { .. } => "cyclic_reference",
            Self::BorrowedBooksInCategory(_) => "borrowed_books",
            Self::BookBorrowed(_) => "book_borrowed",
            Self::AuthorsRequired => "authors_required",
            Self::StillActive { .. } => "still_active",
            Self::CategoryInUse(_) => "category_in_use",
            Self::CategoryNotFound(_) => "category_not_found",
            Self::BookNotFound(_) => "book_not_found",
            Self::AuthorNotFound(_) => "author_not_found",
            Self::HierarchyTooDeep { .. } => "hierarchy_too_deep",
            Self::NoRuntime => "no_runtime",
            Self::Db(_) => "db_error",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

/// Emits the outcome event of one repository mutation.
///
/// Business rejections log at warn, storage faults at error.
pub(crate) fn log_mutation<T>(event: &str, record_id: &impl Display, result: &RepoResult<T>) {
    match result {
        Ok(_) => info!("event={event} module=repo status=ok record_id={record_id}"),
        Err(err) if err.kind() == ErrorKind::Storage => error!(
            "event={event} module=repo status=error record_id={record_id} reason={} error={err}",
            err.reason()
        ),
        Err(err) => warn!(
            "event={event} module=repo status=rejected record_id={record_id} reason={}",
            err.reason()
        ),
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CyclicReference {
                category_id,
                parent_id,
            } => write!(
                f,
                "cyclic reference: category {category_id} cannot be placed under {parent_id}"
            ),
            Self::BorrowedBooksInCategory(id) => write!(
                f,
                "cannot delete category {id}: books currently borrowed"
            ),
            Self::BookBorrowed(id) => write!(f, "cannot delete a borrowed book: {id}"),
            Self::AuthorsRequired => write!(f, "at least one author required"),
            Self::StillActive { table, id } => write!(
                f,
                "cannot purge {id} from {}: soft-delete it first",
                table.as_str()
            ),
            Self::CategoryInUse(id) => write!(
                f,
                "cannot purge category {id}: other categories or books still reference it"
            ),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::BookNotFound(id) => write!(f, "book not found: {id}"),
            Self::AuthorNotFound(id) => write!(f, "author not found: {id}"),
            Self::HierarchyTooDeep {
                category_id,
                max_depth,
            } => write!(
                f,
                "category hierarchy above {category_id} exceeds {max_depth} levels"
            ),
            Self::NoRuntime => write!(f, "live query subscription requires a Tokio runtime"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(format!("snapshot serialization failed: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, RepoError};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn kinds_separate_business_rules_from_not_found() {
        let id = Uuid::new_v4();
        assert_eq!(
            RepoError::Validation(ValidationError::Blank { field: "name" }).kind(),
            ErrorKind::Validation
        );
        assert_eq!(RepoError::BookBorrowed(id).kind(), ErrorKind::BusinessRule);
        assert_eq!(RepoError::AuthorsRequired.kind(), ErrorKind::BusinessRule);
        assert_eq!(
            RepoError::StillActive {
                table: crate::model::audit::AuditTable::Books,
                id
            }
            .kind(),
            ErrorKind::BusinessRule
        );
        assert_eq!(RepoError::CategoryInUse(id).kind(), ErrorKind::BusinessRule);
        assert_eq!(RepoError::BookNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(
            RepoError::HierarchyTooDeep {
                category_id: id,
                max_depth: 4
            }
            .kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(
            RepoError::AuthorsRequired.to_string(),
            "at least one author required"
        );
        let id = Uuid::nil();
        assert!(RepoError::BorrowedBooksInCategory(id)
            .to_string()
            .contains("books currently borrowed"));
    }
}
