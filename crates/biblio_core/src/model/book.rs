//! Book domain model.
//!
//! # Responsibility
//! - Define the catalog book record and its borrow status.
//! - Provide field-level validation for book writes.
//!
//! # Invariants
//! - `id` is stable and never reused for another book.
//! - `category_id = None` means "uncategorized".
//! - Borrow status transitions are unrestricted.

use crate::model::author::{Author, AuthorId};
use crate::model::category::CategoryId;
use crate::model::validation::{check_required_text, is_valid_entry_date, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable book identifier.
pub type BookId = Uuid;

const TITLE_MIN_CHARS: usize = 2;
const TITLE_MAX_CHARS: usize = 200;

/// Lending state of one book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorrowStatus {
    /// On the shelf.
    #[default]
    Available,
    /// Lent out; blocks deletion of the book and of its category.
    Borrowed,
    /// Temporarily withdrawn for repair.
    UnderRepair,
}

impl BorrowStatus {
    /// Storage/audit text form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Borrowed => "BORROWED",
            Self::UnderRepair => "UNDER_REPAIR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "AVAILABLE" => Some(Self::Available),
            "BORROWED" => Some(Self::Borrowed),
            "UNDER_REPAIR" => Some(Self::UnderRepair),
            _ => None,
        }
    }
}

/// Catalog book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    /// Display title, 2..=200 characters.
    pub title: String,
    /// Entry date in `dd/MM/yyyy` form.
    pub entry_date: String,
    pub category_id: Option<CategoryId>,
    pub borrow_status: BorrowStatus,
    /// Free-form shelf code, required.
    pub code: String,
    pub is_deleted: bool,
    /// Epoch milliseconds of soft deletion.
    pub deleted_at: Option<i64>,
}

impl Book {
    /// Creates an available, uncategorized book with a generated id.
    pub fn new(
        title: impl Into<String>,
        entry_date: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            entry_date: entry_date.into(),
            category_id: None,
            borrow_status: BorrowStatus::Available,
            code: code.into(),
            is_deleted: false,
            deleted_at: None,
        }
    }

    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Validates title, entry date and code, in that order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_required_text("book title", &self.title, TITLE_MIN_CHARS, TITLE_MAX_CHARS)?;
        if self.entry_date.trim().is_empty() {
            return Err(ValidationError::Blank {
                field: "entry date",
            });
        }
        if !is_valid_entry_date(&self.entry_date) {
            return Err(ValidationError::InvalidEntryDate(self.entry_date.clone()));
        }
        if self.code.trim().is_empty() {
            return Err(ValidationError::Blank { field: "book code" });
        }
        Ok(())
    }
}

/// Book together with its active authors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookWithAuthors {
    pub book: Book,
    pub authors: Vec<Author>,
}

/// Junction row linking one book to one author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookAuthor {
    pub book_id: BookId,
    pub author_id: AuthorId,
}

#[cfg(test)]
mod tests {
    use super::{Book, BorrowStatus};
    use crate::model::validation::ValidationError;

    #[test]
    fn validation_order_is_title_date_code() {
        let book = Book::new("A", "bad", "");
        assert_eq!(
            book.validate(),
            Err(ValidationError::TooShort {
                field: "book title",
                min: 2
            })
        );

        let book = Book::new("Dune", "", "");
        assert_eq!(
            book.validate(),
            Err(ValidationError::Blank {
                field: "entry date"
            })
        );

        let book = Book::new("Dune", "2026/01/31", "");
        assert_eq!(
            book.validate(),
            Err(ValidationError::InvalidEntryDate("2026/01/31".to_string()))
        );

        let book = Book::new("Dune", "31/01/2026", " ");
        assert_eq!(
            book.validate(),
            Err(ValidationError::Blank { field: "book code" })
        );

        assert!(Book::new("Dune", "31/01/2026", "B-001").validate().is_ok());
    }

    #[test]
    fn borrow_status_text_roundtrip_matches_serde() {
        for status in [
            BorrowStatus::Available,
            BorrowStatus::Borrowed,
            BorrowStatus::UnderRepair,
        ] {
            assert_eq!(BorrowStatus::parse(status.as_str()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(BorrowStatus::parse("borrowed"), None);
    }
}
