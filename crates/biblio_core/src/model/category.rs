//! Category domain model.
//!
//! # Responsibility
//! - Define the hierarchical grouping record for books.
//! - Provide field-level validation for category writes.
//!
//! # Invariants
//! - `id` is stable and never reused for another category.
//! - `parent_id` never equals `id`.
//! - `deleted_at` is set iff `is_deleted` is true.

use crate::model::book::Book;
use crate::model::validation::{check_required_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable category identifier.
pub type CategoryId = Uuid;

const NAME_MIN_CHARS: usize = 3;
const NAME_MAX_CHARS: usize = 100;

/// Node of the category forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Display name, 3..=100 characters.
    pub name: String,
    pub description: String,
    /// Parent category. `None` means root-level.
    pub parent_id: Option<CategoryId>,
    pub is_deleted: bool,
    /// Epoch milliseconds of soft deletion.
    pub deleted_at: Option<i64>,
}

impl Category {
    /// Creates a root-level category with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            parent_id: None,
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// Sets the parent category.
    pub fn with_parent(mut self, parent_id: CategoryId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validates name bounds, then self-parenting.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_required_text("category name", &self.name, NAME_MIN_CHARS, NAME_MAX_CHARS)?;
        if self.parent_id == Some(self.id) {
            return Err(ValidationError::SelfParent(self.id));
        }
        Ok(())
    }
}

/// Category together with its direct active children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryWithChildren {
    pub category: Category,
    pub children: Vec<Category>,
}

/// Category together with the active books directly assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryWithBooks {
    pub category: Category,
    pub books: Vec<Book>,
}

#[cfg(test)]
mod tests {
    use super::Category;
    use crate::model::validation::ValidationError;

    #[test]
    fn blank_name_wins_over_self_parent() {
        let mut category = Category::new("  ");
        category.parent_id = Some(category.id);
        assert_eq!(
            category.validate(),
            Err(ValidationError::Blank {
                field: "category name"
            })
        );
    }

    #[test]
    fn self_parent_is_rejected() {
        let mut category = Category::new("Fiction");
        category.parent_id = Some(category.id);
        assert_eq!(
            category.validate(),
            Err(ValidationError::SelfParent(category.id))
        );
    }

    #[test]
    fn name_bounds_are_inclusive() {
        assert!(Category::new("abc").validate().is_ok());
        assert!(Category::new("x".repeat(100)).validate().is_ok());
        assert!(Category::new("ab").validate().is_err());
        assert!(Category::new("x".repeat(101)).validate().is_err());
    }
}
