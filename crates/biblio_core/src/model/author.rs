//! Author domain model.

use crate::model::validation::{check_max_text, check_required_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable author identifier.
pub type AuthorId = Uuid;

const NAME_MIN_CHARS: usize = 3;
const NAME_MAX_CHARS: usize = 100;
const BIOGRAPHY_MAX_CHARS: usize = 500;

/// Book author record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    pub biography: String,
    pub is_deleted: bool,
    pub deleted_at: Option<i64>,
}

impl Author {
    /// Creates an author with a generated id and empty biography.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            biography: String::new(),
            is_deleted: false,
            deleted_at: None,
        }
    }

    pub fn with_biography(mut self, biography: impl Into<String>) -> Self {
        self.biography = biography.into();
        self
    }

    /// Validates name bounds, then biography length.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_required_text("author name", &self.name, NAME_MIN_CHARS, NAME_MAX_CHARS)?;
        check_max_text("biography", &self.biography, BIOGRAPHY_MAX_CHARS)
    }
}

#[cfg(test)]
mod tests {
    use super::Author;
    use crate::model::validation::ValidationError;

    #[test]
    fn biography_limit_applies_after_name_rules() {
        let author = Author::new("Jo").with_biography("x".repeat(600));
        assert_eq!(
            author.validate(),
            Err(ValidationError::TooShort {
                field: "author name",
                min: 3
            })
        );

        let author = Author::new("Ursula").with_biography("x".repeat(501));
        assert_eq!(
            author.validate(),
            Err(ValidationError::TooLong {
                field: "biography",
                max: 500
            })
        );
        assert!(Author::new("Ursula")
            .with_biography("x".repeat(500))
            .validate()
            .is_ok());
    }
}
