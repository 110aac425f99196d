//! Catalog domain model.
//!
//! # Responsibility
//! - Define the canonical records for categories, books, authors and audit
//!   entries.
//! - Own field-level validation rules shared by every write path.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID assigned at construction.
//! - Deletion is represented by soft-delete tombstones (`is_deleted` plus
//!   `deleted_at`), never by physical removal from business code.

pub mod audit;
pub mod author;
pub mod book;
pub mod category;
pub mod validation;
