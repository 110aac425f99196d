//! Shared SQL projections and row parsers for catalog tables.
//!
//! # Invariants
//! - Parsers reject invalid persisted state instead of masking it.
//! - Loaders with `include_deleted = false` only return active rows.

use crate::model::author::{Author, AuthorId};
use crate::model::book::{Book, BookAuthor, BookId, BorrowStatus};
use crate::model::category::{Category, CategoryId};
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, Row};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub(crate) const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    parent_id,
    is_deleted,
    deleted_at
FROM categories";

pub(crate) const BOOK_SELECT_SQL: &str = "SELECT
    id,
    title,
    entry_date,
    category_id,
    borrow_status,
    code,
    is_deleted,
    deleted_at
FROM books";

pub(crate) const AUTHOR_SELECT_SQL: &str = "SELECT
    id,
    name,
    biography,
    is_deleted,
    deleted_at
FROM authors";

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

pub(crate) fn load_category(
    conn: &Connection,
    id: CategoryId,
    include_deleted: bool,
) -> RepoResult<Option<Category>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{CATEGORY_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR is_deleted = 0);"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_category_row(row)?));
    }
    Ok(None)
}

pub(crate) fn query_categories(
    conn: &Connection,
    filter_sql: &str,
    params: &[&dyn ToSql],
) -> RepoResult<Vec<Category>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{CATEGORY_SELECT_SQL}
         WHERE is_deleted = 0 {filter_sql}
         ORDER BY name ASC, id ASC;"
    ))?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_category_row(row)?);
    }
    Ok(items)
}

pub(crate) fn load_book(
    conn: &Connection,
    id: BookId,
    include_deleted: bool,
) -> RepoResult<Option<Book>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{BOOK_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR is_deleted = 0);"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_book_row(row)?));
    }
    Ok(None)
}

pub(crate) fn query_books(
    conn: &Connection,
    filter_sql: &str,
    params: &[&dyn ToSql],
) -> RepoResult<Vec<Book>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{BOOK_SELECT_SQL}
         WHERE is_deleted = 0 {filter_sql}
         ORDER BY title ASC, id ASC;"
    ))?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_book_row(row)?);
    }
    Ok(items)
}

pub(crate) fn load_author(
    conn: &Connection,
    id: AuthorId,
    include_deleted: bool,
) -> RepoResult<Option<Author>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{AUTHOR_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR is_deleted = 0);"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_author_row(row)?));
    }
    Ok(None)
}

pub(crate) fn list_active_authors(conn: &Connection) -> RepoResult<Vec<Author>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{AUTHOR_SELECT_SQL}
         WHERE is_deleted = 0
         ORDER BY name ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_author_row(row)?);
    }
    Ok(items)
}

/// Active authors linked to one book, ordered by name.
pub(crate) fn list_book_authors(conn: &Connection, book_id: BookId) -> RepoResult<Vec<Author>> {
    let mut stmt = conn.prepare_cached(
        "SELECT
            a.id AS id,
            a.name AS name,
            a.biography AS biography,
            a.is_deleted AS is_deleted,
            a.deleted_at AS deleted_at
         FROM authors a
         INNER JOIN book_authors ba ON ba.author_id = a.id
         WHERE ba.book_id = ?1
           AND a.is_deleted = 0
         ORDER BY a.name ASC, a.id ASC;",
    )?;
    let mut rows = stmt.query([book_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_author_row(row)?);
    }
    Ok(items)
}

pub(crate) fn insert_book_author(conn: &Connection, link: BookAuthor) -> RepoResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO book_authors (book_id, author_id) VALUES (?1, ?2);",
        params![link.book_id.to_string(), link.author_id.to_string()],
    )?;
    Ok(())
}

pub(crate) fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let id_text: String = row.get("id")?;
    let parent_id = row
        .get::<_, Option<String>>("parent_id")?
        .map(|value| parse_uuid(&value, "categories.parent_id"))
        .transpose()?;
    Ok(Category {
        id: parse_uuid(&id_text, "categories.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        parent_id,
        is_deleted: parse_flag(row.get("is_deleted")?, "categories.is_deleted")?,
        deleted_at: row.get("deleted_at")?,
    })
}

pub(crate) fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    let id_text: String = row.get("id")?;
    let category_id = row
        .get::<_, Option<String>>("category_id")?
        .map(|value| parse_uuid(&value, "books.category_id"))
        .transpose()?;
    let status_text: String = row.get("borrow_status")?;
    let borrow_status = BorrowStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid borrow status `{status_text}` in books.borrow_status"
        ))
    })?;
    Ok(Book {
        id: parse_uuid(&id_text, "books.id")?,
        title: row.get("title")?,
        entry_date: row.get("entry_date")?,
        category_id,
        borrow_status,
        code: row.get("code")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "books.is_deleted")?,
        deleted_at: row.get("deleted_at")?,
    })
}

pub(crate) fn parse_author_row(row: &Row<'_>) -> RepoResult<Author> {
    let id_text: String = row.get("id")?;
    Ok(Author {
        id: parse_uuid(&id_text, "authors.id")?,
        name: row.get("name")?,
        biography: row.get("biography")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "authors.is_deleted")?,
        deleted_at: row.get("deleted_at")?,
    })
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_flag(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}
