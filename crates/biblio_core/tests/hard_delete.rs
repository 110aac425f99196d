use biblio_core::{
    AuditOperation, AuditTable, AuditTrail, Author, AuthorRepository, Book, BookRepository,
    Catalog, Category, CategoryRepository, ErrorKind, RepoError,
};
use uuid::Uuid;

fn catalog() -> Catalog {
    Catalog::open_in_memory().unwrap()
}

fn row_count(catalog: &Catalog, sql: &str) -> i64 {
    catalog
        .store()
        .read(|conn| conn.query_row(sql, [], |row| row.get::<_, i64>(0)))
        .unwrap()
}

fn history(catalog: &Catalog, table: AuditTable, id: Uuid) -> Vec<biblio_core::AuditLogEntry> {
    catalog
        .audit()
        .history(table, &id.to_string())
        .unwrap()
        .snapshot()
        .unwrap()
}

fn seed_book(catalog: &Catalog, title: &str) -> (Book, Author) {
    let author = Author::new("Mary Shelley");
    catalog.authors().create(&author).unwrap();
    let book = Book::new(title, "01/01/1818", format!("GOTH-{title}"));
    catalog.books().create(&book, &[author.id]).unwrap();
    (book, author)
}

#[test]
fn purging_a_deleted_book_drops_its_author_links() {
    let catalog = catalog();
    let (book, author) = seed_book(&catalog, "Frankenstein");
    catalog.books().delete(book.id).unwrap();
    assert_eq!(row_count(&catalog, "SELECT COUNT(*) FROM book_authors;"), 1);

    catalog.books().hard_delete(book.id).unwrap();

    assert_eq!(row_count(&catalog, "SELECT COUNT(*) FROM books;"), 0);
    assert_eq!(row_count(&catalog, "SELECT COUNT(*) FROM book_authors;"), 0);
    assert_eq!(row_count(&catalog, "SELECT COUNT(*) FROM authors;"), 1);
    assert!(catalog
        .authors()
        .get_by_id(author.id)
        .unwrap()
        .snapshot()
        .unwrap()
        .is_some());

    let entries = history(&catalog, AuditTable::Books, book.id);
    let operations: Vec<_> = entries.iter().map(|entry| entry.operation).collect();
    assert_eq!(
        operations,
        vec![
            AuditOperation::Delete,
            AuditOperation::Delete,
            AuditOperation::Insert
        ]
    );
    let purged: Book = serde_json::from_str(entries[0].data_before.as_deref().unwrap()).unwrap();
    assert!(purged.is_deleted);
    assert!(entries[0].data_after.is_none());
}

#[test]
fn active_rows_cannot_be_purged() {
    let catalog = catalog();
    let (book, author) = seed_book(&catalog, "Mathilda");
    let shelf = Category::new("Gothic");
    catalog.categories().create(&shelf).unwrap();
    let audit_before = catalog.audit().recent(100).unwrap().snapshot().unwrap().len();

    let err = catalog.books().hard_delete(book.id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::StillActive { table: AuditTable::Books, id } if id == book.id
    ));
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert!(matches!(
        catalog.authors().hard_delete(author.id),
        Err(RepoError::StillActive { table: AuditTable::Authors, .. })
    ));
    assert!(matches!(
        catalog.categories().hard_delete(shelf.id),
        Err(RepoError::StillActive { table: AuditTable::Categories, .. })
    ));

    assert_eq!(
        catalog.audit().recent(100).unwrap().snapshot().unwrap().len(),
        audit_before
    );
    assert_eq!(row_count(&catalog, "SELECT COUNT(*) FROM books;"), 1);
}

#[test]
fn missing_rows_are_not_found() {
    let catalog = catalog();
    let ghost = Uuid::new_v4();
    assert!(matches!(
        catalog.books().hard_delete(ghost),
        Err(RepoError::BookNotFound(id)) if id == ghost
    ));
    assert!(matches!(
        catalog.authors().hard_delete(ghost),
        Err(RepoError::AuthorNotFound(id)) if id == ghost
    ));
    assert!(matches!(
        catalog.categories().hard_delete(ghost),
        Err(RepoError::CategoryNotFound(id)) if id == ghost
    ));
}

#[test]
fn purging_an_author_unlinks_it_from_surviving_books() {
    let catalog = catalog();
    let (book, author) = seed_book(&catalog, "The Last Man");
    let coauthor = Author::new("Percy Shelley");
    catalog.authors().create(&coauthor).unwrap();
    let second = Book::new("History of a Six Weeks' Tour", "01/01/1817", "TRV-1");
    catalog
        .books()
        .create(&second, &[author.id, coauthor.id])
        .unwrap();

    catalog.authors().delete(coauthor.id).unwrap();
    catalog.authors().hard_delete(coauthor.id).unwrap();

    assert_eq!(row_count(&catalog, "SELECT COUNT(*) FROM authors;"), 1);
    assert_eq!(row_count(&catalog, "SELECT COUNT(*) FROM book_authors;"), 2);
    let loaded = catalog
        .books()
        .get_by_id(second.id)
        .unwrap()
        .snapshot()
        .unwrap()
        .unwrap();
    assert_eq!(loaded.authors.len(), 1);
    assert_eq!(loaded.authors[0].id, author.id);
    assert!(catalog.books().get_by_id(book.id).unwrap().snapshot().unwrap().is_some());

    let operations: Vec<_> = history(&catalog, AuditTable::Authors, coauthor.id)
        .iter()
        .map(|entry| entry.operation)
        .collect();
    assert_eq!(
        operations,
        vec![
            AuditOperation::Delete,
            AuditOperation::Delete,
            AuditOperation::Insert
        ]
    );
}

#[test]
fn referenced_category_is_kept_until_its_tombstones_go() {
    let catalog = catalog();
    let (book, _) = seed_book(&catalog, "Valperga");
    let shelf = Category::new("Historical");
    let nested = Category::new("Medieval").with_parent(shelf.id);
    catalog.categories().create(&shelf).unwrap();
    catalog.categories().create(&nested).unwrap();
    let mut shelved = book.clone();
    shelved.category_id = Some(shelf.id);
    catalog.books().update(&shelved).unwrap();

    // Soft-delete the child first so it keeps pointing at the shelf.
    catalog.categories().delete(nested.id, true).unwrap();
    catalog.categories().delete(shelf.id, false).unwrap();

    let err = catalog.categories().hard_delete(shelf.id).unwrap_err();
    assert!(matches!(err, RepoError::CategoryInUse(id) if id == shelf.id));
    assert_eq!(err.kind(), ErrorKind::BusinessRule);

    catalog.categories().hard_delete(nested.id).unwrap();
    assert!(matches!(
        catalog.categories().hard_delete(shelf.id),
        Err(RepoError::CategoryInUse(_))
    ));

    catalog.books().hard_delete(book.id).unwrap();
    catalog.categories().hard_delete(shelf.id).unwrap();
    assert_eq!(row_count(&catalog, "SELECT COUNT(*) FROM categories;"), 0);

    let entries = history(&catalog, AuditTable::Categories, shelf.id);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].operation, AuditOperation::Delete);
    let purged: Category =
        serde_json::from_str(entries[0].data_before.as_deref().unwrap()).unwrap();
    assert!(purged.is_deleted);
    assert!(matches!(
        catalog.categories().hard_delete(shelf.id),
        Err(RepoError::CategoryNotFound(_))
    ));
}
