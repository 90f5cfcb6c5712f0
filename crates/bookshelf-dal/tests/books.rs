use bookshelf_dal::{
    ListingParams, Order,
    book::{BookDraft, BookFields, BookRepositoryImpl, BookStore as _},
};
use futures::TryStreamExt as _;
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO book (id, title, author, genre, year, created_at, updated_at)
VALUES (1, 'Pride and Prejudice', 'Jane Austen', 'Romance', 1813, '2024-01-01T10:00:00Z', '2024-01-01T10:00:00Z');
INSERT INTO book (id, title, author, genre, year, created_at, updated_at)
VALUES (2, 'Dune', 'Frank Herbert', 'Science Fiction', 1965, '2024-01-02T10:00:00Z', '2024-01-02T10:00:00Z');
INSERT INTO book (id, title, author, genre, year, created_at, updated_at)
VALUES (3, 'The Hobbit', 'J. R. R. Tolkien', 'Fantasy', 1937, '2024-01-03T10:00:00Z', '2024-01-03T10:00:00Z');
INSERT INTO book (id, title, author, genre, year, created_at, updated_at)
VALUES (4, 'Emma', 'Jane Austen', 'Romance', 1815, '2024-01-04T10:00:00Z', '2024-01-04T10:00:00Z');
UPDATE book SET search_text = lower(title || char(31) || author || char(31) || genre || char(31) || year);
"#;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    bookshelf_dal::migrate(&conn).await.unwrap();

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}

fn fields(title: &str, year: i64) -> BookFields {
    BookDraft::new(title, "Some Author", "Some Genre", year.to_string())
        .to_fields()
        .unwrap()
}

#[tokio::test]
async fn test_list_newest_first() {
    let repo = BookRepositoryImpl::new(init_db().await);

    let all = repo.list(ListingParams::default()).await.unwrap();
    assert_eq!(4, all.total);
    let ids: Vec<_> = all.rows.iter().map(|b| b.id).collect();
    assert_eq!(vec![4, 3, 2, 1], ids);
}

#[tokio::test]
async fn test_list_slices() {
    let repo = BookRepositoryImpl::new(init_db().await);

    let page = repo.list(ListingParams::new(1, 2)).await.unwrap();
    assert_eq!(4, page.total);
    assert_eq!(1, page.offset);
    let titles: Vec<_> = page.rows.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(vec!["The Hobbit", "Dune"], titles);

    let beyond = repo.list(ListingParams::new(8, 2)).await.unwrap();
    assert!(beyond.rows.is_empty());
    assert_eq!(4, beyond.total);
}

#[tokio::test]
async fn test_search_any_field_case_insensitive() {
    let repo = BookRepositoryImpl::new(init_db().await);

    let by_author = repo
        .list(ListingParams::default().with_search("AUSTEN"))
        .await
        .unwrap();
    assert_eq!(2, by_author.total);
    assert_eq!("Emma", by_author.rows[0].title);

    let by_genre = repo
        .list(ListingParams::default().with_search("fiction"))
        .await
        .unwrap();
    assert_eq!(1, by_genre.total);
    assert_eq!("Dune", by_genre.rows[0].title);

    let by_year = repo
        .list(ListingParams::default().with_search("181"))
        .await
        .unwrap();
    assert_eq!(2, by_year.total);

    let by_title = repo
        .list(ListingParams::default().with_search("hobb"))
        .await
        .unwrap();
    assert_eq!(3, by_title.rows[0].id);
}

#[tokio::test]
async fn test_search_non_ascii_case_insensitive() {
    let repo = BookRepositoryImpl::new(init_db().await);
    let emile = repo.create(&fields("Émile", 1762)).await.unwrap();

    for term in ["émile", "ÉMILE", "Émi"] {
        let found = repo
            .list(ListingParams::default().with_search(term))
            .await
            .unwrap();
        assert_eq!(1, found.total, "term {term}");
        assert_eq!(emile.id, found.rows[0].id);
    }

    let renamed = repo
        .update(emile.id, &fields("Ökonomie", 1762))
        .await
        .unwrap();
    let found = repo
        .list(ListingParams::default().with_search("ökonomie"))
        .await
        .unwrap();
    assert_eq!(vec![renamed.id], found.rows.iter().map(|b| b.id).collect::<Vec<_>>());
    let stale = repo
        .list(ListingParams::default().with_search("émile"))
        .await
        .unwrap();
    assert_eq!(0, stale.total);
}

#[tokio::test]
async fn test_search_does_not_span_fields() {
    let repo = BookRepositoryImpl::new(init_db().await);
    // "Emma" title followed by "Jane Austen" author
    let found = repo
        .list(ListingParams::default().with_search("emmajane"))
        .await
        .unwrap();
    assert_eq!(0, found.total);
}

#[tokio::test]
async fn test_search_is_literal() {
    let repo = BookRepositoryImpl::new(init_db().await);

    let none = repo
        .list(ListingParams::default().with_search("%"))
        .await
        .unwrap();
    assert_eq!(0, none.total);
    assert!(none.rows.is_empty());
}

#[tokio::test]
async fn test_invalid_order() {
    let repo = BookRepositoryImpl::new(init_db().await);
    let params =
        ListingParams::default().with_order(vec![Order::Asc("title; DROP TABLE book".into())]);
    let err = repo.list(params).await.unwrap_err();
    assert!(matches!(err, bookshelf_dal::Error::InvalidOrderByField(_)));
}

#[tokio::test]
async fn test_create_update_delete() {
    let repo = BookRepositoryImpl::new(init_db().await);

    let created = repo.create(&fields("Middlemarch", 1871)).await.unwrap();
    assert_eq!(5, created.id);
    assert_eq!(1871, created.year);
    assert_eq!(created.created_at, created.updated_at);

    let newest = repo.list(ListingParams::new(0, 1)).await.unwrap();
    assert_eq!(created.id, newest.rows[0].id);

    let updated = repo
        .update(created.id, &fields("Middlemarch: A Study", 1872))
        .await
        .unwrap();
    assert_eq!(created.id, updated.id);
    assert_eq!("Middlemarch: A Study", updated.title);
    assert_eq!(created.created_at, updated.created_at);
    assert!(updated.updated_at >= created.updated_at);

    repo.delete(created.id).await.unwrap();
    assert!(repo.find(created.id).await.unwrap().is_none());
    let err = repo.delete(created.id).await.unwrap_err();
    assert!(err.is_not_found());

    // ids are not reused
    let next = repo.create(&fields("Persuasion", 1817)).await.unwrap();
    assert_eq!(6, next.id);
}

#[tokio::test]
async fn test_update_missing() {
    let repo = BookRepositoryImpl::new(init_db().await);
    let err = repo.update(42, &fields("Nothing", 2000)).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(4, repo.count(None).await.unwrap());
}

#[tokio::test]
async fn test_trait_object() {
    let repo: Box<dyn bookshelf_dal::book::BookStore> =
        Box::new(BookRepositoryImpl::new(init_db().await));
    let book = repo.find(2).await.unwrap().unwrap();
    assert_eq!("Frank Herbert", book.author);
    assert!(repo.find(99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_check_constraints() {
    let conn = init_db().await;
    let res = sqlx::query(
        "INSERT INTO book (title, author, genre, year, created_at, updated_at) VALUES ('T', 'A', 'G', 0, datetime(), datetime())",
    )
    .execute(&conn)
    .await;
    assert!(res.is_err());
}
