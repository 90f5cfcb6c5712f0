use crate::{Batch, ChosenDB, ListingParams, Order, Pool, error::Result};
use async_trait::async_trait;
use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

pub const TEXT_MAX_LEN: usize = 255;

const VALID_ORDER_FIELDS: &[&str] = &[
    "id",
    "title",
    "author",
    "genre",
    "year",
    "created_at",
    "updated_at",
];

const SELECT_COLUMNS: &str = "id, title, author, genre, year, created_at, updated_at";

/// Terms are lowercased in Rust, SQLite `lower()` only handles ASCII
const SEARCH_FILTER: &str = "WHERE instr(search_text, ?) > 0";

/// Separates fields so a term cannot match across two of them
const SEARCH_FIELD_SEPARATOR: &str = "\u{1f}";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Newest first, insertion order breaks ties within the same instant
pub fn default_order() -> Vec<Order> {
    vec![
        Order::Desc("created_at".to_string()),
        Order::Desc("id".to_string()),
    ]
}

/// Unsaved candidate built from raw form input.
///
/// Values are kept exactly as entered so a rejected draft can be shown back to
/// the user unchanged. `id` is set only when the draft targets an existing record.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Validate)]
#[serde(default)]
pub struct BookDraft {
    #[garde(skip)]
    #[serde(skip_deserializing)]
    pub id: Option<i64>,
    #[garde(custom(text_field("title")))]
    pub title: String,
    #[garde(custom(text_field("author")))]
    pub author: String,
    #[garde(custom(text_field("genre")))]
    pub genre: String,
    #[garde(custom(valid_year))]
    pub year: String,
}

impl BookDraft {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        BookDraft {
            id: None,
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            year: year.into(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Validates the draft and converts it to values ready for storage.
    ///
    /// Failures come one per field, in declaration order.
    pub fn to_fields(&self) -> Result<BookFields, Vec<FieldError>> {
        self.validate()
            .map_err(|report| FieldError::from_report(&report))?;
        let year =
            parse_year(&self.year).map_err(|message| vec![FieldError::new("year", message)])?;
        Ok(BookFields {
            title: self.title.clone(),
            author: self.author.clone(),
            genre: self.genre.clone(),
            year,
        })
    }
}

impl From<&Book> for BookDraft {
    fn from(book: &Book) -> Self {
        BookDraft {
            id: Some(book.id),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            year: book.year.to_string(),
        }
    }
}

/// Validated values of a book, as written to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year: i64,
}

impl BookFields {
    /// Lowercased searchable fields, stored alongside the record
    pub fn search_text(&self) -> String {
        let year = self.year.to_string();
        [
            self.title.as_str(),
            self.author.as_str(),
            self.genre.as_str(),
            year.as_str(),
        ]
        .join(SEARCH_FIELD_SEPARATOR)
        .to_lowercase()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn from_report(report: &garde::Report) -> Vec<FieldError> {
        report
            .iter()
            .map(|(path, error)| FieldError::new(path.to_string(), error.message()))
            .collect()
    }
}

fn text_field(field: &'static str) -> impl FnOnce(&str, &()) -> garde::Result {
    move |value, _| {
        if value.trim().is_empty() {
            Err(garde::Error::new(format!(
                "Please provide a value for \"{field}\""
            )))
        } else if value.chars().count() > TEXT_MAX_LEN {
            Err(garde::Error::new(format!(
                "Value for \"{field}\" must be at most {TEXT_MAX_LEN} characters"
            )))
        } else {
            Ok(())
        }
    }
}

fn valid_year(value: &str, _: &()) -> garde::Result {
    parse_year(value).map(|_| ()).map_err(garde::Error::new)
}

fn parse_year(value: &str) -> std::result::Result<i64, &'static str> {
    let value = value.trim();
    if value.is_empty() {
        return Err("Please provide a value for \"year\"");
    }
    let year: i64 = value
        .parse()
        .map_err(|_| "Please provide a whole number for \"year\"")?;
    if year < 1 {
        Err("Please provide a value greater than \"0\" for \"year\"")
    } else {
        Ok(year)
    }
}

/// Storage operations the request handlers depend on
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn create(&self, fields: &BookFields) -> Result<Book>;
    async fn find(&self, id: i64) -> Result<Option<Book>>;
    async fn list(&self, params: ListingParams) -> Result<Batch<Book>>;
    /// Fails with `RecordNotFound` when there is no record with `id`
    async fn update(&self, id: i64, fields: &BookFields) -> Result<Book>;
    /// Fails with `RecordNotFound` when there is no record with `id`
    async fn delete(&self, id: i64) -> Result<()>;
}

pub type BookRepository = BookRepositoryImpl<Pool>;

pub struct BookRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, fields: &BookFields) -> Result<Book> {
        let now = OffsetDateTime::now_utc();
        let result = sqlx::query(
            "INSERT INTO book (title, author, genre, year, search_text, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fields.title)
        .bind(&fields.author)
        .bind(&fields.genre)
        .bind(fields.year)
        .bind(fields.search_text())
        .bind(now)
        .bind(now)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await
    }

    pub async fn update(&self, id: i64, fields: &BookFields) -> Result<Book> {
        let result = sqlx::query(
            "UPDATE book SET title = ?, author = ?, genre = ?, year = ?, search_text = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&fields.title)
        .bind(&fields.author)
        .bind(&fields.genre)
        .bind(fields.year)
        .bind(fields.search_text())
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(not_found(id))
        } else {
            self.get(id).await
        }
    }

    pub async fn count(&self, search: Option<&str>) -> Result<u64> {
        let sql = format!("SELECT count(*) FROM book {}", filter_clause(search));
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(term) = search {
            query = query.bind(term.to_lowercase());
        }
        let count = query.fetch_one(&self.executor).await?;
        Ok(count.max(0) as u64)
    }

    pub async fn list(&self, params: ListingParams) -> Result<Batch<Book>> {
        let params = if params.order.is_none() {
            params.with_order(default_order())
        } else {
            params
        };
        let order = params.ordering(VALID_ORDER_FIELDS)?;
        let search = params.search.as_deref();
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM book {} ORDER BY {order} LIMIT ? OFFSET ?",
            filter_clause(search)
        );
        debug!(search, offset = params.offset, limit = params.limit, "Listing books");

        let mut query = sqlx::query_as::<_, Book>(&sql);
        if let Some(term) = search {
            query = query.bind(term.to_lowercase());
        }
        let rows = query
            .bind(params.limit)
            .bind(params.offset)
            .fetch(&self.executor)
            .take(crate::MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        let total = self.count(search).await?;

        Ok(Batch {
            offset: params.offset,
            limit: params.limit,
            rows,
            total,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(not_found(id))
        } else {
            Ok(())
        }
    }

    pub async fn find(&self, id: i64) -> Result<Option<Book>> {
        let record = sqlx::query_as::<_, Book>(&format!(
            "SELECT {SELECT_COLUMNS} FROM book WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.executor)
        .await?;
        Ok(record)
    }

    pub async fn get(&self, id: i64) -> Result<Book> {
        self.find(id).await?.ok_or_else(|| not_found(id))
    }
}

#[async_trait]
impl BookStore for BookRepository {
    async fn create(&self, fields: &BookFields) -> Result<Book> {
        BookRepositoryImpl::create(self, fields).await
    }

    async fn find(&self, id: i64) -> Result<Option<Book>> {
        BookRepositoryImpl::find(self, id).await
    }

    async fn list(&self, params: ListingParams) -> Result<Batch<Book>> {
        BookRepositoryImpl::list(self, params).await
    }

    async fn update(&self, id: i64, fields: &BookFields) -> Result<Book> {
        BookRepositoryImpl::update(self, id, fields).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        BookRepositoryImpl::delete(self, id).await
    }
}

fn filter_clause(search: Option<&str>) -> &'static str {
    if search.is_some() { SEARCH_FILTER } else { "" }
}

fn not_found(id: i64) -> crate::Error {
    crate::Error::RecordNotFound(format!("Book {id}"))
}
