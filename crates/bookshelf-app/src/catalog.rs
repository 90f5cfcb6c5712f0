//! Request handling logic for the book catalog, independent of HTTP.
//!
//! Every operation takes the storage explicitly. Rejected input comes back as a
//! regular value ([`Submission::Rejected`]); missing records and storage
//! failures come back as [`ApiError`] variants.

use bookshelf_dal::book::{Book, BookDraft, BookStore, FieldError};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    paging::{Listing, Page, PageRequest},
};

#[derive(Debug)]
pub enum Submission {
    /// Stored, client should go back to the listing
    Saved(Book),
    /// Nothing stored, form should be shown again
    Rejected(Rejection),
}

#[derive(Debug, Serialize)]
pub struct Rejection {
    pub draft: BookDraft,
    pub errors: Vec<FieldError>,
}

pub async fn list_books<S>(store: &S, request: PageRequest) -> ApiResult<Listing<Book>>
where
    S: BookStore + ?Sized,
{
    let batch = store.list(request.listing_params()).await?;
    debug!(
        page = request.page(),
        total = batch.total,
        rows = batch.rows.len(),
        "Listed books"
    );
    if let Some(query) = request.search() {
        if batch.total == 0 {
            return Ok(Listing::NoResults {
                query: query.to_string(),
            });
        }
    }
    Ok(Listing::Page(Page::new(&request, batch)))
}

pub async fn find_book<S>(store: &S, id: i64) -> ApiResult<Book>
where
    S: BookStore + ?Sized,
{
    store
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {id}")))
}

pub async fn create_book<S>(store: &S, draft: BookDraft) -> ApiResult<Submission>
where
    S: BookStore + ?Sized,
{
    let fields = match draft.to_fields() {
        Ok(fields) => fields,
        Err(errors) => return Ok(reject(draft, errors)),
    };
    let book = store.create(&fields).await?;
    info!(id = book.id, title = %book.title, "Created book");
    Ok(Submission::Saved(book))
}

pub async fn update_book<S>(store: &S, id: i64, draft: BookDraft) -> ApiResult<Submission>
where
    S: BookStore + ?Sized,
{
    let existing = find_book(store, id).await?;
    let draft = draft.with_id(existing.id);
    let fields = match draft.to_fields() {
        Ok(fields) => fields,
        Err(errors) => return Ok(reject(draft, errors)),
    };
    let book = store.update(existing.id, &fields).await?;
    info!(id = book.id, title = %book.title, "Updated book");
    Ok(Submission::Saved(book))
}

pub async fn delete_book<S>(store: &S, id: i64) -> ApiResult<()>
where
    S: BookStore + ?Sized,
{
    let existing = find_book(store, id).await?;
    store.delete(existing.id).await?;
    info!(id, "Deleted book");
    Ok(())
}

fn reject(draft: BookDraft, errors: Vec<FieldError>) -> Submission {
    debug!(?errors, "Book input rejected");
    Submission::Rejected(Rejection { draft, errors })
}
