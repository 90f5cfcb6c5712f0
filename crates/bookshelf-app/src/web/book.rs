use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form,
};
use bookshelf_dal::book::{Book, BookDraft, BookRepository};
use http::StatusCode;
use serde_json::json;
use url::form_urlencoded;

use crate::{
    catalog::{self, Rejection, Submission},
    error::{ApiError, ApiResult},
    paging::{parse_page, Listing, PageRequest, SearchQuery},
    render::View,
    repository_from_request,
    state::AppState,
};

repository_from_request!(BookRepository);

const LISTING_URL: &str = "/";

pub async fn index() -> Redirect {
    Redirect::to("/page/1")
}

pub async fn list_page(
    Path(page): Path<String>,
    repository: BookRepository,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    let request = PageRequest::new(parse_page(&page)?, state.config().page_size);
    let listing = catalog::list_books(&repository, request).await?;
    Ok(render_listing(&state, listing, None))
}

/// Keeps the search form target short, results live under `/search/page/{n}`
pub async fn search(Query(query): Query<SearchQuery>) -> ApiResult<Redirect> {
    let query = query.checked()?;
    Ok(match query.term() {
        Some(term) => Redirect::to(&search_url(1, term)),
        None => Redirect::to("/page/1"),
    })
}

pub async fn search_page(
    Path(page): Path<String>,
    Query(query): Query<SearchQuery>,
    repository: BookRepository,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    let query = query.checked()?;
    let page = parse_page(&page)?;
    let Some(term) = query.term() else {
        return Ok(Redirect::to(&format!("/page/{page}")).into_response());
    };
    let request = PageRequest::new(page, state.config().page_size).with_search(Some(term));
    let listing = catalog::list_books(&repository, request).await?;
    Ok(render_listing(&state, listing, Some(term)))
}

pub async fn new_form(State(state): State<AppState>) -> Response {
    render_form(&state, View::NewBook, &BookDraft::default(), &[])
}

pub async fn create(
    repository: BookRepository,
    State(state): State<AppState>,
    form: Result<Form<BookDraft>, FormRejection>,
) -> ApiResult<Response> {
    let Form(draft) = form?;
    let submission = catalog::create_book(&repository, draft).await?;
    Ok(submission_response(&state, View::NewBook, submission))
}

pub async fn update_form(
    Path(id): Path<String>,
    repository: BookRepository,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    let found = match parse_id(&id) {
        Ok(id) => catalog::find_book(&repository, id).await,
        Err(e) => Err(e),
    };
    match found {
        Ok(book) => Ok(render_form(
            &state,
            View::UpdateBook,
            &BookDraft::from(&book),
            &[],
        )),
        Err(ApiError::NotFound(what)) => Ok(super::render_not_found(&state, &what)),
        Err(e) => Err(e),
    }
}

pub async fn update(
    Path(id): Path<String>,
    repository: BookRepository,
    State(state): State<AppState>,
    form: Result<Form<BookDraft>, FormRejection>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let Form(draft) = form?;
    let submission = catalog::update_book(&repository, id, draft).await?;
    Ok(submission_response(&state, View::UpdateBook, submission))
}

pub async fn delete(
    Path(id): Path<String>,
    repository: BookRepository,
) -> ApiResult<Redirect> {
    let id = parse_id(&id)?;
    catalog::delete_book(&repository, id).await?;
    Ok(Redirect::to(LISTING_URL))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(index))
        .route("/page/{page}", get(list_page))
        .route("/search", get(search))
        .route("/search/page/{page}", get(search_page))
        .route("/new", get(new_form).post(create))
        .route("/{id}", get(update_form).post(update))
        .route("/{id}/delete", post(delete))
}

/// Identifiers that cannot exist are reported the same way as missing ones
fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("Book {raw}")))
}

fn search_url(page: u32, term: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("query", term)
        .finish();
    format!("/search/page/{page}?{query}")
}

fn submission_response(state: &AppState, view: View, submission: Submission) -> Response {
    match submission {
        Submission::Saved(_) => Redirect::to(LISTING_URL).into_response(),
        Submission::Rejected(Rejection { draft, errors }) => {
            render_form(state, view, &draft, &errors)
        }
    }
}

fn render_form(
    state: &AppState,
    view: View,
    draft: &BookDraft,
    errors: &[bookshelf_dal::book::FieldError],
) -> Response {
    let title = match view {
        View::UpdateBook => "Update Book",
        _ => "New Book",
    };
    state.render(
        view,
        StatusCode::OK,
        json!({
            "title": title,
            "book": draft,
            "errors": errors,
        }),
    )
}

fn render_listing(state: &AppState, listing: Listing<Book>, query: Option<&str>) -> Response {
    let data = match listing {
        Listing::Page(page) => json!({
            "title": "Books",
            "query": query,
            "no_results": false,
            "books": page.rows,
            "page": page.page,
            "page_size": page.page_size,
            "total_pages": page.total_pages,
            "total": page.total,
        }),
        Listing::NoResults { query } => json!({
            "title": "Books",
            "query": query,
            "no_results": true,
            "books": [],
            "total": 0,
        }),
    };
    state.render(View::BookList, StatusCode::OK, data)
}
