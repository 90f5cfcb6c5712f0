pub mod book;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use http::{StatusCode, Uri};
use serde_json::json;

use crate::{error::ErrorReport, render::View, state::AppState};

/// Book catalog pages, with not found and error pages rendered through the
/// configured renderer
pub fn catalog_router(state: AppState) -> Router<()> {
    Router::new()
        .merge(book::router())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), error_page))
        .with_state(state)
}

/// Renders the generic error page for failed requests.
///
/// Not found responses pass as they are, handlers that want a not found page
/// render it themselves.
pub async fn error_page(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() == StatusCode::NOT_FOUND {
        return response;
    }
    match response.extensions().get::<ErrorReport>() {
        Some(report) => render_error(&state, report),
        None => response,
    }
}

pub fn render_error(state: &AppState, report: &ErrorReport) -> Response {
    let data = if state.config().production {
        let message = if report.status.is_server_error() {
            "Internal server error".to_string()
        } else {
            report.message.clone()
        };
        json!({
            "title": "Server Error",
            "status": report.status.as_u16(),
            "message": message,
        })
    } else {
        json!({
            "title": "Server Error",
            "status": report.status.as_u16(),
            "message": report.message,
            "detail": report.detail,
        })
    };
    state.render(View::Error, report.status, data)
}

pub fn render_not_found(state: &AppState, what: &str) -> Response {
    state.render(
        View::PageNotFound,
        StatusCode::NOT_FOUND,
        json!({
            "title": "Page Not Found",
            "message": format!("Sorry! We couldn't find {what}"),
        }),
    )
}

async fn not_found(State(state): State<AppState>, uri: Uri) -> Response {
    render_not_found(&state, uri.path())
}
