use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    BookList,
    NewBook,
    UpdateBook,
    PageNotFound,
    Error,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::BookList => "books/index",
            View::NewBook => "books/new-book",
            View::UpdateBook => "books/update-book",
            View::PageNotFound => "page-not-found",
            View::Error => "error",
        }
    }
}

/// Turns a named view and its data into a response body.
///
/// Status code is set by the caller.
pub trait Renderer: Send + Sync {
    fn render(&self, view: View, data: serde_json::Value) -> Response;
}

/// Emits the view name and data as JSON, for API clients and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, view: View, data: serde_json::Value) -> Response {
        Json(json!({
            "view": view.name(),
            "data": data,
        }))
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_renderer() {
        let response = JsonRenderer.render(View::NewBook, json!({"title": "New Book"}));
        assert_eq!(http::StatusCode::OK, response.status());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!("books/new-book", value["view"]);
        assert_eq!("New Book", value["data"]["title"]);
    }
}
