use axum::{
    extract::rejection::FormRejection,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use tracing::{debug, error};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures a request handler can end with.
///
/// Rejected form input is not an error, see [`crate::catalog::Submission`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid form: {0}")]
    InvalidForm(#[from] FormRejection),

    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidForm(rejection) => rejection.status(),
            ApiError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<bookshelf_dal::Error> for ApiError {
    fn from(value: bookshelf_dal::Error) -> Self {
        match value {
            bookshelf_dal::Error::RecordNotFound(what) => ApiError::NotFound(what),
            other => ApiError::Unhandled(other.into()),
        }
    }
}

/// Attached to responses produced from [`ApiError`], so the top level error
/// page can be rendered from it
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub detail: String,
}

impl From<&ApiError> for ErrorReport {
    fn from(error: &ApiError) -> Self {
        ErrorReport {
            status: error.status(),
            message: error.to_string(),
            detail: format!("{error:?}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Unhandled error: {self:?}");
        } else {
            debug!("Request failed: {self}");
        }
        let mut response = status.into_response();
        response.extensions_mut().insert(ErrorReport::from(&self));
        response
    }
}
