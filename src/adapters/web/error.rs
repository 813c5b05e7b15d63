//! HTTP error responses for the web adapter.

use askama::Template;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::domain::error::QuantfolioError;

/// JSON API error: `{"success": false, "error": "<message>"}`.
#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &QuantfolioError) -> StatusCode {
    match err {
        QuantfolioError::Validation { .. } => StatusCode::BAD_REQUEST,
        QuantfolioError::NotFound { .. } => StatusCode::NOT_FOUND,
        QuantfolioError::NoData { .. } | QuantfolioError::InsufficientData { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        QuantfolioError::ConfigParse { .. }
        | QuantfolioError::ConfigMissing { .. }
        | QuantfolioError::ConfigInvalid { .. }
        | QuantfolioError::Database { .. }
        | QuantfolioError::DatabaseQuery { .. }
        | QuantfolioError::Broker { .. }
        | QuantfolioError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<QuantfolioError> for WebError {
    fn from(err: QuantfolioError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

/// Error shown on the rendered pages.
#[derive(Debug)]
pub struct PageError(pub WebError);

impl From<QuantfolioError> for PageError {
    fn from(err: QuantfolioError) -> Self {
        PageError(err.into())
    }
}

impl From<WebError> for PageError {
    fn from(err: WebError) -> Self {
        PageError(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let WebError { status, message } = self.0;
        let template = super::templates::ErrorTemplate {
            message: &message,
            status: status.as_u16(),
        };
        match template.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, message).into_response(),
        }
    }
}
