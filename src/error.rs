use std::path::PathBuf;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed front-matter in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BlogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type BlogResult<T> = Result<T, BlogError>;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const CONTENT: &str = "content_error";
    pub const IO: &str = "io_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: &'static str,
    pub message: String,
}

/// JSON error response returned by the `/api` routes.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<BlogError> for ApiError {
    fn from(err: BlogError) -> Self {
        match err {
            BlogError::NotFound(what) => {
                Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, format!("{what} not found"))
            }
            BlogError::Validation(message) => {
                Self::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, message)
            }
            // Parse errors here come from files on disk, never from the request body.
            err @ BlogError::Parse { .. } => {
                error!("{}", err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::CONTENT,
                    "Post content could not be parsed",
                )
            }
            err @ BlogError::Io { .. } => {
                error!("{}", err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::IO,
                    "I/O failure during request",
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
