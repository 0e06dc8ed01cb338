use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Request,
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::db;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not_initialized")]
    NotInitialized,

    #[error("not_found")]
    NotFound(String),

    #[error("validation")]
    Validation(String),

    // storage io
    #[error(transparent)]
    DB(db::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("invalid configuration: {0}")]
    Config(#[from] envy::Error),

    #[error("unexpected")]
    Unexpected(String),
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Underlying read/write or encoding failure rather than a caller mistake.
    pub fn is_storage_io(&self) -> bool {
        matches!(self, Self::DB(_) | Self::Io(_) | Self::Image(_))
    }

    /// Human-readable detail, suitable for per-row reports.
    pub fn message(&self) -> String {
        match self {
            Self::NotInitialized => "Store is not initialized".into(),
            Self::NotFound(message) | Self::Validation(message) | Self::Unexpected(message) => message.clone(),
            error => error.to_string(),
        }
    }
}

impl From<db::Error> for Error {
    fn from(error: db::Error) -> Self {
        match error {
            db::Error::NotFound(msg) => Self::NotFound(msg),
            error => Self::DB(error),
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// crate::Error <--> tokio_rusqlite::Error
/// ```rust,ignore
/// impl From<tokio_rusqlite::Error> for Error { }
/// impl From<Error> for tokio_rusqlite::Error { }
/// ```
pub mod db_mappers {
    use super::*;
    use crate::db::rusqlite;
    use crate::db::tokio_rusqlite;

    impl From<tokio_rusqlite::Error> for Error {
        fn from(error: tokio_rusqlite::Error) -> Self {
            match error {
                tokio_rusqlite::Error::Other(err) => match err.downcast::<Error>() {
                    Ok(err) => *err,
                    Err(err) => Error::DB(tokio_rusqlite::Error::Other(err).into()),
                },
                tokio_rusqlite::Error::ConnectionClosed => Error::NotInitialized,
                error => Error::from(db::Error::from(error)),
            }
        }
    }

    impl From<rusqlite::Error> for Error {
        fn from(error: rusqlite::Error) -> Self {
            Error::from(db::Error::from(error))
        }
    }

    impl From<Error> for tokio_rusqlite::Error {
        fn from(error: Error) -> Self {
            tokio_rusqlite::Error::Other(error.into())
        }
    }
}

// Response

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ErrorResponse {
    NotFound { message: String },
    Validation { message: String },
    NotInitialized { message: String },
    Unexpected { message: String },
}

impl ErrorResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotInitialized { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        match error {
            Error::NotFound(message) => Self::NotFound {
                message: message.clone(),
            },
            Error::Validation(message) => Self::Validation {
                message: message.clone(),
            },
            Error::NotInitialized => Self::NotInitialized {
                message: error.message(),
            },
            _ => Self::Unexpected {
                message: "Unexpected error".into(),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let error = Arc::new(self);

        let error_res = ErrorResponse::from(error.as_ref());
        let status = error_res.status();

        let mut res = axum::Json(error_res).into_response();
        res.extensions_mut().insert(error);

        *res.status_mut() = status;
        res
    }
}

pub async fn on_error(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let error = response.extensions().get::<Arc<Error>>().map(Arc::as_ref);
    if let Some(error) = error {
        match error {
            Error::NotFound(_) | Error::Validation(_) => tracing::debug!("{:?}", error),
            error => tracing::error!("{:?}", error),
        }
    }

    response
}
