// SPDX-License-Identifier: GPL-3.0-or-later
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_application::index::IndexError;
use marquee_application::providers::ValidationFailure;
use marquee_application::{
    BackupError, CollectionError, CommandError, LibraryError, LookupError, MetadataSourceError,
    NamingError, ProviderError,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct FailureResponse {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureResponse>,
}

/// Error returned by every handler; renders as `(status, Json<ErrorResponse>)`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    failures: Vec<FailureResponse>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            failures: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }

    fn with_failures(mut self, failures: Vec<ValidationFailure>) -> Self {
        self.failures = failures
            .into_iter()
            .map(|f| FailureResponse {
                field: f.field,
                message: f.message,
            })
            .collect();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(target: "api", status = %self.status, error = %self.message, "request failed");
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                failures: self.failures,
            }),
        )
            .into_response()
    }
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Repository(_) => Self::internal(err),
            _ => Self::bad_request(err.to_string()),
        }
    }
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::NotFound(_) => Self::not_found(err.to_string()),
            LibraryError::Validation(_) => Self::bad_request(err.to_string()),
            LibraryError::Index(inner) => inner.into(),
            LibraryError::Repository(_) => Self::internal(err),
        }
    }
}

impl From<MetadataSourceError> for ApiError {
    fn from(err: MetadataSourceError) -> Self {
        match err {
            MetadataSourceError::NotFound(_) => Self::not_found(err.to_string()),
            _ => Self::new(StatusCode::BAD_GATEWAY, err.to_string()),
        }
    }
}

impl From<NamingError> for ApiError {
    fn from(err: NamingError) -> Self {
        match err {
            NamingError::MovieNotFound(_) | NamingError::StudioNotFound(_) => {
                Self::not_found(err.to_string())
            }
            NamingError::EmptyFormat | NamingError::EmptyName(_) | NamingError::MissingMoviePath(_) => {
                Self::bad_request(err.to_string())
            }
            NamingError::Io(_) | NamingError::Repository(_) => Self::internal(err),
        }
    }
}

impl From<CollectionError> for ApiError {
    fn from(err: CollectionError) -> Self {
        match err {
            CollectionError::NotFound(_) => Self::not_found(err.to_string()),
            CollectionError::Validation(_) => Self::bad_request(err.to_string()),
            CollectionError::Metadata(inner) => inner.into(),
            CollectionError::Naming(inner) => inner.into(),
            CollectionError::Repository(_) => Self::internal(err),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound(_) => Self::not_found(err.to_string()),
            LookupError::Validation(_) => Self::bad_request(err.to_string()),
            LookupError::Metadata(inner) => inner.into(),
            LookupError::Naming(inner) => inner.into(),
            LookupError::Repository(_) => Self::internal(err),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        let failures = err.failures();
        match err {
            ProviderError::NotFound { .. } => Self::not_found(err.to_string()),
            ProviderError::Repository(_) => Self::internal(err),
            // Unknown implementations, duplicate names, failed validation and
            // failed connection tests are all the caller's to fix.
            _ => Self::bad_request(err.to_string()).with_failures(failures),
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotFound(_) => Self::not_found(err.to_string()),
            CommandError::NotCancellable { .. } => Self::new(StatusCode::CONFLICT, err.to_string()),
            CommandError::NoHandler(_) => Self::bad_request(err.to_string()),
        }
    }
}

impl From<BackupError> for ApiError {
    fn from(err: BackupError) -> Self {
        match err {
            BackupError::InvalidName(_) => Self::bad_request(err.to_string()),
            BackupError::NotFound(_) => Self::not_found(err.to_string()),
            BackupError::Io(_) | BackupError::Database(_) => Self::internal(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Parses a path id, answering 400 instead of axum's plain-text rejection.
pub fn parse_id<T, E>(value: &str, parse: impl FnOnce(&str) -> Result<T, E>) -> ApiResult<T> {
    parse(value).map_err(|_| ApiError::bad_request(format!("invalid id: {value}")))
}
