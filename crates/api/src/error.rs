//! Bridges the lower layers' leaf errors into the `DomainError` the API
//! surface speaks in. `DomainError`, `StorageError` and `SchedulerError`
//! are all defined in other crates, so the conversions live here rather
//! than as inherent `From` impls on either side.

use axum::response::{IntoResponse, Response};
use ssc_backend_domain::DomainError;
use ssc_backend_scheduler::SchedulerError;
use ssc_backend_storage::StorageError;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] DomainError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let domain = match err {
            StorageError::NotFound => DomainError::NotFound("resource not found".to_string()),
            StorageError::Conflict(msg) => DomainError::Conflict(msg),
            StorageError::ForbiddenTransition(msg) => DomainError::ForbiddenTransition(msg),
            StorageError::Validation(msg) => DomainError::Validation(msg),
            StorageError::Connection(e) => DomainError::Database(e.to_string()),
            StorageError::Migration(e) => DomainError::Database(e.to_string()),
            StorageError::Query(e) => DomainError::Database(e.to_string()),
        };
        ApiError(domain)
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        ApiError(DomainError::Validation(err.to_string()))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError(DomainError::from(err))
    }
}
