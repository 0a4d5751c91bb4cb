//! Leaf errors for the pure scheduling core. These never depend on axum or
//! sqlx; the API layer converts them into `DomainError` at the boundary.

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid recurrence pattern: {0}")]
    InvalidPattern(#[from] ssc_backend_domain::PatternError),
    #[error("{0}")]
    InvalidInput(String),
}
