//! Storage layer for the Smart Study Companion backend.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod constraint_repository;
pub mod energy_repository;
pub mod error;
pub mod persistence_protocol;
pub mod reflection_repository;
pub mod session_repository;
pub mod subject_repository;
pub mod task_repository;
pub mod user_repository;

pub use constraint_repository::ConstraintRepository;
pub use energy_repository::EnergyRepository;
pub use error::StorageError;
pub use persistence_protocol::PersistenceProtocol;
pub use reflection_repository::ReflectionRepository;
pub use session_repository::SessionRepository;
pub use subject_repository::SubjectRepository;
pub use task_repository::TaskRepository;
pub use user_repository::UserRepository;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool, StorageError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(StorageError::Connection)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(StorageError::Migration)
}

/// Check database connectivity.
pub async fn check_connection(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(StorageError::Query)?;
    Ok(())
}
