use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
