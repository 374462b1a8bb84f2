use thiserror::Error;

/// Errors raised by the storage layer, classified by Postgres SQLSTATE so callers can react to
/// constraint outcomes without inspecting driver errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Row not found")]
    NotFound,

    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String, table: Option<String> },

    #[error("Check constraint violated: {constraint}")]
    CheckViolation { constraint: String, table: Option<String> },

    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String, table: Option<String> },

    /// Serialization failure or deadlock; the whole unit of work may be retried.
    #[error("Concurrent update conflict")]
    Conflict,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or_default().to_string();
                let table = db_err.table().map(str::to_string);
                let code = db_err.code().map(|c| c.into_owned());
                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) => DbError::UniqueViolation { constraint, table },
                    Some(CHECK_VIOLATION) => DbError::CheckViolation { constraint, table },
                    Some(FOREIGN_KEY_VIOLATION) => DbError::ForeignKeyViolation { constraint, table },
                    Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => DbError::Conflict,
                    _ => DbError::Other(anyhow::Error::new(sqlx::Error::Database(db_err))),
                }
            }
            other => DbError::Other(anyhow::Error::new(other)),
        }
    }
}
