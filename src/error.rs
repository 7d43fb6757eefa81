use arrow::error::ArrowError;

#[derive(Debug, thiserror::Error)]
pub enum TablesmithError {
    /// Source or request rejected before any store mutation
    #[error("{0}")]
    Validation(String),
    /// Store failure while creating, dropping or loading a table
    #[error("Failed to materialize table {table}: {message}")]
    Materialization { table: String, message: String },
    #[error("Table {0} does not exist")]
    NotFound(String),
    #[error("Completion request failed: {0}")]
    Completion(String),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TablesmithError {
    pub(crate) fn materialization(table: &str, cause: impl std::fmt::Display) -> Self {
        TablesmithError::Materialization {
            table: table.to_string(),
            message: cause.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, TablesmithError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TablesmithError::NotFound(_))
    }
}
