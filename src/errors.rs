use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

/// Errors the ledger core can produce. Each variant maps to a distinct HTTP
/// status so handlers never have to inspect error internals.
#[derive(Debug, Error)]
pub enum CreditError {
    #[error("amount must be a strictly positive integer")]
    InvalidAmount,

    #[error("insufficient credits")]
    InsufficientCredits,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("storage unavailable: {0}")]
    TransientStorage(String),
}

pub type CreditResult<T> = Result<T, CreditError>;

impl CreditError {
    /// Classify a raw sqlx error into the taxonomy above. The idempotent
    /// insert path handles its own conflicts via `ON CONFLICT DO NOTHING`, so
    /// any unique-violation seen here is a genuine, unexpected conflict.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => CreditError::NotFound("row"),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                CreditError::Conflict(db_err.message().to_string())
            }
            _ => CreditError::TransientStorage(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for CreditError {
    fn from(err: sqlx::Error) -> Self {
        CreditError::from_sqlx(err)
    }
}

impl IntoResponse for CreditError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            CreditError::InvalidAmount => (StatusCode::BAD_REQUEST, self.to_string()),
            CreditError::InsufficientCredits => (StatusCode::PAYMENT_REQUIRED, self.to_string()),
            CreditError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            CreditError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            CreditError::TransientStorage(ref detail) => {
                tracing::error!(error = %detail, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage operation failed".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}
