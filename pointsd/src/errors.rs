use crate::{db::errors::DbError, ledger::LedgerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Body of every unsuccessful response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Stable machine-readable code, e.g. `CodeAlreadyUsed`
    pub error_code: String,
    pub message: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Ledger(err) => match err {
                LedgerError::CodeNotFound => StatusCode::NOT_FOUND,
                LedgerError::CodeExpired => StatusCode::GONE,
                LedgerError::CodeAlreadyUsed | LedgerError::AlreadyClaimed | LedgerError::StorageConflict => StatusCode::CONFLICT,
                LedgerError::SelfReferralNotAllowed | LedgerError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                LedgerError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
                LedgerError::ProviderFailure(_) | LedgerError::RefundFailed { .. } => StatusCode::BAD_GATEWAY,
                LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Database(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Ledger(err) => err.error_code(),
            Error::NotFound { .. } => "NotFound",
            Error::BadRequest { .. } => "BadRequest",
            Error::Database(_) | Error::Internal(_) => "InternalError",
        }
    }

    /// What the client is told. Internal failures are described only in the logs; charge outcomes
    /// are always spelled out.
    pub fn user_message(&self) -> String {
        let charge_outcome = matches!(
            self,
            Error::Ledger(LedgerError::ProviderFailure(_) | LedgerError::RefundFailed { .. })
        );
        if self.status_code().is_server_error() && !charge_outcome {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, error_code = self.error_code(), "Request failed");
        } else {
            tracing::debug!(error = %self, error_code = self.error_code(), "Request rejected");
        }

        let body = ErrorResponse {
            success: false,
            error_code: self.error_code().to_string(),
            message: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::from(LedgerError::CodeNotFound), StatusCode::NOT_FOUND),
            (Error::from(LedgerError::CodeExpired), StatusCode::GONE),
            (Error::from(LedgerError::CodeAlreadyUsed), StatusCode::CONFLICT),
            (Error::from(LedgerError::AlreadyClaimed), StatusCode::CONFLICT),
            (Error::from(LedgerError::StorageConflict), StatusCode::CONFLICT),
            (Error::from(LedgerError::SelfReferralNotAllowed), StatusCode::BAD_REQUEST),
            (
                Error::from(LedgerError::InsufficientBalance { required: 10, available: 5 }),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (Error::from(LedgerError::ProviderFailure("boom".into())), StatusCode::BAD_GATEWAY),
            (Error::from(DbError::NotFound), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{error:?}");
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let error = Error::from(LedgerError::Database(DbError::Other(anyhow::anyhow!("password authentication failed"))));
        assert_eq!(error.error_code(), "InternalError");
        assert_eq!(error.user_message(), "Internal server error");

        let provider = Error::from(LedgerError::ProviderFailure("provider call timed out".into()));
        assert!(provider.user_message().contains("timed out"));

        let debit_transaction_id = uuid::Uuid::new_v4();
        let refund = Error::from(LedgerError::RefundFailed {
            debit_transaction_id,
            reason: "provider call timed out".into(),
        });
        assert_eq!(refund.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(refund.error_code(), "RefundFailed");
        assert!(refund.user_message().contains(&debit_transaction_id.to_string()));
        assert!(refund.user_message().contains("charge stands"));
    }
}
