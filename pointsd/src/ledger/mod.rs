//! Points ledger core: the transaction engine and the services built on it.

pub mod charge;
pub mod codes;
pub mod engine;
pub mod milestones;
pub mod redemption;

pub use charge::{ChargeGuard, ChargeOutcome, ChargeRequest};
pub use engine::apply_transaction;
pub use milestones::{MilestoneAward, MilestoneEvaluator, ReferralSummary};
pub use redemption::{AwardedType, Redemption, RedemptionService};

use crate::{
    db::errors::DbError,
    types::{Points, TransactionId},
};
use std::future::Future;
use thiserror::Error;
use tracing::warn;

/// Outcomes a ledger operation can end in besides success. Each variant is user-visible.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Code not found")]
    CodeNotFound,

    #[error("Code has expired")]
    CodeExpired,

    /// The single-use code was redeemed already, by anyone
    #[error("Code has already been used")]
    CodeAlreadyUsed,

    /// This user already claimed this referral code
    #[error("Referral code already claimed by this user")]
    AlreadyClaimed,

    #[error("Referral codes cannot be redeemed by their owner")]
    SelfReferralNotAllowed,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Points, available: Points },

    /// Lost a race on a conditional update; the operation may be retried
    #[error("Concurrent update conflict")]
    StorageConflict,

    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    /// The provider call failed and its refund could not be written. The debit stands until it
    /// is reconciled against `debit_transaction_id`.
    #[error("Provider failure: {reason}. The refund for charge {debit_transaction_id} could not be applied, so the charge stands")]
    RefundFailed {
        debit_transaction_id: TransactionId,
        reason: String,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    Database(DbError),
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict => LedgerError::StorageConflict,
            other => LedgerError::Database(other),
        }
    }
}

impl LedgerError {
    /// Stable identifier reported to API clients
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::CodeNotFound => "CodeNotFound",
            LedgerError::CodeExpired => "CodeExpired",
            LedgerError::CodeAlreadyUsed => "CodeAlreadyUsed",
            LedgerError::AlreadyClaimed => "AlreadyClaimed",
            LedgerError::SelfReferralNotAllowed => "SelfReferralNotAllowed",
            LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
            LedgerError::StorageConflict => "StorageConflict",
            LedgerError::ProviderFailure(_) => "ProviderFailure",
            LedgerError::RefundFailed { .. } => "RefundFailed",
            LedgerError::InvalidAmount(_) => "InvalidAmount",
            LedgerError::Database(_) => "InternalError",
        }
    }
}

/// Run `operation`, re-running it once if it lost a conditional-update race.
pub async fn with_conflict_retry<T, F, Fut>(operation: &str, mut attempt: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    match attempt().await {
        Err(LedgerError::StorageConflict) => {
            warn!(operation, "Storage conflict, retrying once");
            attempt().await
        }
        other => other,
    }
}
