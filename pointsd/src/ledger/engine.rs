//! The transaction engine: the only code path that changes a point balance.
//!
//! Every change is a log entry plus a balance update made in the same unit of work while the
//! balance row is locked, so the log sum and the balance can never diverge.

use crate::{
    db::{
        models::transactions::{TransactionCreateDBRequest, TransactionDBResponse},
        repository::{BalanceRepository, LedgerStore, LedgerTx, TransactionLogRepository},
    },
    ledger::{with_conflict_retry, LedgerError},
    types::{Points, TransactionId},
};
use tracing::debug;

/// A committed (or about to be committed) ledger change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransaction {
    pub entry: TransactionDBResponse,
    pub new_balance: Points,
}

impl AppliedTransaction {
    pub fn transaction_id(&self) -> TransactionId {
        self.entry.id
    }
}

/// Reject requests whose sign disagrees with their type, and zero amounts.
pub fn validate_request(request: &TransactionCreateDBRequest) -> Result<(), LedgerError> {
    if request.amount == 0 {
        return Err(LedgerError::InvalidAmount("amount must be non-zero".to_string()));
    }
    match (request.transaction_type.is_debit(), request.amount < 0) {
        (true, false) => Err(LedgerError::InvalidAmount(format!(
            "{:?} transactions must be negative, got {}",
            request.transaction_type, request.amount
        ))),
        (false, true) => Err(LedgerError::InvalidAmount(format!(
            "{:?} transactions must be positive, got {}",
            request.transaction_type, request.amount
        ))),
        _ => Ok(()),
    }
}

/// Balance after applying `amount` to `current`. Debits may not take the balance below zero.
pub fn next_balance(current: Points, amount: Points) -> Result<Points, LedgerError> {
    let next = current
        .checked_add(amount)
        .ok_or_else(|| LedgerError::InvalidAmount(format!("balance overflow applying {amount} to {current}")))?;
    if next < 0 {
        return Err(LedgerError::InsufficientBalance {
            required: -amount,
            available: current,
        });
    }
    Ok(next)
}

/// Apply a transaction inside an open unit of work. Nothing is visible until the caller commits;
/// if any step fails the caller drops the unit of work and both writes roll back together.
pub async fn apply<T>(tx: &mut T, request: &TransactionCreateDBRequest) -> Result<AppliedTransaction, LedgerError>
where
    T: BalanceRepository + TransactionLogRepository + Send + ?Sized,
{
    validate_request(request)?;

    let balance = tx.lock_balance(request.user_id).await?;
    let new_balance = next_balance(balance.points, request.amount)?;

    let entry = tx.append_entry(request, new_balance).await?;
    tx.set_points(request.user_id, new_balance).await?;

    debug!(
        user_id = %request.user_id,
        transaction_type = ?request.transaction_type,
        amount = request.amount,
        new_balance,
        "Applied ledger transaction"
    );

    Ok(AppliedTransaction { entry, new_balance })
}

/// Apply a single transaction in its own unit of work.
pub async fn apply_transaction<S: LedgerStore>(store: &S, request: &TransactionCreateDBRequest) -> Result<AppliedTransaction, LedgerError> {
    with_conflict_retry("apply_transaction", move || async move {
        let mut tx = store.begin().await?;
        let applied = apply(&mut tx, request).await?;
        tx.commit().await?;
        Ok(applied)
    })
    .await
}
