//! Pre-deduct, call the provider, keep or refund.

use crate::{
    db::{models::transactions::{TransactionCreateDBRequest, TransactionType}, repository::LedgerStore},
    ledger::{
        engine::{apply_transaction, AppliedTransaction},
        LedgerError,
    },
    types::{Points, TransactionId, UserId},
};
use std::{future::Future, time::Duration};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Attempts at writing a refund before the charge is reported as standing
const REFUND_ATTEMPTS: u32 = 3;

/// Delay before the second refund attempt, doubled for each later one
const REFUND_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub user_id: UserId,
    pub cost: Points,
    pub description: String,
    pub related_id: Option<Uuid>,
    /// Upper bound on the provider call; elapsing counts as a failure
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub output: String,
    /// Balance right after the debit
    pub new_balance: Points,
    /// The GENERATE entry that paid for the call
    pub transaction_id: TransactionId,
}

/// Wraps a paid action so the user is never charged for a failed call.
#[derive(Clone)]
pub struct ChargeGuard<S> {
    store: S,
}

impl<S: LedgerStore> ChargeGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Debit `request.cost`, then run `action` under the request timeout.
    ///
    /// If the action fails, times out or produces only whitespace, the debit is compensated with a
    /// REFUND entry pointing at it and [`LedgerError::ProviderFailure`] is returned. A refund that
    /// still fails after retrying is reported as [`LedgerError::RefundFailed`]. The action is
    /// never started when the debit is refused. No lock is held while the action runs.
    #[instrument(skip(self, request, action), fields(user_id = %request.user_id, cost = request.cost), err)]
    pub async fn with_charge<F, Fut>(&self, request: ChargeRequest, action: F) -> Result<ChargeOutcome, LedgerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        if request.cost <= 0 {
            return Err(LedgerError::InvalidAmount(format!("charge cost must be positive, got {}", request.cost)));
        }

        let mut debit = TransactionCreateDBRequest::debit(request.user_id, request.cost, request.description.clone());
        debit.related_id = request.related_id;
        let debited = apply_transaction(&self.store, &debit).await?;

        let reason = match tokio::time::timeout(request.timeout, action()).await {
            Ok(Ok(output)) if !output.trim().is_empty() => {
                info!(transaction_id = %debited.transaction_id(), new_balance = debited.new_balance, "Charge settled");
                return Ok(ChargeOutcome {
                    output,
                    new_balance: debited.new_balance,
                    transaction_id: debited.transaction_id(),
                });
            }
            Ok(Ok(_)) => "provider returned an empty result".to_string(),
            Ok(Err(e)) => format!("{e:#}"),
            Err(_) => format!("provider call timed out after {:?}", request.timeout),
        };

        warn!(transaction_id = %debited.transaction_id(), %reason, "Provider call failed, refunding charge");

        if let Err(e) = self.refund(&request, &debited).await {
            error!(
                transaction_id = %debited.transaction_id(),
                user_id = %request.user_id,
                cost = request.cost,
                error = %e,
                "Refund after provider failure did not apply"
            );
            return Err(LedgerError::RefundFailed {
                debit_transaction_id: debited.transaction_id(),
                reason,
            });
        }

        Err(LedgerError::ProviderFailure(reason))
    }

    /// Credit the cost back, retrying with exponential backoff.
    async fn refund(&self, request: &ChargeRequest, debited: &AppliedTransaction) -> Result<AppliedTransaction, LedgerError> {
        let refund = TransactionCreateDBRequest::credit(
            request.user_id,
            TransactionType::Refund,
            request.cost,
            format!("Refund: {}", request.description),
        )
        .related_to(debited.transaction_id());

        let mut backoff = REFUND_BACKOFF;
        let mut attempt = 1;
        loop {
            match apply_transaction(&self.store, &refund).await {
                Ok(applied) => return Ok(applied),
                Err(e) if attempt < REFUND_ATTEMPTS => {
                    warn!(transaction_id = %debited.transaction_id(), attempt, error = %e, "Refund attempt failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
