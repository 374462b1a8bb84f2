use crate::{
    api::models::balances::{BalanceResponse, ReconciliationResponse},
    db::{models::balances::AccountBalanceDBResponse, repository::{BalanceRepository, TransactionLogRepository}, LedgerStore, LedgerTx},
    errors::{ErrorResponse, Result},
    types::UserId,
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;

/// Get a user's balance
#[utoipa::path(
    get,
    path = "/users/{user_id}/balance",
    tag = "balances",
    summary = "Get a user's balance",
    description = "Users who have never touched the ledger have an empty balance.",
    params(
        ("user_id" = String, Path, format = "uuid", description = "User ID"),
    ),
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn get_balance<S: LedgerStore>(State(state): State<AppState<S>>, Path(user_id): Path<UserId>) -> Result<Json<BalanceResponse>> {
    let now = Utc::now();
    let mut tx = state.ledger.begin().await?;
    let balance = tx.get_balance(user_id).await?;
    tx.commit().await?;

    let balance = balance.unwrap_or_else(|| AccountBalanceDBResponse::empty(user_id, now));
    Ok(Json(BalanceResponse::new(balance, now)))
}

/// Check a user's balance against their transaction log
#[utoipa::path(
    get,
    path = "/users/{user_id}/ledger/reconciliation",
    tag = "balances",
    summary = "Reconcile a user's ledger",
    description = "Compares the stored point balance with the sum of the user's transaction log. Both are read in one unit of work.",
    params(
        ("user_id" = String, Path, format = "uuid", description = "User ID"),
    ),
    responses(
        (status = 200, description = "Reconciliation result", body = ReconciliationResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn reconcile<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ReconciliationResponse>> {
    let mut tx = state.ledger.begin().await?;
    let points = tx.get_balance(user_id).await?.map_or(0, |balance| balance.points);
    let entries_sum = tx.sum_entries(user_id).await?;
    tx.commit().await?;

    if points != entries_sum {
        tracing::error!(%user_id, points, entries_sum, "Ledger out of balance");
    }

    Ok(Json(ReconciliationResponse {
        user_id,
        points,
        entries_sum,
        consistent: points == entries_sum,
    }))
}
