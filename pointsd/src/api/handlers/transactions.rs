use crate::{
    api::models::transactions::{ListTransactionsQuery, TransactionResponse},
    db::{repository::TransactionLogRepository, LedgerStore, LedgerTx},
    errors::{Error, ErrorResponse, Result},
    types::{TransactionId, UserId},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};

/// List a user's ledger entries
#[utoipa::path(
    get,
    path = "/users/{user_id}/transactions",
    tag = "transactions",
    summary = "List a user's transactions",
    description = "Ledger entries for the user, newest first.",
    params(
        ("user_id" = String, Path, format = "uuid", description = "User ID"),
        ListTransactionsQuery
    ),
    responses(
        (status = 200, description = "Ledger entries", body = [TransactionResponse]),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn list_transactions<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<UserId>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<TransactionResponse>>> {
    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(100).clamp(0, 1000);

    let mut tx = state.ledger.begin().await?;
    let entries = tx.list_entries(user_id, skip, limit).await?;
    tx.commit().await?;

    Ok(Json(entries.into_iter().map(TransactionResponse::from).collect()))
}

/// Get a single ledger entry
#[utoipa::path(
    get,
    path = "/transactions/{transaction_id}",
    tag = "transactions",
    summary = "Get a transaction",
    params(
        ("transaction_id" = String, Path, format = "uuid", description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Ledger entry", body = TransactionResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn get_transaction<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<TransactionResponse>> {
    let mut tx = state.ledger.begin().await?;
    let entry = tx.get_entry(transaction_id).await?;
    tx.commit().await?;

    let entry = entry.ok_or_else(|| Error::NotFound {
        resource: "Transaction".to_string(),
        id: transaction_id.to_string(),
    })?;
    Ok(Json(entry.into()))
}

#[cfg(test)]
mod tests {
    use crate::{api::models::transactions::TransactionResponse, db::models::transactions::TransactionType, test_utils::*};
    use uuid::Uuid;

    #[test_log::test(tokio::test)]
    async fn test_list_is_newest_first_and_paginated() {
        let app = TestApp::new().await;
        let user_id = Uuid::new_v4();
        for points in [10, 20, 30] {
            app.fund(user_id, points).await;
        }

        let all: Vec<TransactionResponse> = app.server.get(&format!("/api/v1/users/{user_id}/transactions")).await.json();
        assert_eq!(all.iter().map(|e| e.amount).collect::<Vec<_>>(), vec![30, 20, 10]);
        assert_eq!(all.iter().map(|e| e.balance_after).collect::<Vec<_>>(), vec![60, 30, 10]);
        assert!(all.iter().all(|e| e.transaction_type == TransactionType::Bonus));

        let page: Vec<TransactionResponse> = app
            .server
            .get(&format!("/api/v1/users/{user_id}/transactions"))
            .add_query_param("skip", 1)
            .add_query_param("limit", 1)
            .await
            .json();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].amount, 20);
    }

    #[test_log::test(tokio::test)]
    async fn test_get_transaction() {
        let app = TestApp::new().await;
        let user_id = Uuid::new_v4();
        app.fund(user_id, 10).await;

        let entries: Vec<TransactionResponse> = app.server.get(&format!("/api/v1/users/{user_id}/transactions")).await.json();
        let response = app.server.get(&format!("/api/v1/transactions/{}", entries[0].id)).await;
        response.assert_status_ok();
        let entry: TransactionResponse = response.json();
        assert_eq!(entry.id, entries[0].id);
        assert_eq!(entry.user_id, user_id);

        app.server
            .get(&format!("/api/v1/transactions/{}", Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }
}
