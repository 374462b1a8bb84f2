use crate::{
    db::{
        errors::Result,
        models::transactions::{TransactionCreateDBRequest, TransactionDBResponse},
    },
    types::{Points, TransactionId, UserId},
};
use sqlx::PgConnection;

const ENTRY_COLUMNS: &str = "id, user_id, transaction_type, amount, balance_after, description, related_id, created_at";

/// Append-only access to `transaction_log`. Entries are never updated or deleted.
pub struct TransactionLog<'c> {
    db: &'c mut PgConnection,
}

impl<'c> TransactionLog<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn append(&mut self, request: &TransactionCreateDBRequest, balance_after: Points) -> Result<TransactionDBResponse> {
        let entry = sqlx::query_as::<_, TransactionDBResponse>(&format!(
            r#"
            INSERT INTO transaction_log (user_id, transaction_type, amount, balance_after, description, related_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(request.user_id)
        .bind(request.transaction_type)
        .bind(request.amount)
        .bind(balance_after)
        .bind(&request.description)
        .bind(request.related_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(entry)
    }

    /// Get a single entry by its ID
    pub async fn get_by_id(&mut self, transaction_id: TransactionId) -> Result<Option<TransactionDBResponse>> {
        let entry = sqlx::query_as::<_, TransactionDBResponse>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM transaction_log WHERE id = $1"
        ))
        .bind(transaction_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(entry)
    }

    /// List entries for a specific user with pagination
    pub async fn list_for_user(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<TransactionDBResponse>> {
        let entries = sqlx::query_as::<_, TransactionDBResponse>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM transaction_log
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(entries)
    }

    pub async fn sum_for_user(&mut self, user_id: UserId) -> Result<Points> {
        let sum = sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(amount), 0)::BIGINT FROM transaction_log WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(sum)
    }
}
