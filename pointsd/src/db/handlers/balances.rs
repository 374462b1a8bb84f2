use crate::{
    db::{errors::Result, models::balances::AccountBalanceDBResponse},
    types::{Points, UserId},
};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::trace;

const BALANCE_COLUMNS: &str = "user_id, points, daily_points, is_member, membership_expires_at, last_updated";

pub struct Balances<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Balances<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Get a user's balance row, if the user has one. Read-only, no locking.
    pub async fn get(&mut self, user_id: UserId) -> Result<Option<AccountBalanceDBResponse>> {
        let balance = sqlx::query_as::<_, AccountBalanceDBResponse>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM account_balances WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(balance)
    }

    /// Lazily create the balance row and take a row lock on it.
    /// Must run inside a transaction; the lock is released on commit or rollback.
    pub async fn lock_for_update(&mut self, user_id: UserId) -> Result<AccountBalanceDBResponse> {
        sqlx::query("INSERT INTO account_balances (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        // Blocks until concurrent writers for this user have finished
        let balance = sqlx::query_as::<_, AccountBalanceDBResponse>(&format!(
            "SELECT {BALANCE_COLUMNS} FROM account_balances WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_one(&mut *self.db)
        .await?;

        trace!("Acquired balance lock for user_id {}", user_id);
        Ok(balance)
    }

    /// Overwrite the point balance. The `points >= 0` check constraint backs the engine's own check.
    pub async fn set_points(&mut self, user_id: UserId, points: Points) -> Result<AccountBalanceDBResponse> {
        let balance = sqlx::query_as::<_, AccountBalanceDBResponse>(&format!(
            "UPDATE account_balances SET points = $2, last_updated = NOW() WHERE user_id = $1 RETURNING {BALANCE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(points)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(balance)
    }

    pub async fn set_membership(&mut self, user_id: UserId, expires_at: DateTime<Utc>) -> Result<AccountBalanceDBResponse> {
        let balance = sqlx::query_as::<_, AccountBalanceDBResponse>(&format!(
            "UPDATE account_balances SET is_member = TRUE, membership_expires_at = $2, last_updated = NOW() \
             WHERE user_id = $1 RETURNING {BALANCE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(balance)
    }
}
