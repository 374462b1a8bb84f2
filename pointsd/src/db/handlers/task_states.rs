use crate::{db::errors::Result, types::TaskId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgConnection};

pub struct TaskStates<'c> {
    db: &'c mut PgConnection,
}

impl<'c> TaskStates<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Fetch a state that has not yet expired
    pub async fn get_live(&mut self, task_id: TaskId) -> Result<Option<Value>> {
        let state = sqlx::query_scalar::<_, Json<Value>>("SELECT state FROM task_states WHERE id = $1 AND expires_at > NOW()")
            .bind(task_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(state.map(|Json(value)| value))
    }

    pub async fn upsert(&mut self, task_id: TaskId, state: &Value, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO task_states (id, state, expires_at, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (id) DO UPDATE SET state = EXCLUDED.state, expires_at = EXCLUDED.expires_at, updated_at = NOW()
            "#,
        )
        .bind(task_id)
        .bind(Json(state))
        .bind(expires_at)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    pub async fn delete(&mut self, task_id: TaskId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM task_states WHERE id = $1")
            .bind(task_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove expired rows, returning how many were purged
    pub async fn purge_expired(&mut self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM task_states WHERE expires_at <= NOW()")
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
