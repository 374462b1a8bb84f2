use crate::{
    db::{
        errors::{DbError, Result},
        handlers::TaskStates,
    },
    tasks::{TaskState, TaskStore},
    types::TaskId,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
    ttl: Duration,
}

impl PgTaskStore {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        TaskStates::new(&mut conn).purge_expired().await
    }

    /// Purge expired entries every `interval` until the returned guard is dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> DropGuard {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let store = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => {
                        debug!("Task state sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => match store.purge_expired().await {
                        Ok(0) => {}
                        Ok(purged) => info!(purged, "Purged expired task states"),
                        Err(e) => warn!(error = %e, "Failed to purge expired task states"),
                    },
                }
            }
        });

        token.drop_guard()
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn get(&self, task_id: TaskId) -> Result<Option<TaskState>> {
        let mut conn = self.pool.acquire().await?;
        let Some(value) = TaskStates::new(&mut conn).get_live(task_id).await? else {
            return Ok(None);
        };
        let state = serde_json::from_value(value).map_err(|e| DbError::Other(e.into()))?;
        Ok(Some(state))
    }

    async fn set(&self, task_id: TaskId, state: &TaskState) -> Result<()> {
        let ttl = chrono::Duration::from_std(self.ttl).map_err(|e| DbError::Other(e.into()))?;
        let value = serde_json::to_value(state).map_err(|e| DbError::Other(e.into()))?;
        let mut conn = self.pool.acquire().await?;
        TaskStates::new(&mut conn).upsert(task_id, &value, Utc::now() + ttl).await
    }

    async fn expire(&self, task_id: TaskId) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        TaskStates::new(&mut conn).delete(task_id).await
    }
}
