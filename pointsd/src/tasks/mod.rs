//! Short-lived state for asynchronously executed charges.
//!
//! Entries carry a time-to-live: an expired entry reads as absent and is eventually purged.

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgTaskStore;

use crate::{
    db::errors::Result,
    types::{Points, TaskId, TransactionId},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Completed {
        output: String,
        new_balance: Points,
        #[schema(value_type = String, format = "uuid")]
        transaction_id: TransactionId,
    },
    Failed {
        error_code: String,
        message: String,
    },
}

impl TaskState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, TaskState::Pending)
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// The task's state, unless it never existed or has expired
    async fn get(&self, task_id: TaskId) -> Result<Option<TaskState>>;

    /// Store the state and restart the entry's time-to-live
    async fn set(&self, task_id: TaskId, state: &TaskState) -> Result<()>;

    /// Drop the entry now. Returns whether it existed.
    async fn expire(&self, task_id: TaskId) -> Result<bool>;
}
