use crate::{
    ledger::ChargeOutcome,
    tasks::TaskState,
    types::{Points, TaskId, TransactionId, UserId},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChargeCreate {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    /// Points deducted up front and refunded if the provider call fails
    pub cost: Points,
    pub description: String,
    /// Text passed to the provider
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChargeResponse {
    pub success: bool,
    pub new_balance: Points,
    pub output: String,
    #[schema(value_type = String, format = "uuid")]
    pub transaction_id: TransactionId,
}

impl From<ChargeOutcome> for ChargeResponse {
    fn from(outcome: ChargeOutcome) -> Self {
        Self {
            success: true,
            new_balance: outcome.new_balance,
            output: outcome.output,
            transaction_id: outcome.transaction_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AsyncChargeResponse {
    #[schema(value_type = String, format = "uuid")]
    pub task_id: TaskId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    #[schema(value_type = String, format = "uuid")]
    pub task_id: TaskId,
    #[serde(flatten)]
    pub state: TaskState,
}
