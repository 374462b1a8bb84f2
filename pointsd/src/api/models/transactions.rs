use crate::{
    db::models::transactions::{TransactionDBResponse, TransactionType},
    types::{Points, TransactionId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TransactionId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub transaction_type: TransactionType,
    /// Signed: credits positive, debits negative
    pub amount: Points,
    pub balance_after: Points,
    pub description: Option<String>,
    /// Code, invitation, milestone or debit this entry relates to
    #[schema(value_type = Option<String>, format = "uuid")]
    pub related_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing transactions
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListTransactionsQuery {
    /// Number of items to skip
    pub skip: Option<i64>,

    /// Maximum number of items to return (at most 1000)
    pub limit: Option<i64>,
}

impl From<TransactionDBResponse> for TransactionResponse {
    fn from(db: TransactionDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            transaction_type: db.transaction_type,
            amount: db.amount,
            balance_after: db.balance_after,
            description: db.description,
            related_id: db.related_id,
            created_at: db.created_at,
        }
    }
}
