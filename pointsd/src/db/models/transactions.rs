use crate::types::{Points, TransactionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Ledger transaction type stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Feature usage charge (debit)
    Generate,
    /// Referral and milestone rewards (credit)
    Bonus,
    /// Redemption code credit
    Redeem,
    /// Compensation for a failed charge (credit)
    Refund,
}

impl TransactionType {
    pub fn is_debit(&self) -> bool {
        matches!(self, TransactionType::Generate)
    }
}

/// Database request for appending a ledger entry
#[derive(Debug, Clone)]
pub struct TransactionCreateDBRequest {
    pub user_id: UserId,
    pub transaction_type: TransactionType,
    /// Signed amount: positive credits, negative debits
    pub amount: Points,
    pub description: Option<String>,
    /// Redemption code, invitation, milestone or charged invocation this entry belongs to
    pub related_id: Option<Uuid>,
}

impl TransactionCreateDBRequest {
    pub fn credit(user_id: UserId, transaction_type: TransactionType, amount: Points, description: impl Into<String>) -> Self {
        Self {
            user_id,
            transaction_type,
            amount,
            description: Some(description.into()),
            related_id: None,
        }
    }

    pub fn debit(user_id: UserId, amount: Points, description: impl Into<String>) -> Self {
        Self {
            user_id,
            transaction_type: TransactionType::Generate,
            amount: -amount,
            description: Some(description.into()),
            related_id: None,
        }
    }

    pub fn related_to(mut self, related_id: Uuid) -> Self {
        self.related_id = Some(related_id);
        self
    }
}

/// Database response for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TransactionDBResponse {
    pub id: TransactionId,
    pub user_id: UserId,
    pub transaction_type: TransactionType,
    pub amount: Points,
    pub balance_after: Points,
    pub description: Option<String>,
    pub related_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
