use crate::types::{MilestoneId, Points, TransactionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database response for a referral milestone definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MilestoneDefinitionDBResponse {
    pub id: MilestoneId,
    /// Completed referrals needed to unlock the bonus
    pub threshold: i64,
    pub bonus_points: Points,
    pub is_active: bool,
}

/// Database request for recording a milestone payout
#[derive(Debug, Clone)]
pub struct MilestonePayoutCreateDBRequest {
    pub inviter_id: UserId,
    pub milestone_id: MilestoneId,
    pub invitation_count: i64,
    pub bonus_points: Points,
    pub transaction_id: TransactionId,
}

/// Database response for a milestone payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MilestonePayoutDBResponse {
    pub id: Uuid,
    pub inviter_id: UserId,
    pub milestone_id: MilestoneId,
    pub invitation_count: i64,
    pub bonus_points: Points,
    pub transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
}
