use crate::{
    ledger::{AwardedType, MilestoneAward, Redemption},
    types::{MilestoneId, Points, TransactionId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedeemRequest {
    /// Single-use redemption code or a referral code
    pub code: String,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedeemResponse {
    pub success: bool,
    pub awarded_type: AwardedType,
    /// Points, days or months depending on `awarded_type`
    pub awarded_value: Points,
    /// The redeeming user's point balance afterwards
    pub new_balance: Points,
    pub membership_expires_at: Option<DateTime<Utc>>,
    /// Milestone bonuses the referral unlocked for the inviter
    pub milestones: Vec<MilestoneAwardResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MilestoneAwardResponse {
    #[schema(value_type = String, format = "uuid")]
    pub milestone_id: MilestoneId,
    pub threshold: i64,
    pub bonus_points: Points,
    #[schema(value_type = String, format = "uuid")]
    pub transaction_id: TransactionId,
}

impl From<MilestoneAward> for MilestoneAwardResponse {
    fn from(award: MilestoneAward) -> Self {
        Self {
            milestone_id: award.milestone_id,
            threshold: award.threshold,
            bonus_points: award.bonus_points,
            transaction_id: award.transaction_id,
        }
    }
}

impl From<Redemption> for RedeemResponse {
    fn from(redemption: Redemption) -> Self {
        Self {
            success: true,
            awarded_type: redemption.awarded_type,
            awarded_value: redemption.awarded_value,
            new_balance: redemption.new_balance,
            membership_expires_at: redemption.membership_expires_at,
            milestones: redemption.milestones.into_iter().map(Into::into).collect(),
        }
    }
}
