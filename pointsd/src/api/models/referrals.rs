use crate::{
    api::models::redemptions::MilestoneAwardResponse,
    db::models::{
        invitations::{InvitationCodeDBResponse, InvitationDBResponse, InvitationStatus},
        milestones::MilestonePayoutDBResponse,
    },
    ledger::ReferralSummary,
    types::{InvitationCodeId, InvitationId, MilestoneId, Points, TransactionId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvitationCodeResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: InvitationCodeId,
    pub code: String,
    #[schema(value_type = String, format = "uuid")]
    pub inviter_id: UserId,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<InvitationCodeDBResponse> for InvitationCodeResponse {
    fn from(db: InvitationCodeDBResponse) -> Self {
        Self {
            id: db.id,
            code: db.code,
            inviter_id: db.inviter_id,
            expires_at: db.expires_at,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterInvitationRequest {
    pub code: String,
    /// The newly signed-up user
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvitationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: InvitationId,
    #[schema(value_type = String, format = "uuid")]
    pub inviter_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub invited_user_id: UserId,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<InvitationDBResponse> for InvitationResponse {
    fn from(db: InvitationDBResponse) -> Self {
        Self {
            id: db.id,
            inviter_id: db.inviter_id,
            invited_user_id: db.invited_user_id,
            status: db.status,
            created_at: db.created_at,
            completed_at: db.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MilestonePayoutResponse {
    #[schema(value_type = String, format = "uuid")]
    pub milestone_id: MilestoneId,
    /// Completed referrals at the time of payout
    pub invitation_count: i64,
    pub bonus_points: Points,
    #[schema(value_type = String, format = "uuid")]
    pub transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
}

impl From<MilestonePayoutDBResponse> for MilestonePayoutResponse {
    fn from(db: MilestonePayoutDBResponse) -> Self {
        Self {
            milestone_id: db.milestone_id,
            invitation_count: db.invitation_count,
            bonus_points: db.bonus_points,
            transaction_id: db.transaction_id,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NextMilestoneResponse {
    pub threshold: i64,
    pub bonus_points: Points,
    /// Completed referrals still needed
    pub remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferralSummaryResponse {
    pub completed_invitations: i64,
    pub paid_milestones: Vec<MilestonePayoutResponse>,
    pub next_milestone: Option<NextMilestoneResponse>,
}

impl From<ReferralSummary> for ReferralSummaryResponse {
    fn from(summary: ReferralSummary) -> Self {
        let completed = summary.completed_invitations;
        Self {
            completed_invitations: completed,
            paid_milestones: summary.paid_milestones.into_iter().map(Into::into).collect(),
            next_milestone: summary.next_milestone.map(|next| NextMilestoneResponse {
                threshold: next.threshold,
                bonus_points: next.bonus_points,
                remaining: next.threshold - completed,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MilestoneEvaluationResponse {
    /// Milestones paid by this evaluation; empty when nothing new was reached
    pub milestones: Vec<MilestoneAwardResponse>,
}
