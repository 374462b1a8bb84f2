use crate::{
    db::{
        errors::Result,
        models::milestones::{MilestoneDefinitionDBResponse, MilestonePayoutCreateDBRequest, MilestonePayoutDBResponse},
    },
    types::UserId,
};
use sqlx::PgConnection;

const DEFINITION_COLUMNS: &str = "id, threshold, bonus_points, is_active";
const PAYOUT_COLUMNS: &str = "id, inviter_id, milestone_id, invitation_count, bonus_points, transaction_id, created_at";

pub struct Milestones<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Milestones<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn list_active_up_to(&mut self, max_threshold: i64) -> Result<Vec<MilestoneDefinitionDBResponse>> {
        let milestones = sqlx::query_as::<_, MilestoneDefinitionDBResponse>(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM milestone_definitions WHERE is_active AND threshold <= $1 ORDER BY threshold ASC"
        ))
        .bind(max_threshold)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(milestones)
    }

    pub async fn next_above(&mut self, count: i64) -> Result<Option<MilestoneDefinitionDBResponse>> {
        let milestone = sqlx::query_as::<_, MilestoneDefinitionDBResponse>(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM milestone_definitions WHERE is_active AND threshold > $1 ORDER BY threshold ASC LIMIT 1"
        ))
        .bind(count)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(milestone)
    }

    pub async fn list_payouts(&mut self, inviter_id: UserId) -> Result<Vec<MilestonePayoutDBResponse>> {
        let payouts = sqlx::query_as::<_, MilestonePayoutDBResponse>(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM milestone_payouts WHERE inviter_id = $1 ORDER BY created_at ASC"
        ))
        .bind(inviter_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payouts)
    }

    /// `None` when the inviter already holds a payout for this milestone
    pub async fn insert_payout(&mut self, request: &MilestonePayoutCreateDBRequest) -> Result<Option<MilestonePayoutDBResponse>> {
        let payout = sqlx::query_as::<_, MilestonePayoutDBResponse>(&format!(
            r#"
            INSERT INTO milestone_payouts (inviter_id, milestone_id, invitation_count, bonus_points, transaction_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT milestone_payouts_inviter_milestone_unique DO NOTHING
            RETURNING {PAYOUT_COLUMNS}
            "#
        ))
        .bind(request.inviter_id)
        .bind(request.milestone_id)
        .bind(request.invitation_count)
        .bind(request.bonus_points)
        .bind(request.transaction_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(payout)
    }
}
