use crate::{
    db::{
        errors::Result,
        models::invitations::{
            InvitationCodeCreateDBRequest, InvitationCodeDBResponse, InvitationCreateDBRequest, InvitationDBResponse, InvitationStatus,
        },
    },
    types::{InvitationCodeId, InvitationId, UserId},
};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

const INVITATION_CODE_COLUMNS: &str = "id, code, inviter_id, expires_at, created_at";
const INVITATION_COLUMNS: &str = "id, invitation_code_id, inviter_id, invited_user_id, status, created_at, completed_at";

pub struct Invitations<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Invitations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn create_code(&mut self, request: &InvitationCodeCreateDBRequest) -> Result<InvitationCodeDBResponse> {
        let code = sqlx::query_as::<_, InvitationCodeDBResponse>(&format!(
            "INSERT INTO invitation_codes (code, inviter_id, expires_at) VALUES ($1, $2, $3) RETURNING {INVITATION_CODE_COLUMNS}"
        ))
        .bind(&request.code)
        .bind(request.inviter_id)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(code)
    }

    pub async fn get_code(&mut self, code: &str) -> Result<Option<InvitationCodeDBResponse>> {
        let code = sqlx::query_as::<_, InvitationCodeDBResponse>(&format!(
            "SELECT {INVITATION_CODE_COLUMNS} FROM invitation_codes WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(code)
    }

    pub async fn get_code_by_inviter(&mut self, inviter_id: UserId) -> Result<Option<InvitationCodeDBResponse>> {
        let code = sqlx::query_as::<_, InvitationCodeDBResponse>(&format!(
            "SELECT {INVITATION_CODE_COLUMNS} FROM invitation_codes WHERE inviter_id = $1"
        ))
        .bind(inviter_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(code)
    }

    pub async fn get(&mut self, invitation_code_id: InvitationCodeId, invited_user_id: UserId) -> Result<Option<InvitationDBResponse>> {
        let invitation = sqlx::query_as::<_, InvitationDBResponse>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE invitation_code_id = $1 AND invited_user_id = $2"
        ))
        .bind(invitation_code_id)
        .bind(invited_user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(invitation)
    }

    /// The `(invitation_code_id, invited_user_id)` unique constraint is the idempotency guard:
    /// a duplicate insert returns `None` instead of aborting the surrounding transaction.
    pub async fn insert(&mut self, request: &InvitationCreateDBRequest) -> Result<Option<InvitationDBResponse>> {
        let completed_at = match request.status {
            InvitationStatus::Completed => Some(Utc::now()),
            InvitationStatus::Registered => None,
        };

        let invitation = sqlx::query_as::<_, InvitationDBResponse>(&format!(
            r#"
            INSERT INTO invitations (invitation_code_id, inviter_id, invited_user_id, status, completed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT invitations_code_invitee_unique DO NOTHING
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(request.invitation_code_id)
        .bind(request.inviter_id)
        .bind(request.invited_user_id)
        .bind(request.status)
        .bind(completed_at)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(invitation)
    }

    pub async fn complete(&mut self, invitation_id: InvitationId, now: DateTime<Utc>) -> Result<Option<InvitationDBResponse>> {
        let invitation = sqlx::query_as::<_, InvitationDBResponse>(&format!(
            r#"
            UPDATE invitations
            SET status = 'completed', completed_at = $2
            WHERE id = $1 AND status = 'registered'
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(invitation_id)
        .bind(now)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(invitation)
    }

    pub async fn count_completed(&mut self, inviter_id: UserId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invitations WHERE inviter_id = $1 AND status = 'completed'")
            .bind(inviter_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}
