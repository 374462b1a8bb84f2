use crate::types::{InvitationCodeId, InvitationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Invitation lifecycle, stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// The invitee signed up with the code; no reward paid yet
    Registered,
    /// The referral was claimed and the inviter rewarded
    Completed,
}

/// Database request for creating an inviter's reusable referral code
#[derive(Debug, Clone)]
pub struct InvitationCodeCreateDBRequest {
    pub code: String,
    pub inviter_id: UserId,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Database response for a referral code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct InvitationCodeDBResponse {
    pub id: InvitationCodeId,
    pub code: String,
    pub inviter_id: UserId,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InvitationCodeDBResponse {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Database request for recording an invitee against a referral code
#[derive(Debug, Clone)]
pub struct InvitationCreateDBRequest {
    pub invitation_code_id: InvitationCodeId,
    pub inviter_id: UserId,
    pub invited_user_id: UserId,
    pub status: InvitationStatus,
}

/// Database response for an invitation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct InvitationDBResponse {
    pub id: InvitationId,
    pub invitation_code_id: InvitationCodeId,
    pub inviter_id: UserId,
    pub invited_user_id: UserId,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
