use crate::types::{Points, RedemptionCodeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// What a single-use redemption code grants, stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RedemptionCodeType {
    /// `value` points credited to the redeemer
    Points,
    /// Membership extended by `value` days
    MembershipDays,
    /// Membership extended by `value` months of 30 days
    Membership,
}

/// Database request for creating a redemption code
#[derive(Debug, Clone)]
pub struct RedemptionCodeCreateDBRequest {
    pub code: String,
    pub code_type: RedemptionCodeType,
    pub value: Points,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Database response for a redemption code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RedemptionCodeDBResponse {
    pub id: RedemptionCodeId,
    pub code: String,
    pub code_type: RedemptionCodeType,
    pub value: Points,
    pub is_used: bool,
    pub used_by: Option<UserId>,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RedemptionCodeDBResponse {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
