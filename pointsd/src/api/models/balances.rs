use crate::{
    db::models::balances::AccountBalanceDBResponse,
    types::{Points, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub points: Points,
    pub daily_points: Points,
    pub is_member: bool,
    /// Whether the membership is in force right now
    pub membership_active: bool,
    pub membership_expires_at: Option<DateTime<Utc>>,
}

impl BalanceResponse {
    pub fn new(balance: AccountBalanceDBResponse, now: DateTime<Utc>) -> Self {
        Self {
            user_id: balance.user_id,
            points: balance.points,
            daily_points: balance.daily_points,
            is_member: balance.is_member,
            membership_active: balance.membership_active(now),
            membership_expires_at: balance.membership_expires_at,
        }
    }
}

/// Comparison of the stored balance with the sum of the user's log entries
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconciliationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub points: Points,
    pub entries_sum: Points,
    pub consistent: bool,
}
