use crate::types::{Points, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database response for a user's account balance row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AccountBalanceDBResponse {
    pub user_id: UserId,
    pub points: Points,
    pub daily_points: Points,
    pub is_member: bool,
    pub membership_expires_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl AccountBalanceDBResponse {
    /// The balance a user has before their first ledger touch.
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            points: 0,
            daily_points: 0,
            is_member: false,
            membership_expires_at: None,
            last_updated: now,
        }
    }

    /// A membership without an expiry never lapses.
    pub fn membership_active(&self, now: DateTime<Utc>) -> bool {
        self.is_member && self.membership_expires_at.map_or(true, |expires_at| expires_at > now)
    }

    /// Expiry after extending the membership by `by`. Extensions stack on top of a still-active
    /// membership and start from `now` otherwise. `None` if the result is not representable.
    pub fn extended_membership(&self, now: DateTime<Utc>, by: Duration) -> Option<DateTime<Utc>> {
        let start = match self.membership_expires_at {
            Some(expires_at) if self.is_member && expires_at > now => expires_at,
            _ => now,
        };
        start.checked_add_signed(by)
    }
}
