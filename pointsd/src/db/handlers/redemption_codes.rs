use crate::{
    db::{
        errors::Result,
        models::redemption_codes::{RedemptionCodeCreateDBRequest, RedemptionCodeDBResponse},
    },
    types::{RedemptionCodeId, UserId},
};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

const CODE_COLUMNS: &str = "id, code, code_type, value, is_used, used_by, used_at, expires_at, created_at";

pub struct RedemptionCodes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> RedemptionCodes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn create(&mut self, request: &RedemptionCodeCreateDBRequest) -> Result<RedemptionCodeDBResponse> {
        let code = sqlx::query_as::<_, RedemptionCodeDBResponse>(&format!(
            "INSERT INTO redemption_codes (code, code_type, value, expires_at) VALUES ($1, $2, $3, $4) RETURNING {CODE_COLUMNS}"
        ))
        .bind(&request.code)
        .bind(request.code_type)
        .bind(request.value)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(code)
    }

    pub async fn get_by_code(&mut self, code: &str) -> Result<Option<RedemptionCodeDBResponse>> {
        let code = sqlx::query_as::<_, RedemptionCodeDBResponse>(&format!(
            "SELECT {CODE_COLUMNS} FROM redemption_codes WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(code)
    }

    /// Conditional claim. A concurrent claimer blocks on the row lock and then matches no rows.
    pub async fn claim(&mut self, code_id: RedemptionCodeId, user_id: UserId, now: DateTime<Utc>) -> Result<Option<RedemptionCodeDBResponse>> {
        let code = sqlx::query_as::<_, RedemptionCodeDBResponse>(&format!(
            r#"
            UPDATE redemption_codes
            SET is_used = TRUE, used_by = $2, used_at = $3
            WHERE id = $1 AND is_used = FALSE
            RETURNING {CODE_COLUMNS}
            "#
        ))
        .bind(code_id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(code)
    }
}
