use crate::{
    db::models::redemption_codes::{RedemptionCodeDBResponse, RedemptionCodeType},
    types::{Points, RedemptionCodeId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Largest batch minted by a single request
pub const MAX_CODES_PER_REQUEST: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedemptionCodeBatchCreate {
    pub code_type: RedemptionCodeType,
    /// Points, days or months depending on `code_type`
    pub value: Points,
    pub expires_at: Option<DateTime<Utc>>,
    /// Number of codes to mint (default 1)
    pub quantity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedemptionCodeResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RedemptionCodeId,
    pub code: String,
    pub code_type: RedemptionCodeType,
    pub value: Points,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<RedemptionCodeDBResponse> for RedemptionCodeResponse {
    fn from(db: RedemptionCodeDBResponse) -> Self {
        Self {
            id: db.id,
            code: db.code,
            code_type: db.code_type,
            value: db.value,
            expires_at: db.expires_at,
            created_at: db.created_at,
        }
    }
}
