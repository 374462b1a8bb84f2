use crate::{
    api::models::redemptions::{RedeemRequest, RedeemResponse},
    db::LedgerStore,
    errors::{ErrorResponse, Result},
    AppState,
};
use axum::{extract::State, response::Json};

/// Redeem a code
#[utoipa::path(
    post,
    path = "/redemptions",
    tag = "redemptions",
    summary = "Redeem a code",
    description = "Redeem a single-use redemption code (points or membership) or another user's referral code. \
                   A referral credits the inviter and pays any referral milestones it unlocks.",
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Code redeemed", body = RedeemResponse),
        (status = 400, description = "Own referral code", body = ErrorResponse),
        (status = 404, description = "Unknown code", body = ErrorResponse),
        (status = 409, description = "Code already used, or referral already claimed by this user", body = ErrorResponse),
        (status = 410, description = "Code expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn redeem<S: LedgerStore>(State(state): State<AppState<S>>, Json(data): Json<RedeemRequest>) -> Result<Json<RedeemResponse>> {
    let redemption = state.redemptions().redeem(&data.code, data.user_id).await?;
    Ok(Json(redemption.into()))
}
