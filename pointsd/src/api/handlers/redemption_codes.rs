use crate::{
    api::models::redemption_codes::{RedemptionCodeBatchCreate, RedemptionCodeResponse, MAX_CODES_PER_REQUEST},
    db::LedgerStore,
    errors::{Error, ErrorResponse, Result},
    AppState,
};
use axum::{extract::State, http::StatusCode, response::Json};

/// Mint single-use redemption codes
#[utoipa::path(
    post,
    path = "/redemption-codes",
    tag = "redemptions",
    summary = "Create redemption codes",
    description = "Mints random single-use codes worth `value` points, days or months of membership.",
    request_body = RedemptionCodeBatchCreate,
    responses(
        (status = 201, description = "Codes created", body = [RedemptionCodeResponse]),
        (status = 400, description = "Invalid value or quantity", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn create_redemption_codes<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(data): Json<RedemptionCodeBatchCreate>,
) -> Result<(StatusCode, Json<Vec<RedemptionCodeResponse>>)> {
    let quantity = data.quantity.unwrap_or(1);
    if !(1..=MAX_CODES_PER_REQUEST).contains(&quantity) {
        return Err(Error::BadRequest {
            message: format!("Quantity must be between 1 and {MAX_CODES_PER_REQUEST}"),
        });
    }

    let codes = state
        .redemptions()
        .create_redemption_codes(data.code_type, data.value, data.expires_at, quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(codes.into_iter().map(RedemptionCodeResponse::from).collect())))
}
