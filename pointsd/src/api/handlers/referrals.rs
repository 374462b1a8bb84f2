use crate::{
    api::models::{
        redemptions::MilestoneAwardResponse,
        referrals::{InvitationCodeResponse, InvitationResponse, MilestoneEvaluationResponse, ReferralSummaryResponse, RegisterInvitationRequest},
    },
    db::LedgerStore,
    errors::{ErrorResponse, Result},
    types::UserId,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

/// Get or create a user's referral code
#[utoipa::path(
    post,
    path = "/users/{user_id}/invitation-code",
    tag = "referrals",
    summary = "Get or create a referral code",
    description = "Each user has one reusable referral code. It is created on the first call and returned unchanged afterwards.",
    params(
        ("user_id" = String, Path, format = "uuid", description = "Inviter's user ID"),
    ),
    responses(
        (status = 200, description = "The user's referral code", body = InvitationCodeResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn ensure_invitation_code<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<InvitationCodeResponse>> {
    let code = state.redemptions().ensure_invitation_code(user_id).await?;
    Ok(Json(code.into()))
}

/// Record a sign-up made with a referral code
#[utoipa::path(
    post,
    path = "/invitations/register",
    tag = "referrals",
    summary = "Register an invitation",
    description = "Records that a new user signed up with a referral code. The inviter is rewarded once the code is redeemed.",
    request_body = RegisterInvitationRequest,
    responses(
        (status = 201, description = "Invitation registered", body = InvitationResponse),
        (status = 400, description = "Own referral code", body = ErrorResponse),
        (status = 404, description = "Unknown referral code", body = ErrorResponse),
        (status = 409, description = "Already registered with this code", body = ErrorResponse),
        (status = 410, description = "Referral code expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn register_invitation<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(data): Json<RegisterInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>)> {
    let invitation = state.redemptions().register_invitation(&data.code, data.user_id).await?;
    Ok((StatusCode::CREATED, Json(invitation.into())))
}

/// Summarise a user's referrals
#[utoipa::path(
    get,
    path = "/users/{user_id}/referrals",
    tag = "referrals",
    summary = "Get referral progress",
    params(
        ("user_id" = String, Path, format = "uuid", description = "Inviter's user ID"),
    ),
    responses(
        (status = 200, description = "Completed referrals, paid milestones and the next milestone", body = ReferralSummaryResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn get_referral_summary<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ReferralSummaryResponse>> {
    let summary = state.milestones().summary(user_id).await?;
    Ok(Json(summary.into()))
}

/// Pay any referral milestones the user has reached but not been paid for
#[utoipa::path(
    post,
    path = "/users/{user_id}/milestones/evaluate",
    tag = "referrals",
    summary = "Evaluate referral milestones",
    description = "Idempotent: milestones already paid are never paid again.",
    params(
        ("user_id" = String, Path, format = "uuid", description = "Inviter's user ID"),
    ),
    responses(
        (status = 200, description = "Milestones paid by this evaluation", body = MilestoneEvaluationResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn evaluate_milestones<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<MilestoneEvaluationResponse>> {
    let awards = state.milestones().evaluate_and_pay(user_id).await?;
    Ok(Json(MilestoneEvaluationResponse {
        milestones: awards.into_iter().map(MilestoneAwardResponse::from).collect(),
    }))
}
