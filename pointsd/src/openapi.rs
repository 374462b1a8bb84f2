use utoipa::OpenApi;

use crate::{api, db, errors, ledger, tasks};

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "Points ledger API")
    ),
    paths(
        api::handlers::redemptions::redeem,
        api::handlers::redemption_codes::create_redemption_codes,
        api::handlers::charges::create_charge,
        api::handlers::charges::create_async_charge,
        api::handlers::charges::get_task,
        api::handlers::balances::get_balance,
        api::handlers::balances::reconcile,
        api::handlers::transactions::list_transactions,
        api::handlers::transactions::get_transaction,
        api::handlers::referrals::ensure_invitation_code,
        api::handlers::referrals::register_invitation,
        api::handlers::referrals::get_referral_summary,
        api::handlers::referrals::evaluate_milestones,
    ),
    components(
        schemas(
            errors::ErrorResponse,
            ledger::AwardedType,
            tasks::TaskState,
            db::models::transactions::TransactionType,
            db::models::redemption_codes::RedemptionCodeType,
            db::models::invitations::InvitationStatus,
            api::models::redemptions::RedeemRequest,
            api::models::redemptions::RedeemResponse,
            api::models::redemptions::MilestoneAwardResponse,
            api::models::redemption_codes::RedemptionCodeBatchCreate,
            api::models::redemption_codes::RedemptionCodeResponse,
            api::models::charges::ChargeCreate,
            api::models::charges::ChargeResponse,
            api::models::charges::AsyncChargeResponse,
            api::models::charges::TaskResponse,
            api::models::balances::BalanceResponse,
            api::models::balances::ReconciliationResponse,
            api::models::transactions::TransactionResponse,
            api::models::referrals::InvitationCodeResponse,
            api::models::referrals::RegisterInvitationRequest,
            api::models::referrals::InvitationResponse,
            api::models::referrals::MilestonePayoutResponse,
            api::models::referrals::NextMilestoneResponse,
            api::models::referrals::ReferralSummaryResponse,
            api::models::referrals::MilestoneEvaluationResponse,
        )
    ),
    tags(
        (name = "redemptions", description = "Redemption and referral codes"),
        (name = "charges", description = "Paid provider calls with automatic refunds"),
        (name = "balances", description = "Point balances and ledger reconciliation"),
        (name = "transactions", description = "The append-only transaction log"),
        (name = "referrals", description = "Referral codes, invitations and milestone bonuses"),
    ),
    info(
        title = "pointsd",
        description = "Points ledger and referral reward settlement",
    )
)]
pub struct ApiDoc;
