//! Redemption of single-use codes and reusable referral codes.

use crate::{
    db::{
        errors::DbError,
        models::{
            invitations::{InvitationCodeCreateDBRequest, InvitationCodeDBResponse, InvitationCreateDBRequest, InvitationDBResponse, InvitationStatus},
            redemption_codes::{RedemptionCodeCreateDBRequest, RedemptionCodeDBResponse, RedemptionCodeType},
            transactions::{TransactionCreateDBRequest, TransactionType},
        },
        repository::{BalanceRepository, InvitationRepository, LedgerStore, LedgerTx, RedemptionCodeRepository},
    },
    ledger::{
        codes::{generate_code, INVITATION_CODE_LENGTH, REDEMPTION_CODE_LENGTH},
        engine,
        milestones::{MilestoneAward, MilestoneEvaluator},
        with_conflict_retry, LedgerError,
    },
    types::{Points, UserId},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

/// Days credited per month of a `membership` code
pub const DAYS_PER_MEMBERSHIP_MONTH: i64 = 30;

/// Attempts at drawing an unused random code before giving up
const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AwardedType {
    Points,
    MembershipDays,
    Membership,
    ReferralBonus,
}

impl From<RedemptionCodeType> for AwardedType {
    fn from(code_type: RedemptionCodeType) -> Self {
        match code_type {
            RedemptionCodeType::Points => AwardedType::Points,
            RedemptionCodeType::MembershipDays => AwardedType::MembershipDays,
            RedemptionCodeType::Membership => AwardedType::Membership,
        }
    }
}

/// Result of a successful redemption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub awarded_type: AwardedType,
    pub awarded_value: Points,
    /// The redeeming user's balance after the redemption
    pub new_balance: Points,
    pub membership_expires_at: Option<DateTime<Utc>>,
    /// Milestones the referral pushed the inviter over
    pub milestones: Vec<MilestoneAward>,
}

/// What the committed unit of work did, before milestone evaluation.
struct Settled {
    redemption: Redemption,
    inviter_id: Option<UserId>,
}

#[derive(Clone)]
pub struct RedemptionService<S> {
    store: S,
    milestones: MilestoneEvaluator<S>,
    referral_reward: Points,
}

impl<S: LedgerStore> RedemptionService<S> {
    pub fn new(store: S, referral_reward: Points) -> Self {
        Self {
            milestones: MilestoneEvaluator::new(store.clone()),
            store,
            referral_reward,
        }
    }

    /// Redeem a single-use code or a referral code for `user_id`.
    ///
    /// Single-use codes are looked up first. A referral is committed before the inviter's
    /// milestones are evaluated; if that evaluation fails the referral still stands and the
    /// evaluation can be re-run later.
    #[instrument(skip(self, code), err)]
    pub async fn redeem(&self, code: &str, user_id: UserId) -> Result<Redemption, LedgerError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LedgerError::CodeNotFound);
        }

        let now = Utc::now();
        let settled = with_conflict_retry("redeem", move || self.try_redeem(code, user_id, now)).await?;
        let mut redemption = settled.redemption;

        if let Some(inviter_id) = settled.inviter_id {
            match self.milestones.evaluate_and_pay(inviter_id).await {
                Ok(awards) => redemption.milestones = awards,
                Err(e) => warn!(%inviter_id, error = %e, "Milestone evaluation failed after referral was committed"),
            }
        }

        Ok(redemption)
    }

    async fn try_redeem(&self, code: &str, user_id: UserId, now: DateTime<Utc>) -> Result<Settled, LedgerError> {
        let mut tx = self.store.begin().await?;

        let settled = if let Some(redemption_code) = tx.find_redemption_code(code).await? {
            Settled {
                redemption: Self::redeem_single_use(&mut tx, redemption_code, user_id, now).await?,
                inviter_id: None,
            }
        } else if let Some(invitation_code) = tx.find_invitation_code(code).await? {
            let inviter_id = invitation_code.inviter_id;
            Settled {
                redemption: self.redeem_referral(&mut tx, invitation_code, user_id, now).await?,
                inviter_id: Some(inviter_id),
            }
        } else {
            return Err(LedgerError::CodeNotFound);
        };

        tx.commit().await?;
        Ok(settled)
    }

    async fn redeem_single_use(
        tx: &mut S::Tx,
        code: RedemptionCodeDBResponse,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Redemption, LedgerError> {
        if code.is_expired(now) {
            return Err(LedgerError::CodeExpired);
        }
        if code.is_used {
            return Err(LedgerError::CodeAlreadyUsed);
        }

        if tx.claim_redemption_code(code.id, user_id, now).await?.is_none() {
            debug!(code_id = %code.id, "Lost race claiming redemption code");
            return Err(LedgerError::StorageConflict);
        }

        let redemption = match code.code_type {
            RedemptionCodeType::Points => {
                let credit = TransactionCreateDBRequest::credit(user_id, TransactionType::Redeem, code.value, "Redeemed points code").related_to(code.id);
                let applied = engine::apply(tx, &credit).await?;
                Redemption {
                    awarded_type: AwardedType::Points,
                    awarded_value: code.value,
                    new_balance: applied.new_balance,
                    membership_expires_at: None,
                    milestones: Vec::new(),
                }
            }
            RedemptionCodeType::MembershipDays | RedemptionCodeType::Membership => {
                let extension = membership_extension(code.code_type, code.value)?;
                let balance = tx.lock_balance(user_id).await?;
                let expires_at = balance
                    .extended_membership(now, extension)
                    .ok_or_else(|| LedgerError::InvalidAmount(format!("membership length {} is out of range", code.value)))?;
                let balance = tx.set_membership(user_id, expires_at).await?;
                Redemption {
                    awarded_type: code.code_type.into(),
                    awarded_value: code.value,
                    new_balance: balance.points,
                    membership_expires_at: balance.membership_expires_at,
                    milestones: Vec::new(),
                }
            }
        };

        info!(%user_id, code_id = %code.id, code_type = ?code.code_type, value = code.value, "Redeemed code");
        Ok(redemption)
    }

    async fn redeem_referral(
        &self,
        tx: &mut S::Tx,
        code: InvitationCodeDBResponse,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Redemption, LedgerError> {
        if code.is_expired(now) {
            return Err(LedgerError::CodeExpired);
        }
        if code.inviter_id == user_id {
            return Err(LedgerError::SelfReferralNotAllowed);
        }

        let invitation = match tx.find_invitation(code.id, user_id).await? {
            Some(existing) if existing.status == InvitationStatus::Completed => return Err(LedgerError::AlreadyClaimed),
            Some(registered) => tx
                .complete_invitation(registered.id, now)
                .await?
                .ok_or(LedgerError::StorageConflict)?,
            None => tx
                .insert_invitation(&InvitationCreateDBRequest {
                    invitation_code_id: code.id,
                    inviter_id: code.inviter_id,
                    invited_user_id: user_id,
                    status: InvitationStatus::Completed,
                })
                .await?
                .ok_or(LedgerError::AlreadyClaimed)?,
        };

        let credit = TransactionCreateDBRequest::credit(code.inviter_id, TransactionType::Bonus, self.referral_reward, "Referral reward")
            .related_to(invitation.id);
        engine::apply(tx, &credit).await?;

        let balance = tx.get_balance(user_id).await?;
        info!(inviter_id = %code.inviter_id, invited_user_id = %user_id, reward = self.referral_reward, "Referral completed");

        Ok(Redemption {
            awarded_type: AwardedType::ReferralBonus,
            awarded_value: self.referral_reward,
            new_balance: balance.as_ref().map_or(0, |b| b.points),
            membership_expires_at: balance.and_then(|b| b.membership_expires_at),
            milestones: Vec::new(),
        })
    }

    /// Record that `user_id` signed up with a referral code. The inviter is rewarded when the
    /// code is later redeemed.
    #[instrument(skip(self, code), err)]
    pub async fn register_invitation(&self, code: &str, user_id: UserId) -> Result<InvitationDBResponse, LedgerError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let code = tx.find_invitation_code(code.trim()).await?.ok_or(LedgerError::CodeNotFound)?;
        if code.is_expired(now) {
            return Err(LedgerError::CodeExpired);
        }
        if code.inviter_id == user_id {
            return Err(LedgerError::SelfReferralNotAllowed);
        }

        let invitation = tx
            .insert_invitation(&InvitationCreateDBRequest {
                invitation_code_id: code.id,
                inviter_id: code.inviter_id,
                invited_user_id: user_id,
                status: InvitationStatus::Registered,
            })
            .await?
            .ok_or(LedgerError::AlreadyClaimed)?;

        tx.commit().await?;
        Ok(invitation)
    }

    /// The inviter's referral code, created on first request.
    #[instrument(skip(self), err)]
    pub async fn ensure_invitation_code(&self, inviter_id: UserId) -> Result<InvitationCodeDBResponse, LedgerError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            if let Some(existing) = tx.find_invitation_code_by_inviter(inviter_id).await? {
                return Ok(existing);
            }

            let request = InvitationCodeCreateDBRequest {
                code: generate_code(INVITATION_CODE_LENGTH),
                inviter_id,
                expires_at: None,
            };
            match tx.create_invitation_code(&request).await {
                Ok(created) => {
                    tx.commit().await?;
                    return Ok(created);
                }
                // Either the random code was taken or a concurrent request created this
                // inviter's code; the next attempt finds out which.
                Err(DbError::UniqueViolation { constraint, .. }) => {
                    debug!(constraint, "Invitation code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DbError::Other(anyhow::anyhow!("could not allocate a unique invitation code")).into())
    }

    /// Mint `quantity` random single-use codes.
    #[instrument(skip(self), err)]
    pub async fn create_redemption_codes(
        &self,
        code_type: RedemptionCodeType,
        value: Points,
        expires_at: Option<DateTime<Utc>>,
        quantity: usize,
    ) -> Result<Vec<RedemptionCodeDBResponse>, LedgerError> {
        membership_extension(code_type, value)?;
        if value <= 0 {
            return Err(LedgerError::InvalidAmount(format!("code value must be positive, got {value}")));
        }

        let mut created = Vec::with_capacity(quantity);
        for _ in 0..quantity {
            created.push(self.create_unique_redemption_code(code_type, value, expires_at).await?);
        }
        info!(?code_type, value, quantity, "Created redemption codes");
        Ok(created)
    }

    async fn create_unique_redemption_code(
        &self,
        code_type: RedemptionCodeType,
        value: Points,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<RedemptionCodeDBResponse, LedgerError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let mut tx = self.store.begin().await?;
            let request = RedemptionCodeCreateDBRequest {
                code: generate_code(REDEMPTION_CODE_LENGTH),
                code_type,
                value,
                expires_at,
            };
            match tx.create_redemption_code(&request).await {
                Ok(created) => {
                    tx.commit().await?;
                    return Ok(created);
                }
                Err(DbError::UniqueViolation { .. }) => debug!("Redemption code collision, retrying"),
                Err(e) => return Err(e.into()),
            }
        }
        Err(DbError::Other(anyhow::anyhow!("could not allocate a unique redemption code")).into())
    }
}

/// How far a membership code extends membership. Points codes extend nothing.
fn membership_extension(code_type: RedemptionCodeType, value: Points) -> Result<Duration, LedgerError> {
    let days = match code_type {
        RedemptionCodeType::Points => return Ok(Duration::zero()),
        RedemptionCodeType::MembershipDays => Some(value),
        RedemptionCodeType::Membership => value.checked_mul(DAYS_PER_MEMBERSHIP_MONTH),
    };
    days.filter(|days| *days > 0)
        .and_then(Duration::try_days)
        .ok_or_else(|| LedgerError::InvalidAmount(format!("invalid membership length {value} for {code_type:?}")))
}
