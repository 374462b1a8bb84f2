//! Repository interfaces, one per ledger entity, composed into a unit of work.
//!
//! A [`LedgerStore`] opens a [`LedgerTx`]; every write made through the transaction becomes
//! visible atomically on [`LedgerTx::commit`] and is discarded if the transaction is dropped.

use crate::{
    db::{
        errors::Result,
        models::{
            balances::AccountBalanceDBResponse,
            invitations::{InvitationCodeCreateDBRequest, InvitationCodeDBResponse, InvitationCreateDBRequest, InvitationDBResponse},
            milestones::{MilestoneDefinitionDBResponse, MilestonePayoutCreateDBRequest, MilestonePayoutDBResponse},
            redemption_codes::{RedemptionCodeCreateDBRequest, RedemptionCodeDBResponse},
            transactions::{TransactionCreateDBRequest, TransactionDBResponse},
        },
    },
    types::{InvitationCodeId, InvitationId, Points, RedemptionCodeId, TransactionId, UserId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait BalanceRepository {
    /// Fetch a balance without locking it. Users who never touched the ledger have no row.
    async fn get_balance(&mut self, user_id: UserId) -> Result<Option<AccountBalanceDBResponse>>;

    /// Create the balance row if needed and lock it until the unit of work ends.
    async fn lock_balance(&mut self, user_id: UserId) -> Result<AccountBalanceDBResponse>;

    async fn set_points(&mut self, user_id: UserId, points: Points) -> Result<AccountBalanceDBResponse>;

    async fn set_membership(&mut self, user_id: UserId, expires_at: DateTime<Utc>) -> Result<AccountBalanceDBResponse>;
}

#[async_trait]
pub trait TransactionLogRepository {
    async fn append_entry(&mut self, request: &TransactionCreateDBRequest, balance_after: Points) -> Result<TransactionDBResponse>;

    async fn get_entry(&mut self, transaction_id: TransactionId) -> Result<Option<TransactionDBResponse>>;

    /// Newest first
    async fn list_entries(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<TransactionDBResponse>>;

    async fn sum_entries(&mut self, user_id: UserId) -> Result<Points>;
}

#[async_trait]
pub trait RedemptionCodeRepository {
    async fn create_redemption_code(&mut self, request: &RedemptionCodeCreateDBRequest) -> Result<RedemptionCodeDBResponse>;

    async fn find_redemption_code(&mut self, code: &str) -> Result<Option<RedemptionCodeDBResponse>>;

    /// Mark the code used only if it is still unused. `None` means another claim won.
    async fn claim_redemption_code(
        &mut self,
        code_id: RedemptionCodeId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<RedemptionCodeDBResponse>>;
}

#[async_trait]
pub trait InvitationRepository {
    async fn create_invitation_code(&mut self, request: &InvitationCodeCreateDBRequest) -> Result<InvitationCodeDBResponse>;

    async fn find_invitation_code(&mut self, code: &str) -> Result<Option<InvitationCodeDBResponse>>;

    async fn find_invitation_code_by_inviter(&mut self, inviter_id: UserId) -> Result<Option<InvitationCodeDBResponse>>;

    async fn find_invitation(
        &mut self,
        invitation_code_id: InvitationCodeId,
        invited_user_id: UserId,
    ) -> Result<Option<InvitationDBResponse>>;

    /// Insert unless a record already exists for `(invitation_code_id, invited_user_id)`.
    async fn insert_invitation(&mut self, request: &InvitationCreateDBRequest) -> Result<Option<InvitationDBResponse>>;

    /// Move a `registered` invitation to `completed`. `None` if it was not `registered`.
    async fn complete_invitation(&mut self, invitation_id: InvitationId, now: DateTime<Utc>) -> Result<Option<InvitationDBResponse>>;

    async fn count_completed_invitations(&mut self, inviter_id: UserId) -> Result<i64>;
}

#[async_trait]
pub trait MilestoneRepository {
    /// Active definitions with `threshold <= max_threshold`, ascending by threshold
    async fn list_active_milestones(&mut self, max_threshold: i64) -> Result<Vec<MilestoneDefinitionDBResponse>>;

    /// The lowest active definition above `count`, if any
    async fn next_milestone(&mut self, count: i64) -> Result<Option<MilestoneDefinitionDBResponse>>;

    async fn list_milestone_payouts(&mut self, inviter_id: UserId) -> Result<Vec<MilestonePayoutDBResponse>>;

    /// Insert unless the inviter was already paid for this milestone.
    async fn insert_milestone_payout(&mut self, request: &MilestonePayoutCreateDBRequest) -> Result<Option<MilestonePayoutDBResponse>>;
}

/// One atomic unit of work over every ledger repository.
#[async_trait]
pub trait LedgerTx: BalanceRepository + TransactionLogRepository + RedemptionCodeRepository + InvitationRepository + MilestoneRepository + Send {
    async fn commit(self) -> Result<()>;
}

#[async_trait]
pub trait LedgerStore: Clone + Send + Sync + 'static {
    type Tx: LedgerTx;

    async fn begin(&self) -> Result<Self::Tx>;
}
