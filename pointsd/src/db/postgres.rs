//! Postgres implementation of the ledger repositories.

use crate::{
    db::{
        errors::Result,
        handlers::{Balances, Invitations, Milestones, RedemptionCodes, TransactionLog},
        models::{
            balances::AccountBalanceDBResponse,
            invitations::{InvitationCodeCreateDBRequest, InvitationCodeDBResponse, InvitationCreateDBRequest, InvitationDBResponse},
            milestones::{MilestoneDefinitionDBResponse, MilestonePayoutCreateDBRequest, MilestonePayoutDBResponse},
            redemption_codes::{RedemptionCodeCreateDBRequest, RedemptionCodeDBResponse},
            transactions::{TransactionCreateDBRequest, TransactionDBResponse},
        },
        repository::{
            BalanceRepository, InvitationRepository, LedgerStore, LedgerTx, MilestoneRepository, RedemptionCodeRepository,
            TransactionLogRepository,
        },
    },
    types::{InvitationCodeId, InvitationId, Points, RedemptionCodeId, TransactionId, UserId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<PgLedgerTx> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTx { tx })
    }
}

/// A Postgres transaction. Dropping it without committing rolls every write back.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl BalanceRepository for PgLedgerTx {
    async fn get_balance(&mut self, user_id: UserId) -> Result<Option<AccountBalanceDBResponse>> {
        Balances::new(&mut self.tx).get(user_id).await
    }

    async fn lock_balance(&mut self, user_id: UserId) -> Result<AccountBalanceDBResponse> {
        Balances::new(&mut self.tx).lock_for_update(user_id).await
    }

    async fn set_points(&mut self, user_id: UserId, points: Points) -> Result<AccountBalanceDBResponse> {
        Balances::new(&mut self.tx).set_points(user_id, points).await
    }

    async fn set_membership(&mut self, user_id: UserId, expires_at: DateTime<Utc>) -> Result<AccountBalanceDBResponse> {
        Balances::new(&mut self.tx).set_membership(user_id, expires_at).await
    }
}

#[async_trait]
impl TransactionLogRepository for PgLedgerTx {
    async fn append_entry(&mut self, request: &TransactionCreateDBRequest, balance_after: Points) -> Result<TransactionDBResponse> {
        TransactionLog::new(&mut self.tx).append(request, balance_after).await
    }

    async fn get_entry(&mut self, transaction_id: TransactionId) -> Result<Option<TransactionDBResponse>> {
        TransactionLog::new(&mut self.tx).get_by_id(transaction_id).await
    }

    async fn list_entries(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<TransactionDBResponse>> {
        TransactionLog::new(&mut self.tx).list_for_user(user_id, skip, limit).await
    }

    async fn sum_entries(&mut self, user_id: UserId) -> Result<Points> {
        TransactionLog::new(&mut self.tx).sum_for_user(user_id).await
    }
}

#[async_trait]
impl RedemptionCodeRepository for PgLedgerTx {
    async fn create_redemption_code(&mut self, request: &RedemptionCodeCreateDBRequest) -> Result<RedemptionCodeDBResponse> {
        RedemptionCodes::new(&mut self.tx).create(request).await
    }

    async fn find_redemption_code(&mut self, code: &str) -> Result<Option<RedemptionCodeDBResponse>> {
        RedemptionCodes::new(&mut self.tx).get_by_code(code).await
    }

    async fn claim_redemption_code(
        &mut self,
        code_id: RedemptionCodeId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<RedemptionCodeDBResponse>> {
        RedemptionCodes::new(&mut self.tx).claim(code_id, user_id, now).await
    }
}

#[async_trait]
impl InvitationRepository for PgLedgerTx {
    async fn create_invitation_code(&mut self, request: &InvitationCodeCreateDBRequest) -> Result<InvitationCodeDBResponse> {
        Invitations::new(&mut self.tx).create_code(request).await
    }

    async fn find_invitation_code(&mut self, code: &str) -> Result<Option<InvitationCodeDBResponse>> {
        Invitations::new(&mut self.tx).get_code(code).await
    }

    async fn find_invitation_code_by_inviter(&mut self, inviter_id: UserId) -> Result<Option<InvitationCodeDBResponse>> {
        Invitations::new(&mut self.tx).get_code_by_inviter(inviter_id).await
    }

    async fn find_invitation(
        &mut self,
        invitation_code_id: InvitationCodeId,
        invited_user_id: UserId,
    ) -> Result<Option<InvitationDBResponse>> {
        Invitations::new(&mut self.tx).get(invitation_code_id, invited_user_id).await
    }

    async fn insert_invitation(&mut self, request: &InvitationCreateDBRequest) -> Result<Option<InvitationDBResponse>> {
        Invitations::new(&mut self.tx).insert(request).await
    }

    async fn complete_invitation(&mut self, invitation_id: InvitationId, now: DateTime<Utc>) -> Result<Option<InvitationDBResponse>> {
        Invitations::new(&mut self.tx).complete(invitation_id, now).await
    }

    async fn count_completed_invitations(&mut self, inviter_id: UserId) -> Result<i64> {
        Invitations::new(&mut self.tx).count_completed(inviter_id).await
    }
}

#[async_trait]
impl MilestoneRepository for PgLedgerTx {
    async fn list_active_milestones(&mut self, max_threshold: i64) -> Result<Vec<MilestoneDefinitionDBResponse>> {
        Milestones::new(&mut self.tx).list_active_up_to(max_threshold).await
    }

    async fn next_milestone(&mut self, count: i64) -> Result<Option<MilestoneDefinitionDBResponse>> {
        Milestones::new(&mut self.tx).next_above(count).await
    }

    async fn list_milestone_payouts(&mut self, inviter_id: UserId) -> Result<Vec<MilestonePayoutDBResponse>> {
        Milestones::new(&mut self.tx).list_payouts(inviter_id).await
    }

    async fn insert_milestone_payout(&mut self, request: &MilestonePayoutCreateDBRequest) -> Result<Option<MilestonePayoutDBResponse>> {
        Milestones::new(&mut self.tx).insert_payout(request).await
    }
}
