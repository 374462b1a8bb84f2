//! In-memory ledger store for tests.
//!
//! A unit of work holds the store-wide lock and mutates a private copy of the state, so
//! commit publishes every write at once and drop discards them, like a serializable transaction.

use crate::{
    db::{
        errors::{DbError, Result},
        models::{
            balances::AccountBalanceDBResponse,
            invitations::{
                InvitationCodeCreateDBRequest, InvitationCodeDBResponse, InvitationCreateDBRequest, InvitationDBResponse, InvitationStatus,
            },
            milestones::{MilestoneDefinitionDBResponse, MilestonePayoutCreateDBRequest, MilestonePayoutDBResponse},
            redemption_codes::{RedemptionCodeCreateDBRequest, RedemptionCodeDBResponse},
            transactions::{TransactionCreateDBRequest, TransactionDBResponse, TransactionType},
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
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex as StdMutex},
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Operations that can be told to fail, to exercise rollback and lost-race paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    SetPoints,
    InsertMilestonePayout,
    Commit,
    /// Appending a REFUND entry
    AppendRefund,
    /// Another unit of work claims the code and commits just before this claim runs
    ClaimRace,
    /// Another unit of work completes the invitation and commits just before this update runs
    CompletionRace,
}

/// Armed fail points. `once` entries disarm after tripping.
#[derive(Debug, Default)]
struct Faults {
    always: HashSet<FailPoint>,
    once: HashSet<FailPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub balances: HashMap<UserId, AccountBalanceDBResponse>,
    pub entries: Vec<TransactionDBResponse>,
    pub redemption_codes: Vec<RedemptionCodeDBResponse>,
    pub invitation_codes: Vec<InvitationCodeDBResponse>,
    pub invitations: Vec<InvitationDBResponse>,
    pub milestones: Vec<MilestoneDefinitionDBResponse>,
    pub payouts: Vec<MilestonePayoutDBResponse>,
}

#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<StdMutex<Faults>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed milestone definitions as `(threshold, bonus_points)` pairs.
    pub async fn with_milestones(self, milestones: &[(i64, Points)]) -> Self {
        {
            let mut state = self.state.lock().await;
            for &(threshold, bonus_points) in milestones {
                state.milestones.push(MilestoneDefinitionDBResponse {
                    id: Uuid::new_v4(),
                    threshold,
                    bonus_points,
                    is_active: true,
                });
            }
        }
        self
    }

    pub fn fail_on(&self, point: FailPoint) {
        self.faults.lock().expect("fault set poisoned").always.insert(point);
    }

    /// Trip `point` on its next use only.
    pub fn fail_once(&self, point: FailPoint) {
        self.faults.lock().expect("fault set poisoned").once.insert(point);
    }

    pub fn clear_fault(&self, point: FailPoint) {
        let mut faults = self.faults.lock().expect("fault set poisoned");
        faults.always.remove(&point);
        faults.once.remove(&point);
    }

    /// Snapshot of committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx {
            guard,
            working,
            faults: self.faults.clone(),
        })
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: Arc<StdMutex<Faults>>,
}

impl MemoryTx {
    fn tripped(&self, point: FailPoint) -> bool {
        let mut faults = self.faults.lock().expect("fault set poisoned");
        faults.once.remove(&point) || faults.always.contains(&point)
    }

    fn check_fault(&self, point: FailPoint) -> Result<()> {
        if self.tripped(point) {
            return Err(DbError::Other(anyhow::anyhow!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn balance_mut(&mut self, user_id: UserId) -> Result<&mut AccountBalanceDBResponse> {
        self.working.balances.get_mut(&user_id).ok_or(DbError::NotFound)
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn commit(mut self) -> Result<()> {
        self.check_fault(FailPoint::Commit)?;
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

#[async_trait]
impl BalanceRepository for MemoryTx {
    async fn get_balance(&mut self, user_id: UserId) -> Result<Option<AccountBalanceDBResponse>> {
        Ok(self.working.balances.get(&user_id).cloned())
    }

    async fn lock_balance(&mut self, user_id: UserId) -> Result<AccountBalanceDBResponse> {
        let balance = self
            .working
            .balances
            .entry(user_id)
            .or_insert_with(|| AccountBalanceDBResponse::empty(user_id, Utc::now()));
        Ok(balance.clone())
    }

    async fn set_points(&mut self, user_id: UserId, points: Points) -> Result<AccountBalanceDBResponse> {
        self.check_fault(FailPoint::SetPoints)?;
        if points < 0 {
            return Err(DbError::CheckViolation {
                constraint: "account_balances_points_non_negative".to_string(),
                table: Some("account_balances".to_string()),
            });
        }
        let balance = self.balance_mut(user_id)?;
        balance.points = points;
        balance.last_updated = Utc::now();
        Ok(balance.clone())
    }

    async fn set_membership(&mut self, user_id: UserId, expires_at: DateTime<Utc>) -> Result<AccountBalanceDBResponse> {
        let balance = self.balance_mut(user_id)?;
        balance.is_member = true;
        balance.membership_expires_at = Some(expires_at);
        balance.last_updated = Utc::now();
        Ok(balance.clone())
    }
}

#[async_trait]
impl TransactionLogRepository for MemoryTx {
    async fn append_entry(&mut self, request: &TransactionCreateDBRequest, balance_after: Points) -> Result<TransactionDBResponse> {
        if request.transaction_type == TransactionType::Refund {
            self.check_fault(FailPoint::AppendRefund)?;
        }
        if !self.working.balances.contains_key(&request.user_id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: "transaction_log_user_id_fkey".to_string(),
                table: Some("transaction_log".to_string()),
            });
        }
        let entry = TransactionDBResponse {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            transaction_type: request.transaction_type,
            amount: request.amount,
            balance_after,
            description: request.description.clone(),
            related_id: request.related_id,
            created_at: Utc::now(),
        };
        self.working.entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_entry(&mut self, transaction_id: TransactionId) -> Result<Option<TransactionDBResponse>> {
        Ok(self.working.entries.iter().find(|e| e.id == transaction_id).cloned())
    }

    async fn list_entries(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<TransactionDBResponse>> {
        Ok(self
            .working
            .entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn sum_entries(&mut self, user_id: UserId) -> Result<Points> {
        Ok(self.working.entries.iter().filter(|e| e.user_id == user_id).map(|e| e.amount).sum())
    }
}

#[async_trait]
impl RedemptionCodeRepository for MemoryTx {
    async fn create_redemption_code(&mut self, request: &RedemptionCodeCreateDBRequest) -> Result<RedemptionCodeDBResponse> {
        if self.working.redemption_codes.iter().any(|c| c.code == request.code) {
            return Err(DbError::UniqueViolation {
                constraint: "redemption_codes_code_key".to_string(),
                table: Some("redemption_codes".to_string()),
            });
        }
        let code = RedemptionCodeDBResponse {
            id: Uuid::new_v4(),
            code: request.code.clone(),
            code_type: request.code_type,
            value: request.value,
            is_used: false,
            used_by: None,
            used_at: None,
            expires_at: request.expires_at,
            created_at: Utc::now(),
        };
        self.working.redemption_codes.push(code.clone());
        Ok(code)
    }

    async fn find_redemption_code(&mut self, code: &str) -> Result<Option<RedemptionCodeDBResponse>> {
        Ok(self.working.redemption_codes.iter().find(|c| c.code == code).cloned())
    }

    async fn claim_redemption_code(
        &mut self,
        code_id: RedemptionCodeId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<RedemptionCodeDBResponse>> {
        if self.tripped(FailPoint::ClaimRace) {
            if let Some(committed) = self.guard.redemption_codes.iter_mut().find(|c| c.id == code_id) {
                committed.is_used = true;
                committed.used_by = Some(Uuid::new_v4());
                committed.used_at = Some(now);
            }
            return Ok(None);
        }
        let Some(code) = self.working.redemption_codes.iter_mut().find(|c| c.id == code_id && !c.is_used) else {
            return Ok(None);
        };
        code.is_used = true;
        code.used_by = Some(user_id);
        code.used_at = Some(now);
        Ok(Some(code.clone()))
    }
}

#[async_trait]
impl InvitationRepository for MemoryTx {
    async fn create_invitation_code(&mut self, request: &InvitationCodeCreateDBRequest) -> Result<InvitationCodeDBResponse> {
        let constraint = if self.working.invitation_codes.iter().any(|c| c.code == request.code) {
            Some("invitation_codes_code_key")
        } else if self.working.invitation_codes.iter().any(|c| c.inviter_id == request.inviter_id) {
            Some("invitation_codes_inviter_id_key")
        } else {
            None
        };
        if let Some(constraint) = constraint {
            return Err(DbError::UniqueViolation {
                constraint: constraint.to_string(),
                table: Some("invitation_codes".to_string()),
            });
        }
        let code = InvitationCodeDBResponse {
            id: Uuid::new_v4(),
            code: request.code.clone(),
            inviter_id: request.inviter_id,
            expires_at: request.expires_at,
            created_at: Utc::now(),
        };
        self.working.invitation_codes.push(code.clone());
        Ok(code)
    }

    async fn find_invitation_code(&mut self, code: &str) -> Result<Option<InvitationCodeDBResponse>> {
        Ok(self.working.invitation_codes.iter().find(|c| c.code == code).cloned())
    }

    async fn find_invitation_code_by_inviter(&mut self, inviter_id: UserId) -> Result<Option<InvitationCodeDBResponse>> {
        Ok(self.working.invitation_codes.iter().find(|c| c.inviter_id == inviter_id).cloned())
    }

    async fn find_invitation(
        &mut self,
        invitation_code_id: InvitationCodeId,
        invited_user_id: UserId,
    ) -> Result<Option<InvitationDBResponse>> {
        Ok(self
            .working
            .invitations
            .iter()
            .find(|i| i.invitation_code_id == invitation_code_id && i.invited_user_id == invited_user_id)
            .cloned())
    }

    async fn insert_invitation(&mut self, request: &InvitationCreateDBRequest) -> Result<Option<InvitationDBResponse>> {
        let exists = self
            .working
            .invitations
            .iter()
            .any(|i| i.invitation_code_id == request.invitation_code_id && i.invited_user_id == request.invited_user_id);
        if exists {
            return Ok(None);
        }
        let now = Utc::now();
        let invitation = InvitationDBResponse {
            id: Uuid::new_v4(),
            invitation_code_id: request.invitation_code_id,
            inviter_id: request.inviter_id,
            invited_user_id: request.invited_user_id,
            status: request.status,
            created_at: now,
            completed_at: (request.status == InvitationStatus::Completed).then_some(now),
        };
        self.working.invitations.push(invitation.clone());
        Ok(Some(invitation))
    }

    async fn complete_invitation(&mut self, invitation_id: InvitationId, now: DateTime<Utc>) -> Result<Option<InvitationDBResponse>> {
        if self.tripped(FailPoint::CompletionRace) {
            if let Some(committed) = self.guard.invitations.iter_mut().find(|i| i.id == invitation_id) {
                committed.status = InvitationStatus::Completed;
                committed.completed_at = Some(now);
            }
            return Ok(None);
        }
        let Some(invitation) = self
            .working
            .invitations
            .iter_mut()
            .find(|i| i.id == invitation_id && i.status == InvitationStatus::Registered)
        else {
            return Ok(None);
        };
        invitation.status = InvitationStatus::Completed;
        invitation.completed_at = Some(now);
        Ok(Some(invitation.clone()))
    }

    async fn count_completed_invitations(&mut self, inviter_id: UserId) -> Result<i64> {
        Ok(self
            .working
            .invitations
            .iter()
            .filter(|i| i.inviter_id == inviter_id && i.status == InvitationStatus::Completed)
            .count() as i64)
    }
}

#[async_trait]
impl MilestoneRepository for MemoryTx {
    async fn list_active_milestones(&mut self, max_threshold: i64) -> Result<Vec<MilestoneDefinitionDBResponse>> {
        let mut milestones: Vec<_> = self
            .working
            .milestones
            .iter()
            .filter(|m| m.is_active && m.threshold <= max_threshold)
            .cloned()
            .collect();
        milestones.sort_by_key(|m| m.threshold);
        Ok(milestones)
    }

    async fn next_milestone(&mut self, count: i64) -> Result<Option<MilestoneDefinitionDBResponse>> {
        Ok(self
            .working
            .milestones
            .iter()
            .filter(|m| m.is_active && m.threshold > count)
            .min_by_key(|m| m.threshold)
            .cloned())
    }

    async fn list_milestone_payouts(&mut self, inviter_id: UserId) -> Result<Vec<MilestonePayoutDBResponse>> {
        Ok(self.working.payouts.iter().filter(|p| p.inviter_id == inviter_id).cloned().collect())
    }

    async fn insert_milestone_payout(&mut self, request: &MilestonePayoutCreateDBRequest) -> Result<Option<MilestonePayoutDBResponse>> {
        self.check_fault(FailPoint::InsertMilestonePayout)?;
        let exists = self
            .working
            .payouts
            .iter()
            .any(|p| p.inviter_id == request.inviter_id && p.milestone_id == request.milestone_id);
        if exists {
            return Ok(None);
        }
        let payout = MilestonePayoutDBResponse {
            id: Uuid::new_v4(),
            inviter_id: request.inviter_id,
            milestone_id: request.milestone_id,
            invitation_count: request.invitation_count,
            bonus_points: request.bonus_points,
            transaction_id: request.transaction_id,
            created_at: Utc::now(),
        };
        self.working.payouts.push(payout.clone());
        Ok(Some(payout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_invitation_code_collisions_name_the_violated_constraint() {
        let store = MemoryLedgerStore::new();
        let inviter_id = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();
        tx.create_invitation_code(&InvitationCodeCreateDBRequest {
            code: "ABCD2345".to_string(),
            inviter_id,
            expires_at: None,
        })
        .await
        .unwrap();

        let same_inviter = tx
            .create_invitation_code(&InvitationCodeCreateDBRequest {
                code: "WXYZ6789".to_string(),
                inviter_id,
                expires_at: None,
            })
            .await;
        match same_inviter {
            Err(DbError::UniqueViolation { constraint, .. }) => assert_eq!(constraint, "invitation_codes_inviter_id_key"),
            other => panic!("Expected UniqueViolation, got {other:?}"),
        }

        let same_code = tx
            .create_invitation_code(&InvitationCodeCreateDBRequest {
                code: "ABCD2345".to_string(),
                inviter_id: Uuid::new_v4(),
                expires_at: None,
            })
            .await;
        match same_code {
            Err(DbError::UniqueViolation { constraint, .. }) => assert_eq!(constraint, "invitation_codes_code_key"),
            other => panic!("Expected UniqueViolation, got {other:?}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_claim_race_commits_the_rival_claim() {
        let store = MemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        let code = tx
            .create_redemption_code(&RedemptionCodeCreateDBRequest {
                code: "RACECODE2345".to_string(),
                code_type: crate::db::models::redemption_codes::RedemptionCodeType::Points,
                value: 10,
                expires_at: None,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        store.fail_once(FailPoint::ClaimRace);
        let mut tx = store.begin().await.unwrap();
        let claimed = tx.claim_redemption_code(code.id, Uuid::new_v4(), Utc::now()).await.unwrap();
        assert!(claimed.is_none());
        drop(tx);

        let state = store.snapshot().await;
        assert!(state.redemption_codes[0].is_used);

        // The next claim attempt sees the committed rival claim
        let mut tx = store.begin().await.unwrap();
        assert!(tx.claim_redemption_code(code.id, Uuid::new_v4(), Utc::now()).await.unwrap().is_none());
        assert!(tx.find_redemption_code("RACECODE2345").await.unwrap().unwrap().is_used);
    }
}
