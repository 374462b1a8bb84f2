//! Multi-tier referral milestones.
//!
//! Each payout is its own unit of work: the BONUS credit and the payout record commit together,
//! and the `(inviter_id, milestone_id)` uniqueness of payout records makes evaluation idempotent.

use crate::{
    db::{
        models::{
            milestones::{MilestoneDefinitionDBResponse, MilestonePayoutCreateDBRequest, MilestonePayoutDBResponse},
            transactions::{TransactionCreateDBRequest, TransactionType},
        },
        repository::{InvitationRepository, LedgerStore, LedgerTx, MilestoneRepository},
    },
    ledger::{engine, with_conflict_retry, LedgerError},
    types::{MilestoneId, Points, TransactionId, UserId},
};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// A milestone bonus paid by one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneAward {
    pub milestone_id: MilestoneId,
    pub threshold: i64,
    pub bonus_points: Points,
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone)]
pub struct ReferralSummary {
    pub completed_invitations: i64,
    pub paid_milestones: Vec<MilestonePayoutDBResponse>,
    pub next_milestone: Option<MilestoneDefinitionDBResponse>,
}

#[derive(Clone)]
pub struct MilestoneEvaluator<S> {
    store: S,
}

impl<S: LedgerStore> MilestoneEvaluator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Pay every milestone the inviter has reached but not yet been paid for, lowest threshold
    /// first. Safe to call any number of times.
    #[instrument(skip(self), err)]
    pub async fn evaluate_and_pay(&self, inviter_id: UserId) -> Result<Vec<MilestoneAward>, LedgerError> {
        let (count, unpaid) = {
            let mut tx = self.store.begin().await?;
            let count = tx.count_completed_invitations(inviter_id).await?;
            let reached = tx.list_active_milestones(count).await?;
            let paid: HashSet<MilestoneId> = tx
                .list_milestone_payouts(inviter_id)
                .await?
                .into_iter()
                .map(|payout| payout.milestone_id)
                .collect();
            tx.commit().await?;

            let unpaid: Vec<_> = reached.into_iter().filter(|m| !paid.contains(&m.id)).collect();
            (count, unpaid)
        };

        debug!(%inviter_id, count, unpaid = unpaid.len(), "Evaluated referral milestones");

        let mut awards = Vec::with_capacity(unpaid.len());
        for milestone in &unpaid {
            let paid = with_conflict_retry("pay_milestone", move || self.pay_milestone(inviter_id, milestone, count)).await?;
            if let Some(award) = paid {
                info!(%inviter_id, threshold = award.threshold, bonus_points = award.bonus_points, "Paid referral milestone");
                awards.push(award);
            }
        }

        Ok(awards)
    }

    /// Credit and record one payout. `None` if a concurrent evaluation already paid it, in which
    /// case the credit is discarded with the unit of work.
    async fn pay_milestone(
        &self,
        inviter_id: UserId,
        milestone: &MilestoneDefinitionDBResponse,
        count: i64,
    ) -> Result<Option<MilestoneAward>, LedgerError> {
        let mut tx = self.store.begin().await?;

        let credit = TransactionCreateDBRequest::credit(
            inviter_id,
            TransactionType::Bonus,
            milestone.bonus_points,
            format!("Referral milestone: {} invitations", milestone.threshold),
        )
        .related_to(milestone.id);
        let applied = engine::apply(&mut tx, &credit).await?;

        let payout = tx
            .insert_milestone_payout(&MilestonePayoutCreateDBRequest {
                inviter_id,
                milestone_id: milestone.id,
                invitation_count: count,
                bonus_points: milestone.bonus_points,
                transaction_id: applied.transaction_id(),
            })
            .await?;

        let Some(payout) = payout else {
            debug!(%inviter_id, threshold = milestone.threshold, "Milestone already paid, discarding credit");
            return Ok(None);
        };

        tx.commit().await?;

        Ok(Some(MilestoneAward {
            milestone_id: payout.milestone_id,
            threshold: milestone.threshold,
            bonus_points: payout.bonus_points,
            transaction_id: payout.transaction_id,
        }))
    }

    pub async fn summary(&self, inviter_id: UserId) -> Result<ReferralSummary, LedgerError> {
        let mut tx = self.store.begin().await?;
        let completed_invitations = tx.count_completed_invitations(inviter_id).await?;
        let mut paid_milestones = tx.list_milestone_payouts(inviter_id).await?;
        paid_milestones.sort_by_key(|payout| payout.created_at);
        let next_milestone = tx.next_milestone(completed_invitations).await?;
        tx.commit().await?;

        Ok(ReferralSummary {
            completed_invitations,
            paid_milestones,
            next_milestone,
        })
    }
}
