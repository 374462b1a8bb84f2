pub mod balances;
pub mod invitations;
pub mod milestones;
pub mod redemption_codes;
pub mod transactions;
