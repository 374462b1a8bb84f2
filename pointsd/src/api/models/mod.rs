pub mod balances;
pub mod charges;
pub mod redemption_codes;
pub mod redemptions;
pub mod referrals;
pub mod transactions;
