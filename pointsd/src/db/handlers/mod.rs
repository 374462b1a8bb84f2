pub mod balances;
pub mod invitations;
pub mod milestones;
pub mod redemption_codes;
pub mod task_states;
pub mod transactions;

pub use balances::Balances;
pub use invitations::Invitations;
pub use milestones::Milestones;
pub use redemption_codes::RedemptionCodes;
pub use task_states::TaskStates;
pub use transactions::TransactionLog;
