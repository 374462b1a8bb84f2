use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type TransactionId = Uuid;
pub type RedemptionCodeId = Uuid;
pub type InvitationCodeId = Uuid;
pub type InvitationId = Uuid;
pub type MilestoneId = Uuid;
pub type TaskId = Uuid;

/// Point amounts are whole numbers; positive credits, negative debits.
pub type Points = i64;
