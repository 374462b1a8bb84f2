pub mod errors;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

pub use postgres::PgLedgerStore;
pub use repository::{LedgerStore, LedgerTx};
