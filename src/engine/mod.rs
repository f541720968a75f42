// 8.0: ledger engine. the only component that moves money.
// each operation reads the store, plans one change set, and commits it atomically,
// retrying on version conflicts. no balances are cached here.

mod core;
mod missions;
mod purchases;
mod queries;
mod results;
mod session;
mod staking;
mod trading;
mod transfers;

pub use core::Engine;
pub use results::{AuditReport, LeaderboardRow, LedgerError, MissionStatus, Profile, Purchase};
pub use trading::trade_total;
