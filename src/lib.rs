// dreamworld-ledger: virtual economy ledger core.
// conservation-first: every balance change is journaled and committed atomically.
// the price simulator is the only source of randomness and never touches balances.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, Amount, SignedAmount, Price, Bps, Timestamp
//   2.x  clock.rs: Clock trait, system and manual clocks
//   3.x  journal.rs: ledger entries, kinds, references
//   4.x  store/: Store trait, ChangeSet commit, in-memory store
//   5.x  mission.rs: mission catalog, requirements, progress
//   6.x  marketplace.rs: item catalog, inventory
//   7.x  config.rs: grant, staking rates, retry policy, env presets
//   8.x  engine/: transfers, trades, stakes, missions, purchases, read models, audit
//   9.x  session.rs: explicit caller context
//   10.x account.rs: account record, versioned balance
//   11.x staking.rs: stake terms, durations, rates
//   12.x market.rs: instruments, price processes, market board

// money movement
pub mod account;
pub mod engine;
pub mod journal;
pub mod staking;
pub mod store;
pub mod types;

// catalogs and simulation
pub mod market;
pub mod marketplace;
pub mod mission;

// plumbing
pub mod clock;
pub mod config;
pub mod session;

// re exports for convenience
pub use account::*;
pub use clock::*;
pub use config::*;
pub use engine::*;
pub use journal::*;
pub use market::*;
pub use marketplace::*;
pub use mission::*;
pub use session::*;
pub use staking::*;
pub use store::*;
pub use types::*;
