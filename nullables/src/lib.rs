//! In-memory stand-ins for the staking core's collaborators.
//!
//! The store, bank and account registry implement the real `lsm-store`
//! traits, so tests exercise the same keeper code paths as production. Bank
//! balances live in the shared store, which means a discarded branch rolls
//! them back along with staking state. The clock only moves when told to.

pub mod accounts;
pub mod bank;
pub mod clock;
pub mod store;

pub use accounts::NullAccounts;
pub use bank::NullBank;
pub use clock::NullClock;
pub use store::NullKvStore;
