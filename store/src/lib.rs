//! Storage abstraction for the liquid staking core.
//!
//! All ledger state lives in one ordered key-value store. The staking core
//! and its collaborators (bank, account registry) read and write through the
//! [`KvStore`] trait, so a [`CacheStore`] overlay makes any sequence of
//! operations atomic: the overlay's writes are applied to the parent only on
//! success and simply dropped otherwise.

pub mod account;
pub mod bank;
pub mod cache;
pub mod codec;
pub mod error;
pub mod kv;

pub use account::{Account, AccountKeeper, AccountKind, VestingState};
pub use bank::{BankError, BankKeeper};
pub use cache::CacheStore;
pub use error::StoreError;
pub use kv::{prefix_end, KvStore, Writes};
