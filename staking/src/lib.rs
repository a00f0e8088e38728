//! Liquid staking core.
//!
//! A share-based delegation ledger extended with tokenized delegations,
//! three liquid staking caps, validator bonds, a per-account tokenization
//! lock with a delayed unlock queue, and an epoch queue that batches
//! validator and delegation changes to fixed block boundaries.
//!
//! All state lives in a [`lsm_store::KvStore`] reached through a
//! [`Context`]. Token movement is delegated to a [`lsm_store::BankKeeper`]
//! and account lookups to a [`lsm_store::AccountKeeper`].

pub mod abci;
pub mod config;
pub mod context;
pub mod delegation;
pub mod epoch;
pub mod error;
pub mod events;
pub mod genesis;
pub mod keeper;
pub mod keys;
pub mod ledger;
pub mod liquid_stake;
pub mod lock;
pub mod migrations;
pub mod msg;
pub mod msg_server;
pub mod query;
pub mod tokenize;
pub mod tokenize_share_record;
pub mod validator;
pub mod validator_bond;

#[cfg(test)]
mod testutil;

pub use config::StakingConfig;
pub use context::{BlockHeader, Context};
pub use delegation::{Delegation, Redelegation, RedelegationEntry, UnbondingDelegation, UnbondingDelegationEntry};
pub use error::StakingError;
pub use events::StakingEvent;
pub use genesis::GenesisState;
pub use keeper::Keeper;
pub use ledger::TokenSource;
pub use lock::TokenizeShareLockStatus;
pub use msg::{Msg, MsgResponse};
pub use msg_server::MsgServer;
pub use query::Querier;
pub use tokenize_share_record::TokenizeShareRecord;
pub use validator::{BondStatus, Commission, CommissionRates, Description, Validator};
