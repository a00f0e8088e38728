//! Token transfer, mint and burn collaborator.

use lsm_types::{AccAddress, Amount, Coin, Timestamp};
use thiserror::Error;

use crate::kv::KvStore;
use crate::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error("insufficient funds: {address} has {available}{denom}, needs {needed}{denom}")]
    InsufficientFunds {
        address: AccAddress,
        denom: String,
        needed: Amount,
        available: Amount,
    },

    #[error("supply overflow for {0}")]
    SupplyOverflow(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Moves fungible balances between accounts and pools.
///
/// Balances live in the shared store passed to every call, so bank effects
/// commit or roll back together with the staking state.
pub trait BankKeeper {
    fn balance(&self, store: &dyn KvStore, address: &AccAddress, denom: &str) -> Result<Amount, BankError>;

    fn supply(&self, store: &dyn KvStore, denom: &str) -> Result<Amount, BankError>;

    /// Transfer `coin` between accounts. Vesting restrictions apply to
    /// `from`: only its spendable balance at `now` may be sent.
    fn send(
        &self,
        store: &mut dyn KvStore,
        now: Timestamp,
        from: &AccAddress,
        to: &AccAddress,
        coin: &Coin,
    ) -> Result<(), BankError>;

    fn mint(&self, store: &mut dyn KvStore, to: &AccAddress, coin: &Coin) -> Result<(), BankError>;

    fn burn(&self, store: &mut dyn KvStore, from: &AccAddress, coin: &Coin) -> Result<(), BankError>;

    /// Move coins from a delegator into a staking pool, tracking the
    /// delegation on vesting accounts. Locked coins may be delegated.
    fn delegate_coins(
        &self,
        store: &mut dyn KvStore,
        now: Timestamp,
        delegator: &AccAddress,
        pool: &AccAddress,
        coin: &Coin,
    ) -> Result<(), BankError>;

    /// Return coins from a staking pool to a delegator, tracking the
    /// undelegation on vesting accounts.
    fn undelegate_coins(
        &self,
        store: &mut dyn KvStore,
        pool: &AccAddress,
        delegator: &AccAddress,
        coin: &Coin,
    ) -> Result<(), BankError>;
}
