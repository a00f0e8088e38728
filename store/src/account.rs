//! Account registry collaborator.

use lsm_types::{AccAddress, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::kv::KvStore;
use crate::StoreError;

/// Lock-up state of a delayed vesting account. All amounts are in the bond
/// denomination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingState {
    /// Coins locked until `end_time`.
    pub original_vesting: Amount,
    pub end_time: Timestamp,
    /// Delegated coins that were spendable when delegated.
    pub delegated_free: Amount,
    /// Delegated coins that were still vesting when delegated.
    pub delegated_vesting: Amount,
}

impl VestingState {
    /// Coins still locked at `now`.
    pub fn vesting_amount(&self, now: Timestamp) -> Amount {
        if now < self.end_time {
            self.original_vesting
        } else {
            Amount::ZERO
        }
    }

    /// Record a delegation of `amount` from an account holding `balance`
    /// (before the delegation). Locked coins are used first.
    pub fn track_delegation(&mut self, now: Timestamp, balance: Amount, amount: Amount) {
        let vesting = self.vesting_amount(now);
        let locked_unused = vesting.saturating_sub(self.delegated_vesting);
        let from_vesting = locked_unused.min(amount).min(balance);
        self.delegated_vesting += from_vesting;
        self.delegated_free += amount - from_vesting;
    }

    /// Record an undelegation of `amount`. Free delegations are released first.
    pub fn track_undelegation(&mut self, amount: Amount) {
        let from_free = self.delegated_free.min(amount);
        self.delegated_free -= from_free;
        let from_vesting = self.delegated_vesting.min(amount - from_free);
        self.delegated_vesting -= from_vesting;
    }

    /// Delegated coins that are no longer subject to vesting at `now`: the
    /// free delegations plus any vesting delegations that have since vested.
    pub fn free_delegated(&self, now: Timestamp) -> Amount {
        let vested_delegations = self.delegated_vesting.saturating_sub(self.vesting_amount(now));
        self.delegated_free + vested_delegations
    }

    /// Coins of `balance` that may be spent at `now`.
    pub fn spendable(&self, now: Timestamp, balance: Amount) -> Amount {
        let locked = self.vesting_amount(now).saturating_sub(self.delegated_vesting);
        balance.saturating_sub(locked)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    /// Key-controlled end-user account.
    Base,
    /// Protocol-owned account with no signing key.
    Module { name: String },
    /// Account controlled from another chain.
    Interchain,
    /// Key-controlled account with delayed vesting.
    Vesting(VestingState),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: AccAddress,
    pub kind: AccountKind,
}

impl Account {
    pub fn base(address: AccAddress) -> Self {
        Self {
            address,
            kind: AccountKind::Base,
        }
    }

    pub fn module(name: &str) -> Self {
        Self {
            address: AccAddress::module(name),
            kind: AccountKind::Module { name: name.to_string() },
        }
    }

    pub fn module_name(&self) -> Option<&str> {
        match &self.kind {
            AccountKind::Module { name } => Some(name),
            _ => None,
        }
    }

    pub fn vesting(&self) -> Option<&VestingState> {
        match &self.kind {
            AccountKind::Vesting(v) => Some(v),
            _ => None,
        }
    }

    /// Whether the account is controlled by a program rather than a key.
    pub fn is_automated(&self) -> bool {
        matches!(self.kind, AccountKind::Module { .. } | AccountKind::Interchain)
    }
}

/// Resolves, classifies, creates and removes accounts.
///
/// State lives in the shared store so that it participates in the same
/// atomic overlays as the staking state.
pub trait AccountKeeper {
    fn get_account(&self, store: &dyn KvStore, address: &AccAddress) -> Result<Option<Account>, StoreError>;

    fn set_account(&self, store: &mut dyn KvStore, account: &Account) -> Result<(), StoreError>;

    fn remove_account(&self, store: &mut dyn KvStore, address: &AccAddress) -> Result<(), StoreError>;

    /// Create (or overwrite) the module account called `name`.
    fn new_module_account(&self, store: &mut dyn KvStore, name: &str) -> Result<Account, StoreError> {
        let account = Account::module(name);
        self.set_account(store, &account)?;
        Ok(account)
    }

    fn all_accounts(&self, store: &dyn KvStore) -> Result<Vec<Account>, StoreError>;
}
