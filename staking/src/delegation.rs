//! Delegations and the unbonding/redelegation entries that mature later.

use lsm_types::{AccAddress, Amount, Dec, Timestamp, ValAddress};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub shares: Dec,
    /// Counts towards the validator's bond shares.
    pub validator_bond: bool,
}

impl Delegation {
    pub fn new(delegator: AccAddress, validator: ValAddress, shares: Dec, validator_bond: bool) -> Self {
        Self {
            delegator,
            validator,
            shares,
            validator_bond,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegationEntry {
    pub creation_height: u64,
    pub completion_time: Timestamp,
    pub initial_balance: Amount,
    pub balance: Amount,
}

impl UnbondingDelegationEntry {
    pub fn is_mature(&self, now: Timestamp) -> bool {
        self.completion_time <= now
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegation {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub entries: Vec<UnbondingDelegationEntry>,
}

impl UnbondingDelegation {
    pub fn new(delegator: AccAddress, validator: ValAddress) -> Self {
        Self {
            delegator,
            validator,
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, creation_height: u64, completion_time: Timestamp, balance: Amount) {
        self.entries.push(UnbondingDelegationEntry {
            creation_height,
            completion_time,
            initial_balance: balance,
            balance,
        });
    }

    /// Remove every entry mature at `now` and return their summed balance.
    pub fn take_mature(&mut self, now: Timestamp) -> Amount {
        let (mature, pending): (Vec<_>, Vec<_>) = self.entries.drain(..).partition(|e| e.is_mature(now));
        self.entries = pending;
        mature.iter().map(|e| e.balance).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedelegationEntry {
    pub creation_height: u64,
    pub completion_time: Timestamp,
    pub initial_balance: Amount,
    pub shares_dst: Dec,
}

impl RedelegationEntry {
    pub fn is_mature(&self, now: Timestamp) -> bool {
        self.completion_time <= now
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redelegation {
    pub delegator: AccAddress,
    pub src_validator: ValAddress,
    pub dst_validator: ValAddress,
    pub entries: Vec<RedelegationEntry>,
}

impl Redelegation {
    pub fn new(delegator: AccAddress, src_validator: ValAddress, dst_validator: ValAddress) -> Self {
        Self {
            delegator,
            src_validator,
            dst_validator,
            entries: Vec::new(),
        }
    }

    pub fn add_entry(
        &mut self,
        creation_height: u64,
        completion_time: Timestamp,
        balance: Amount,
        shares_dst: Dec,
    ) {
        self.entries.push(RedelegationEntry {
            creation_height,
            completion_time,
            initial_balance: balance,
            shares_dst,
        });
    }

    pub fn remove_mature(&mut self, now: Timestamp) {
        self.entries.retain(|e| !e.is_mature(now));
    }
}

/// Delegator/validator pair stored in the unbonding queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvPair {
    pub delegator: AccAddress,
    pub validator: ValAddress,
}

/// Delegator/source/destination triplet stored in the redelegation queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvvTriplet {
    pub delegator: AccAddress,
    pub src_validator: ValAddress,
    pub dst_validator: ValAddress,
}
