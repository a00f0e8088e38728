//! Genesis import and export.
//!
//! A [`GenesisState`] captures every piece of staking state: the ledger,
//! the liquid counters, tokenize-share records, locks with their pending
//! unlock buckets, and the epoch queue. Maturity queues are not exported;
//! they are rebuilt from the unbonding and redelegation entries on import.

use std::collections::{BTreeMap, BTreeSet};

use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{AccAddress, Amount, Params, Timestamp};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::delegation::{Delegation, DvPair, DvvTriplet, Redelegation, UnbondingDelegation};
use crate::epoch::QueuedEpochAction;
use crate::error::StakingError;
use crate::keeper::Keeper;
use crate::lock::TokenizeShareLockStatus;
use crate::tokenize_share_record::TokenizeShareRecord;
use crate::validator::Validator;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeShareLock {
    pub address: AccAddress,
    pub status: TokenizeShareLockStatus,
}

/// Addresses whose locks expire at `unlock_time`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTokenizeShareAuthorizations {
    pub unlock_time: Timestamp,
    pub addresses: Vec<AccAddress>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    pub params: Params,
    pub validators: Vec<Validator>,
    pub delegations: Vec<Delegation>,
    pub unbonding_delegations: Vec<UnbondingDelegation>,
    pub redelegations: Vec<Redelegation>,
    pub tokenize_share_records: Vec<TokenizeShareRecord>,
    pub last_tokenize_share_record_id: u64,
    pub total_liquid_staked_tokens: Amount,
    pub tokenize_share_locks: Vec<TokenizeShareLock>,
    pub pending_tokenize_share_authorizations: Vec<PendingTokenizeShareAuthorizations>,
    pub epoch_number: u64,
    pub next_epoch_action_id: u64,
    pub epoch_actions: Vec<QueuedEpochAction>,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            params: Params::default(),
            validators: Vec::new(),
            delegations: Vec::new(),
            unbonding_delegations: Vec::new(),
            redelegations: Vec::new(),
            tokenize_share_records: Vec::new(),
            last_tokenize_share_record_id: 0,
            total_liquid_staked_tokens: Amount::ZERO,
            tokenize_share_locks: Vec::new(),
            pending_tokenize_share_authorizations: Vec::new(),
            epoch_number: 0,
            next_epoch_action_id: 1,
            epoch_actions: Vec::new(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> StakingError {
    StakingError::InvalidGenesis(msg.into())
}

impl GenesisState {
    pub fn from_json(json: &str) -> Result<Self, StakingError> {
        serde_json::from_str(json).map_err(|e| invalid(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, StakingError> {
        serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))
    }

    /// Check the state is internally consistent.
    pub fn validate(&self) -> Result<(), StakingError> {
        self.params.validate()?;

        let mut operators = BTreeSet::new();
        let mut pubkeys = BTreeSet::new();
        for v in &self.validators {
            if !operators.insert(v.operator.clone()) {
                return Err(invalid(format!("duplicate validator {}", v.operator)));
            }
            if !pubkeys.insert(v.consensus_pubkey.clone()) {
                return Err(invalid(format!("duplicate consensus pubkey {}", v.consensus_pubkey)));
            }
            if v.delegator_shares.is_negative() || v.total_liquid_shares > v.delegator_shares {
                return Err(invalid(format!("validator {} has inconsistent shares", v.operator)));
            }
            v.description.ensure_length()?;
            v.commission.rates.validate()?;
        }

        for d in &self.delegations {
            if !operators.contains(&d.validator) {
                return Err(invalid(format!("delegation to unknown validator {}", d.validator)));
            }
            if !d.shares.is_positive() {
                return Err(invalid(format!("delegation from {} has no shares", d.delegator)));
            }
        }

        let mut ids = BTreeSet::new();
        for r in &self.tokenize_share_records {
            if !ids.insert(r.id) {
                return Err(invalid(format!("duplicate tokenize share record {}", r.id)));
            }
            if r.id > self.last_tokenize_share_record_id {
                return Err(invalid(format!("tokenize share record {} is past the last id", r.id)));
            }
        }

        // every pending address must be expiring at its bucket's time
        let locks: BTreeMap<_, _> = self
            .tokenize_share_locks
            .iter()
            .map(|l| (l.address.clone(), l.status))
            .collect();
        for bucket in &self.pending_tokenize_share_authorizations {
            for address in &bucket.addresses {
                if locks.get(address) != Some(&TokenizeShareLockStatus::LockExpiring(bucket.unlock_time)) {
                    return Err(invalid(format!("pending authorization for {address} has no matching lock")));
                }
            }
        }

        if let Some(action) = self
            .epoch_actions
            .iter()
            .find(|a| a.action_id >= self.next_epoch_action_id)
        {
            return Err(invalid(format!(
                "epoch action {} is not below the next action id",
                action.action_id
            )));
        }
        Ok(())
    }
}

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    /// Load `state` into an empty store.
    pub fn init_genesis(&self, ctx: &mut Context<'_>, state: &GenesisState) -> Result<(), StakingError> {
        state.validate()?;
        self.ensure_module_accounts(ctx)?;
        self.set_params(ctx, &state.params)?;

        for validator in &state.validators {
            self.set_validator(ctx, validator)?;
            self.set_validator_by_cons(ctx, validator)?;
        }
        for delegation in &state.delegations {
            self.set_delegation(ctx, delegation)?;
        }

        for ubd in &state.unbonding_delegations {
            self.set_unbonding_delegation(ctx, ubd)?;
            for entry in &ubd.entries {
                let pair = DvPair {
                    delegator: ubd.delegator.clone(),
                    validator: ubd.validator.clone(),
                };
                self.insert_unbonding_queue(ctx, pair, entry.completion_time)?;
            }
        }
        for red in &state.redelegations {
            self.set_redelegation(ctx, red)?;
            for entry in &red.entries {
                let triplet = DvvTriplet {
                    delegator: red.delegator.clone(),
                    src_validator: red.src_validator.clone(),
                    dst_validator: red.dst_validator.clone(),
                };
                self.insert_redelegation_queue(ctx, triplet, entry.completion_time)?;
            }
        }

        for record in &state.tokenize_share_records {
            self.add_tokenize_share_record(ctx, record)?;
            if self.accounts().get_account(ctx.store(), &record.module_address())?.is_none() {
                self.accounts()
                    .new_module_account(ctx.store_mut(), &record.module_account)?;
            }
        }
        self.set_last_tokenize_share_record_id(ctx, state.last_tokenize_share_record_id)?;
        self.set_total_liquid_staked_tokens(ctx, state.total_liquid_staked_tokens)?;

        for lock in &state.tokenize_share_locks {
            match lock.status {
                TokenizeShareLockStatus::Locked => self.add_tokenize_shares_lock(ctx, &lock.address)?,
                TokenizeShareLockStatus::LockExpiring(t) => {
                    self.set_tokenize_shares_unlock_time(ctx, &lock.address, t)?
                }
                TokenizeShareLockStatus::Unlocked => {}
            }
        }
        for bucket in &state.pending_tokenize_share_authorizations {
            self.set_pending_tokenize_share_authorizations(ctx, bucket.unlock_time, &bucket.addresses)?;
        }

        self.set_epoch_number(ctx, state.epoch_number)?;
        self.set_next_epoch_action_id(ctx, state.next_epoch_action_id)?;
        for action in &state.epoch_actions {
            self.set_epoch_action(ctx, action)?;
        }

        tracing::info!(
            validators = state.validators.len(),
            delegations = state.delegations.len(),
            records = state.tokenize_share_records.len(),
            total_liquid_staked = %state.total_liquid_staked_tokens,
            "staking genesis initialised"
        );
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState, StakingError> {
        Ok(GenesisState {
            params: self.params(ctx)?,
            validators: self.all_validators(ctx)?,
            delegations: self.all_delegations(ctx)?,
            unbonding_delegations: self.all_unbonding_delegations(ctx)?,
            redelegations: self.all_redelegations(ctx)?,
            tokenize_share_records: self.all_tokenize_share_records(ctx)?,
            last_tokenize_share_record_id: self.last_tokenize_share_record_id(ctx)?,
            total_liquid_staked_tokens: self.total_liquid_staked_tokens(ctx)?,
            tokenize_share_locks: self
                .all_tokenize_share_locks(ctx)?
                .into_iter()
                .map(|(address, status)| TokenizeShareLock { address, status })
                .collect(),
            pending_tokenize_share_authorizations: self
                .all_pending_tokenize_share_authorizations(ctx)?
                .into_iter()
                .map(|(unlock_time, addresses)| PendingTokenizeShareAuthorizations { unlock_time, addresses })
                .collect(),
            epoch_number: self.epoch_number(ctx)?,
            next_epoch_action_id: self.next_epoch_action_id(ctx)?,
            epoch_actions: self.all_epoch_actions(ctx)?,
        })
    }
}
