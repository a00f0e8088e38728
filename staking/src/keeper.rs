//! The staking keeper: typed access to validators, delegations, queues and
//! pools, plus the collaborators it drives.
//!
//! The keeper itself is stateless. Every method takes the [`Context`] whose
//! store holds the ledger, so the same keeper serves committed state, cache
//! branches and simulations alike. Operations are split across modules by
//! concern; this one holds storage plumbing and classification.

use lsm_store::codec::{decode, get_value, prefix_values, set_value};
use lsm_store::{AccountKeeper, BankKeeper, KvStore};
use lsm_types::{AccAddress, Amount, Params, Timestamp, ValAddress};

use crate::context::Context;
use crate::delegation::{Delegation, DvPair, DvvTriplet, Redelegation, UnbondingDelegation};
use crate::error::StakingError;
use crate::keys;
use crate::validator::{BondStatus, Validator};

pub const BONDED_POOL_NAME: &str = "bonded_tokens_pool";
pub const NOT_BONDED_POOL_NAME: &str = "not_bonded_tokens_pool";
pub const EPOCH_DELEGATION_POOL_NAME: &str = "epoch_delegation_pool";

/// Module-name prefix of every tokenize-share custodian account.
pub const TOKENIZE_SHARE_MODULE_PREFIX: &str = "tokenizeshare_";

pub struct Keeper<B, A> {
    bank: B,
    accounts: A,
}

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    pub fn new(bank: B, accounts: A) -> Self {
        Self { bank, accounts }
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn accounts(&self) -> &A {
        &self.accounts
    }

    // ── Params ──────────────────────────────────────────────────────────

    pub fn params(&self, ctx: &Context<'_>) -> Result<Params, StakingError> {
        Ok(get_value(ctx.store(), keys::PARAMS_KEY)?.unwrap_or_default())
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &Params) -> Result<(), StakingError> {
        params.validate()?;
        set_value(ctx.store_mut(), keys::PARAMS_KEY, params)?;
        Ok(())
    }

    pub fn has_params(&self, ctx: &Context<'_>) -> Result<bool, StakingError> {
        Ok(ctx.store().has(keys::PARAMS_KEY)?)
    }

    /// Replace the params. Turning on a cap whose counters were not being
    /// maintained re-derives them from the ledger.
    pub fn update_params(&self, ctx: &mut Context<'_>, params: &Params) -> Result<(), StakingError> {
        let old = self.params(ctx)?;
        self.set_params(ctx, params)?;
        let newly_tracked = (!old.global_cap_enabled() && params.global_cap_enabled())
            || (!old.tracks_validator_liquid_shares() && params.tracks_validator_liquid_shares());
        if newly_tracked {
            let total = self.refresh_total_liquid_staked(ctx)?;
            tracing::info!(total = %total, "liquid staking counters refreshed after params update");
        }
        Ok(())
    }

    pub fn bond_denom(&self, ctx: &Context<'_>) -> Result<String, StakingError> {
        Ok(self.params(ctx)?.bond_denom)
    }

    // ── Pools ───────────────────────────────────────────────────────────

    pub fn bonded_pool(&self) -> AccAddress {
        AccAddress::module(BONDED_POOL_NAME)
    }

    pub fn not_bonded_pool(&self) -> AccAddress {
        AccAddress::module(NOT_BONDED_POOL_NAME)
    }

    pub fn epoch_delegation_pool(&self) -> AccAddress {
        AccAddress::module(EPOCH_DELEGATION_POOL_NAME)
    }

    /// Pool that holds the tokens of validators with `status`.
    pub fn pool_for(&self, status: BondStatus) -> AccAddress {
        match status {
            BondStatus::Bonded => self.bonded_pool(),
            BondStatus::Unbonding | BondStatus::Unbonded => self.not_bonded_pool(),
        }
    }

    /// Register the pool module accounts if they are missing.
    pub fn ensure_module_accounts(&self, ctx: &mut Context<'_>) -> Result<(), StakingError> {
        for name in [BONDED_POOL_NAME, NOT_BONDED_POOL_NAME, EPOCH_DELEGATION_POOL_NAME] {
            if self
                .accounts
                .get_account(ctx.store(), &AccAddress::module(name))?
                .is_none()
            {
                self.accounts.new_module_account(ctx.store_mut(), name)?;
            }
        }
        Ok(())
    }

    pub fn pool_balance(&self, ctx: &Context<'_>, pool: &AccAddress) -> Result<Amount, StakingError> {
        let denom = self.bond_denom(ctx)?;
        Ok(self.bank.balance(ctx.store(), pool, &denom)?)
    }

    /// Bonded plus not-bonded pool balances.
    pub fn total_staked(&self, ctx: &Context<'_>) -> Result<Amount, StakingError> {
        let bonded = self.pool_balance(ctx, &self.bonded_pool())?;
        let not_bonded = self.pool_balance(ctx, &self.not_bonded_pool())?;
        Ok(bonded + not_bonded)
    }

    // ── Account classification ──────────────────────────────────────────

    /// Whether `address` is one of this module's tokenize-share custodians.
    pub fn is_tokenize_share_custodian(&self, ctx: &Context<'_>, address: &AccAddress) -> Result<bool, StakingError> {
        let account = self.accounts.get_account(ctx.store(), address)?;
        Ok(account
            .as_ref()
            .and_then(|a| a.module_name())
            .is_some_and(|name| name.starts_with(TOKENIZE_SHARE_MODULE_PREFIX)))
    }

    /// Automated delegators (module or interchain accounts) other than the
    /// tokenize-share custodians.
    pub fn is_liquid_staking_provider(&self, ctx: &Context<'_>, address: &AccAddress) -> Result<bool, StakingError> {
        let Some(account) = self.accounts.get_account(ctx.store(), address)? else {
            return Ok(false);
        };
        if !account.is_automated() {
            return Ok(false);
        }
        Ok(!account
            .module_name()
            .is_some_and(|name| name.starts_with(TOKENIZE_SHARE_MODULE_PREFIX)))
    }

    /// Whether delegations from `address` count as liquid stake: providers
    /// and custodians alike.
    pub fn holds_liquid_stake(&self, ctx: &Context<'_>, address: &AccAddress) -> Result<bool, StakingError> {
        Ok(self
            .accounts
            .get_account(ctx.store(), address)?
            .is_some_and(|a| a.is_automated()))
    }

    // ── Validators ──────────────────────────────────────────────────────

    pub fn get_validator(&self, ctx: &Context<'_>, operator: &ValAddress) -> Result<Option<Validator>, StakingError> {
        Ok(get_value(ctx.store(), &keys::validator_key(operator))?)
    }

    /// Like [`Self::get_validator`], failing when absent.
    pub fn validator(&self, ctx: &Context<'_>, operator: &ValAddress) -> Result<Validator, StakingError> {
        self.get_validator(ctx, operator)?
            .ok_or(StakingError::NoValidatorFound)
    }

    pub fn set_validator(&self, ctx: &mut Context<'_>, validator: &Validator) -> Result<(), StakingError> {
        set_value(ctx.store_mut(), &keys::validator_key(&validator.operator), validator)?;
        Ok(())
    }

    pub fn set_validator_by_cons(&self, ctx: &mut Context<'_>, validator: &Validator) -> Result<(), StakingError> {
        set_value(
            ctx.store_mut(),
            &keys::validator_by_cons_key(&validator.consensus_pubkey),
            &validator.operator,
        )?;
        Ok(())
    }

    pub fn validator_by_cons(&self, ctx: &Context<'_>, pubkey: &str) -> Result<Option<Validator>, StakingError> {
        let operator: Option<ValAddress> = get_value(ctx.store(), &keys::validator_by_cons_key(pubkey))?;
        match operator {
            Some(op) => self.get_validator(ctx, &op),
            None => Ok(None),
        }
    }

    pub fn remove_validator(&self, ctx: &mut Context<'_>, operator: &ValAddress) -> Result<(), StakingError> {
        let validator = self.validator(ctx, operator)?;
        ctx.store_mut().delete(&keys::validator_key(operator))?;
        ctx.store_mut()
            .delete(&keys::validator_by_cons_key(&validator.consensus_pubkey))?;
        tracing::debug!(validator = %operator, "validator removed");
        Ok(())
    }

    /// Drop an unbonded validator once its last share is gone.
    pub fn remove_validator_if_empty(&self, ctx: &mut Context<'_>, operator: &ValAddress) -> Result<(), StakingError> {
        if let Some(validator) = self.get_validator(ctx, operator)? {
            if validator.delegator_shares.is_zero() && validator.is_unbonded() {
                self.remove_validator(ctx, operator)?;
            }
        }
        Ok(())
    }

    pub fn all_validators(&self, ctx: &Context<'_>) -> Result<Vec<Validator>, StakingError> {
        Ok(prefix_values(ctx.store(), &[keys::VALIDATOR_PREFIX])?)
    }

    // ── Delegations ─────────────────────────────────────────────────────

    pub fn get_delegation(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<Delegation>, StakingError> {
        Ok(get_value(ctx.store(), &keys::delegation_key(delegator, validator))?)
    }

    pub fn delegation(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Delegation, StakingError> {
        self.get_delegation(ctx, delegator, validator)?
            .ok_or(StakingError::NoDelegation)
    }

    pub fn set_delegation(&self, ctx: &mut Context<'_>, delegation: &Delegation) -> Result<(), StakingError> {
        set_value(
            ctx.store_mut(),
            &keys::delegation_key(&delegation.delegator, &delegation.validator),
            delegation,
        )?;
        Ok(())
    }

    pub fn remove_delegation(&self, ctx: &mut Context<'_>, delegation: &Delegation) -> Result<(), StakingError> {
        ctx.store_mut()
            .delete(&keys::delegation_key(&delegation.delegator, &delegation.validator))?;
        Ok(())
    }

    pub fn delegator_delegations(&self, ctx: &Context<'_>, delegator: &AccAddress) -> Result<Vec<Delegation>, StakingError> {
        Ok(prefix_values(
            ctx.store(),
            &keys::delegations_by_delegator_prefix(delegator),
        )?)
    }

    pub fn validator_delegations(&self, ctx: &Context<'_>, validator: &ValAddress) -> Result<Vec<Delegation>, StakingError> {
        Ok(self
            .all_delegations(ctx)?
            .into_iter()
            .filter(|d| &d.validator == validator)
            .collect())
    }

    pub fn all_delegations(&self, ctx: &Context<'_>) -> Result<Vec<Delegation>, StakingError> {
        Ok(prefix_values(ctx.store(), &[keys::DELEGATION_PREFIX])?)
    }

    // ── Unbonding delegations ───────────────────────────────────────────

    pub fn get_unbonding_delegation(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<UnbondingDelegation>, StakingError> {
        Ok(get_value(
            ctx.store(),
            &keys::unbonding_delegation_key(delegator, validator),
        )?)
    }

    /// Store `ubd`, or delete it once it has no entries left.
    pub fn set_unbonding_delegation(&self, ctx: &mut Context<'_>, ubd: &UnbondingDelegation) -> Result<(), StakingError> {
        let key = keys::unbonding_delegation_key(&ubd.delegator, &ubd.validator);
        if ubd.entries.is_empty() {
            ctx.store_mut().delete(&key)?;
        } else {
            set_value(ctx.store_mut(), &key, ubd)?;
        }
        Ok(())
    }

    pub fn delegator_unbonding_delegations(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
    ) -> Result<Vec<UnbondingDelegation>, StakingError> {
        Ok(prefix_values(
            ctx.store(),
            &keys::unbonding_delegations_by_delegator_prefix(delegator),
        )?)
    }

    pub fn all_unbonding_delegations(&self, ctx: &Context<'_>) -> Result<Vec<UnbondingDelegation>, StakingError> {
        Ok(prefix_values(ctx.store(), &[keys::UNBONDING_DELEGATION_PREFIX])?)
    }

    pub fn has_max_unbonding_entries(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<bool, StakingError> {
        let max = self.params(ctx)?.max_entries as usize;
        Ok(self
            .get_unbonding_delegation(ctx, delegator, validator)?
            .is_some_and(|ubd| ubd.entries.len() >= max))
    }

    pub fn insert_unbonding_queue(&self, ctx: &mut Context<'_>, pair: DvPair, completion: Timestamp) -> Result<(), StakingError> {
        let key = keys::unbonding_queue_key(completion);
        let mut pairs: Vec<DvPair> = get_value(ctx.store(), &key)?.unwrap_or_default();
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
        set_value(ctx.store_mut(), &key, &pairs)?;
        Ok(())
    }

    /// Pop every unbonding queue slot due at or before `now`.
    pub fn dequeue_mature_unbondings(&self, ctx: &mut Context<'_>, now: Timestamp) -> Result<Vec<DvPair>, StakingError> {
        let end = keys::unbonding_queue_key(now.plus_secs(1));
        let slots = ctx.store().range(&[keys::UNBONDING_QUEUE_PREFIX], Some(&end))?;
        let mut mature = Vec::new();
        for (key, bytes) in slots {
            let pairs: Vec<DvPair> = decode(&bytes)?;
            mature.extend(pairs);
            ctx.store_mut().delete(&key)?;
        }
        Ok(mature)
    }

    // ── Redelegations ───────────────────────────────────────────────────

    pub fn get_redelegation(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> Result<Option<Redelegation>, StakingError> {
        Ok(get_value(ctx.store(), &keys::redelegation_key(delegator, src, dst))?)
    }

    /// Store `red`, or delete it once it has no entries left.
    pub fn set_redelegation(&self, ctx: &mut Context<'_>, red: &Redelegation) -> Result<(), StakingError> {
        let key = keys::redelegation_key(&red.delegator, &red.src_validator, &red.dst_validator);
        if red.entries.is_empty() {
            ctx.store_mut().delete(&key)?;
        } else {
            set_value(ctx.store_mut(), &key, red)?;
        }
        Ok(())
    }

    pub fn delegator_redelegations(&self, ctx: &Context<'_>, delegator: &AccAddress) -> Result<Vec<Redelegation>, StakingError> {
        Ok(prefix_values(
            ctx.store(),
            &keys::redelegations_by_delegator_prefix(delegator),
        )?)
    }

    pub fn all_redelegations(&self, ctx: &Context<'_>) -> Result<Vec<Redelegation>, StakingError> {
        Ok(prefix_values(ctx.store(), &[keys::REDELEGATION_PREFIX])?)
    }

    /// Whether `delegator` has an immature redelegation into `validator`.
    pub fn has_receiving_redelegation(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<bool, StakingError> {
        Ok(self
            .delegator_redelegations(ctx, delegator)?
            .iter()
            .any(|red| &red.dst_validator == validator && !red.entries.is_empty()))
    }

    pub fn has_max_redelegation_entries(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> Result<bool, StakingError> {
        let max = self.params(ctx)?.max_entries as usize;
        Ok(self
            .get_redelegation(ctx, delegator, src, dst)?
            .is_some_and(|red| red.entries.len() >= max))
    }

    pub fn insert_redelegation_queue(
        &self,
        ctx: &mut Context<'_>,
        triplet: DvvTriplet,
        completion: Timestamp,
    ) -> Result<(), StakingError> {
        let key = keys::redelegation_queue_key(completion);
        let mut triplets: Vec<DvvTriplet> = get_value(ctx.store(), &key)?.unwrap_or_default();
        if !triplets.contains(&triplet) {
            triplets.push(triplet);
        }
        set_value(ctx.store_mut(), &key, &triplets)?;
        Ok(())
    }

    /// Pop every redelegation queue slot due at or before `now`.
    pub fn dequeue_mature_redelegations(&self, ctx: &mut Context<'_>, now: Timestamp) -> Result<Vec<DvvTriplet>, StakingError> {
        let end = keys::redelegation_queue_key(now.plus_secs(1));
        let slots = ctx.store().range(&[keys::REDELEGATION_QUEUE_PREFIX], Some(&end))?;
        let mut mature = Vec::new();
        for (key, bytes) in slots {
            let triplets: Vec<DvvTriplet> = decode(&bytes)?;
            mature.extend(triplets);
            ctx.store_mut().delete(&key)?;
        }
        Ok(mature)
    }
}
