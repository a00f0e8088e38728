//! Delegation ledger operations: delegate, unbond, undelegate, redelegate,
//! their maturity, and the hooks used by the slashing and validator-set
//! collaborators.

use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{AccAddress, Amount, Coin, Dec, Timestamp, ValAddress};

use crate::context::Context;
use crate::delegation::{Delegation, DvPair, DvvTriplet, Redelegation, UnbondingDelegation};
use crate::error::StakingError;
use crate::events::StakingEvent;
use crate::keeper::Keeper;
use crate::liquid_stake::liquid_tokens;
use crate::validator::{BondStatus, Validator};

/// Where the tokens of a new delegation come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenSource {
    /// The delegator's own balance.
    Account,
    /// Tokens already held by the pool of validators with this status.
    Pool(BondStatus),
    /// Tokens escrowed in the epoch delegation pool when the message was queued.
    EpochEscrow,
}

/// Jail a validator whose operator just reduced its self-delegation to
/// `remaining` shares, below the declared minimum.
fn jail_if_below_min_self_delegation(validator: &mut Validator, delegator: &AccAddress, remaining: Dec) {
    if delegator == &validator.operator_account()
        && !validator.jailed
        && validator.tokens_from_shares(remaining).truncate_amount() < validator.min_self_delegation
    {
        validator.jailed = true;
        tracing::info!(validator = %validator.operator, "self delegation below minimum; validator jailed");
    }
}

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    /// Delegate `amount` tokens to `operator` and return the shares issued.
    pub fn delegate(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        amount: Amount,
        source: TokenSource,
        operator: &ValAddress,
    ) -> Result<Dec, StakingError> {
        let mut validator = self.validator(ctx, operator)?;
        if validator.invalid_ex_rate() {
            return Err(StakingError::InvalidExchangeRate);
        }

        let coin = Coin::new(self.bond_denom(ctx)?, amount);
        let pool = self.pool_for(validator.status);
        let now = ctx.block_time();
        match source {
            TokenSource::Account => {
                self.bank()
                    .delegate_coins(ctx.store_mut(), now, delegator, &pool, &coin)?;
            }
            TokenSource::EpochEscrow => {
                let escrow = self.epoch_delegation_pool();
                self.bank().send(ctx.store_mut(), now, &escrow, &pool, &coin)?;
            }
            TokenSource::Pool(status) => {
                let from = self.pool_for(status);
                if from != pool {
                    self.bank().send(ctx.store_mut(), now, &from, &pool, &coin)?;
                }
            }
        }

        let new_shares = validator.add_tokens_from_del(amount);
        self.set_validator(ctx, &validator)?;

        let mut delegation = self
            .get_delegation(ctx, delegator, operator)?
            .unwrap_or_else(|| Delegation::new(delegator.clone(), operator.clone(), Dec::ZERO, false));
        delegation.shares += new_shares;
        if delegation.validator_bond {
            self.increase_validator_bond_shares(ctx, operator, new_shares)?;
        }
        self.set_delegation(ctx, &delegation)?;

        tracing::debug!(delegator = %delegator, validator = %operator, %amount, shares = %new_shares, "delegated");
        Ok(new_shares)
    }

    /// Remove `shares` from a delegation and return the tokens they were
    /// worth. The tokens stay in the validator's pool.
    pub fn unbond(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        operator: &ValAddress,
        shares: Dec,
    ) -> Result<Amount, StakingError> {
        let mut delegation = self.delegation(ctx, delegator, operator)?;
        self.validator(ctx, operator)?;
        if delegation.shares < shares {
            return Err(StakingError::NotEnoughDelegationShares);
        }

        if delegation.validator_bond {
            self.safely_decrease_validator_bond(ctx, operator, shares)?;
        }

        let mut validator = self.validator(ctx, operator)?;
        delegation.shares -= shares;
        jail_if_below_min_self_delegation(&mut validator, delegator, delegation.shares);

        if delegation.shares.is_zero() {
            self.remove_delegation(ctx, &delegation)?;
        } else {
            self.set_delegation(ctx, &delegation)?;
        }

        let amount = validator.remove_del_shares(shares);
        self.set_validator(ctx, &validator)?;
        Ok(amount)
    }

    /// Move `shares` of a delegation to `operator` from `from` to `to`. The
    /// validator's tokens and shares are untouched, so neither is the
    /// exchange rate.
    pub fn transfer_delegation_shares(
        &self,
        ctx: &mut Context<'_>,
        from: &AccAddress,
        to: &AccAddress,
        operator: &ValAddress,
        shares: Dec,
    ) -> Result<(), StakingError> {
        let mut source = self.delegation(ctx, from, operator)?;
        if !shares.is_positive() {
            return Err(StakingError::BadSharesAmount);
        }
        if source.shares < shares {
            return Err(StakingError::NotEnoughDelegationShares);
        }
        if source.validator_bond {
            self.safely_decrease_validator_bond(ctx, operator, shares)?;
        }

        let mut validator = self.validator(ctx, operator)?;
        source.shares -= shares;
        if !validator.jailed {
            jail_if_below_min_self_delegation(&mut validator, from, source.shares);
            if validator.jailed {
                self.set_validator(ctx, &validator)?;
            }
        }
        if source.shares.is_zero() {
            self.remove_delegation(ctx, &source)?;
        } else {
            self.set_delegation(ctx, &source)?;
        }

        let mut target = self
            .get_delegation(ctx, to, operator)?
            .unwrap_or_else(|| Delegation::new(to.clone(), operator.clone(), Dec::ZERO, false));
        target.shares += shares;
        if target.validator_bond {
            self.increase_validator_bond_shares(ctx, operator, shares)?;
        }
        self.set_delegation(ctx, &target)?;

        tracing::debug!(from = %from, to = %to, validator = %operator, %shares, "delegation shares moved");
        Ok(())
    }

    /// Convert a token amount into the shares to unbond from a delegation.
    ///
    /// Fails when even the truncated share count exceeds the delegation;
    /// otherwise a rounded count that overshoots only through rounding is
    /// clamped so a delegation can always be fully withdrawn.
    pub fn validate_unbond_amount(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        operator: &ValAddress,
        amount: Amount,
    ) -> Result<Dec, StakingError> {
        let validator = self.validator(ctx, operator)?;
        let delegation = self.delegation(ctx, delegator, operator)?;

        let shares = validator.shares_from_tokens(amount)?;
        let truncated = validator.shares_from_tokens_truncated(amount)?;
        if truncated > delegation.shares {
            return Err(StakingError::BadSharesAmount);
        }
        Ok(shares.min(delegation.shares))
    }

    /// Begin unbonding `shares`. Returns the completion time and the tokens
    /// that will be released.
    pub fn undelegate(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        operator: &ValAddress,
        shares: Dec,
    ) -> Result<(Timestamp, Amount), StakingError> {
        let validator = self.validator(ctx, operator)?;
        if self.has_max_unbonding_entries(ctx, delegator, operator)? {
            return Err(StakingError::MaxEntries);
        }

        let amount = self.unbond(ctx, delegator, operator, shares)?;
        let now = ctx.block_time();
        if validator.is_bonded() && amount.is_positive() {
            let coin = Coin::new(self.bond_denom(ctx)?, amount);
            self.bank()
                .send(ctx.store_mut(), now, &self.bonded_pool(), &self.not_bonded_pool(), &coin)?;
        }

        let completion = now.plus_secs(self.params(ctx)?.unbonding_time_secs);
        let mut ubd = self
            .get_unbonding_delegation(ctx, delegator, operator)?
            .unwrap_or_else(|| UnbondingDelegation::new(delegator.clone(), operator.clone()));
        ubd.add_entry(ctx.block_height(), completion, amount);
        self.set_unbonding_delegation(ctx, &ubd)?;
        self.insert_unbonding_queue(
            ctx,
            DvPair {
                delegator: delegator.clone(),
                validator: operator.clone(),
            },
            completion,
        )?;
        self.remove_validator_if_empty(ctx, operator)?;

        tracing::info!(delegator = %delegator, validator = %operator, %amount, completion = %completion, "unbonding started");
        Ok((completion, amount))
    }

    /// Release every mature entry of an unbonding delegation to the
    /// delegator and return the total released.
    pub fn complete_unbonding(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        operator: &ValAddress,
    ) -> Result<Amount, StakingError> {
        let mut ubd = self
            .get_unbonding_delegation(ctx, delegator, operator)?
            .ok_or(StakingError::NoUnbondingDelegation)?;
        let released = ubd.take_mature(ctx.block_time());
        if released.is_positive() {
            let coin = Coin::new(self.bond_denom(ctx)?, released);
            self.bank()
                .undelegate_coins(ctx.store_mut(), &self.not_bonded_pool(), delegator, &coin)?;
        }
        self.set_unbonding_delegation(ctx, &ubd)?;
        Ok(released)
    }

    /// Move `shares` from `src` to `dst`. Returns the completion time and
    /// the shares created at the destination.
    pub fn begin_redelegation(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
        shares: Dec,
    ) -> Result<(Timestamp, Dec), StakingError> {
        if src == dst {
            return Err(StakingError::SelfRedelegation);
        }
        self.validator(ctx, dst)?;
        let src_validator = self.validator(ctx, src)?;
        if self.has_receiving_redelegation(ctx, delegator, src)? {
            return Err(StakingError::TransitiveRedelegation);
        }
        if self.has_max_redelegation_entries(ctx, delegator, src, dst)? {
            return Err(StakingError::MaxEntries);
        }

        let amount = self.unbond(ctx, delegator, src, shares)?;
        if amount.is_zero() {
            return Err(StakingError::TinyRedelegationAmount);
        }
        let dst_shares = self.delegate(ctx, delegator, amount, TokenSource::Pool(src_validator.status), dst)?;
        self.remove_validator_if_empty(ctx, src)?;

        let now = ctx.block_time();
        if src_validator.is_unbonded() {
            // nothing was at stake; the move is final immediately
            return Ok((now, dst_shares));
        }

        let completion = now.plus_secs(self.params(ctx)?.unbonding_time_secs);
        let mut red = self
            .get_redelegation(ctx, delegator, src, dst)?
            .unwrap_or_else(|| Redelegation::new(delegator.clone(), src.clone(), dst.clone()));
        red.add_entry(ctx.block_height(), completion, amount, dst_shares);
        self.set_redelegation(ctx, &red)?;
        self.insert_redelegation_queue(
            ctx,
            DvvTriplet {
                delegator: delegator.clone(),
                src_validator: src.clone(),
                dst_validator: dst.clone(),
            },
            completion,
        )?;

        tracing::info!(delegator = %delegator, src = %src, dst = %dst, %amount, "redelegation started");
        Ok((completion, dst_shares))
    }

    pub fn complete_redelegation(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> Result<(), StakingError> {
        let Some(mut red) = self.get_redelegation(ctx, delegator, src, dst)? else {
            return Ok(());
        };
        red.remove_mature(ctx.block_time());
        self.set_redelegation(ctx, &red)
    }

    // ── Collaborator hooks ──────────────────────────────────────────────

    /// Burn `fraction` of a validator's tokens. Every liquid position on the
    /// validator is revalued and the global counter follows.
    pub fn slash(&self, ctx: &mut Context<'_>, operator: &ValAddress, fraction: Dec) -> Result<Amount, StakingError> {
        if fraction.is_negative() || fraction > Dec::ONE {
            return Err(StakingError::InvalidAmount);
        }
        let mut validator = self.validator(ctx, operator)?;
        let burned = Dec::from_amount(validator.tokens)
            .mul_truncate(fraction)
            .truncate_amount();

        let mut liquid_positions = Vec::new();
        if self.params(ctx)?.global_cap_enabled() {
            for delegation in self.validator_delegations(ctx, operator)? {
                if self.holds_liquid_stake(ctx, &delegation.delegator)? {
                    liquid_positions.push(delegation.shares);
                }
            }
        }
        let value = |v: &Validator| -> Amount { liquid_positions.iter().map(|s| liquid_tokens(v, *s)).sum() };

        let before = value(&validator);
        validator.remove_tokens(burned);
        self.set_validator(ctx, &validator)?;
        self.adjust_total_liquid_staked_tokens(ctx, before, value(&validator))?;
        if burned.is_positive() {
            let coin = Coin::new(self.bond_denom(ctx)?, burned);
            self.bank()
                .burn(ctx.store_mut(), &self.pool_for(validator.status), &coin)?;
        }

        ctx.emit(StakingEvent::Slash {
            validator: operator.clone(),
            fraction,
            burned,
        });
        tracing::info!(validator = %operator, %fraction, %burned, "validator slashed");
        Ok(burned)
    }

    /// Change a validator's bond status, moving its tokens to the matching pool.
    pub fn set_validator_status(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        status: BondStatus,
    ) -> Result<(), StakingError> {
        let mut validator = self.validator(ctx, operator)?;
        if validator.status == status {
            return Ok(());
        }
        let from = self.pool_for(validator.status);
        let to = self.pool_for(status);
        if from != to && validator.tokens.is_positive() {
            let coin = Coin::new(self.bond_denom(ctx)?, validator.tokens);
            let now = ctx.block_time();
            self.bank().send(ctx.store_mut(), now, &from, &to, &coin)?;
        }
        if status == BondStatus::Unbonding {
            validator.unbonding_height = ctx.block_height();
            validator.unbonding_time = ctx.block_time().plus_secs(self.params(ctx)?.unbonding_time_secs);
        }
        validator.status = status;
        self.set_validator(ctx, &validator)?;
        tracing::debug!(validator = %operator, ?status, "validator status changed");
        Ok(())
    }

    pub fn jail(&self, ctx: &mut Context<'_>, operator: &ValAddress) -> Result<(), StakingError> {
        let mut validator = self.validator(ctx, operator)?;
        if validator.jailed {
            return Ok(());
        }
        validator.jailed = true;
        self.set_validator(ctx, &validator)?;
        tracing::info!(validator = %operator, "validator jailed");
        Ok(())
    }
}
