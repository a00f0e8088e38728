//! Liquid stake accounting: the global and per-validator counters and the
//! three caps that bound them.
//!
//! A position is liquid when it is held by a liquid staking provider or by a
//! tokenize-share custodian. The global counter is maintained only while the
//! global cap is enabled; validator liquid shares only while some cap is
//! enabled. [`Keeper::refresh_total_liquid_staked`] rebuilds both from the
//! ledger when tracking starts.

use lsm_store::codec::{get_value, set_value};
use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{Amount, Dec, ValAddress};

use crate::context::Context;
use crate::error::StakingError;
use crate::keeper::Keeper;
use crate::keys;
use crate::validator::Validator;

/// Token value of a liquid position, truncated. The counter and the refresh
/// both value positions this way so incremental updates match a rebuild.
pub(crate) fn liquid_tokens(validator: &Validator, shares: Dec) -> Amount {
    validator.tokens_from_shares(shares).truncate_amount()
}

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    /// Total tokens held in liquid positions.
    ///
    /// # Panics
    ///
    /// If the counter was never initialised. Genesis and
    /// [`Keeper::migrate_liquid_staking`] write it.
    pub fn total_liquid_staked_tokens(&self, ctx: &Context<'_>) -> Result<Amount, StakingError> {
        let total: Option<Amount> = get_value(ctx.store(), keys::TOTAL_LIQUID_STAKED_TOKENS_KEY)?;
        match total {
            Some(total) => Ok(total),
            None => panic!("total liquid staked tokens was never initialized"),
        }
    }

    pub fn set_total_liquid_staked_tokens(&self, ctx: &mut Context<'_>, tokens: Amount) -> Result<(), StakingError> {
        set_value(ctx.store_mut(), keys::TOTAL_LIQUID_STAKED_TOKENS_KEY, &tokens)?;
        Ok(())
    }

    // ── Cap checks ──────────────────────────────────────────────────────

    /// Whether adding `tokens` of liquid stake would push the liquid share of
    /// total stake over the global cap. An empty chain always exceeds.
    pub fn check_exceeds_global_liquid_staking_cap(&self, ctx: &Context<'_>, tokens: Amount) -> Result<bool, StakingError> {
        let cap = self.params(ctx)?.global_liquid_staking_cap;
        let liquid = self.total_liquid_staked_tokens(ctx)? + tokens;
        let total = self.total_staked(ctx)? + tokens;
        if total.is_zero() {
            return Ok(true);
        }
        let fraction = Dec::from_amount(liquid).quo(Dec::from_amount(total));
        tracing::debug!(%fraction, %cap, "global liquid staking cap check");
        Ok(fraction > cap)
    }

    /// Whether `shares` more liquid shares would exceed the validator's bond
    /// shares times the bond factor. Always false while the factor is disabled.
    pub fn check_exceeds_validator_bond_cap(
        &self,
        ctx: &Context<'_>,
        validator: &Validator,
        shares: Dec,
    ) -> Result<bool, StakingError> {
        let params = self.params(ctx)?;
        if !params.validator_bond_cap_enabled() {
            return Ok(false);
        }
        let max_liquid = validator
            .total_validator_bond_shares
            .mul(params.validator_bond_factor);
        Ok(validator.total_liquid_shares + shares > max_liquid)
    }

    /// Whether `shares` more liquid shares would push the validator's liquid
    /// fraction over the per-validator cap. A zero change never exceeds.
    pub fn check_exceeds_validator_liquid_staking_cap(
        &self,
        ctx: &Context<'_>,
        validator: &Validator,
        shares: Dec,
    ) -> Result<bool, StakingError> {
        let params = self.params(ctx)?;
        if !params.validator_liquid_cap_enabled() || shares.is_zero() {
            return Ok(false);
        }
        let liquid = validator.total_liquid_shares + shares;
        let total = validator.delegator_shares + shares;
        let fraction = liquid.quo(total);
        tracing::debug!(validator = %validator.operator, %fraction, "validator liquid staking cap check");
        Ok(fraction > params.validator_liquid_staking_cap)
    }

    // ── Mutations ───────────────────────────────────────────────────────

    pub fn safely_increase_total_liquid_staked_tokens(&self, ctx: &mut Context<'_>, amount: Amount) -> Result<(), StakingError> {
        if !self.params(ctx)?.global_cap_enabled() {
            return Ok(());
        }
        if self.check_exceeds_global_liquid_staking_cap(ctx, amount)? {
            return Err(StakingError::GlobalLiquidStakingCapExceeded);
        }
        let total = self.total_liquid_staked_tokens(ctx)?;
        self.set_total_liquid_staked_tokens(ctx, total + amount)
    }

    /// Saturates at zero.
    pub fn decrease_total_liquid_staked_tokens(&self, ctx: &mut Context<'_>, amount: Amount) -> Result<(), StakingError> {
        if !self.params(ctx)?.global_cap_enabled() {
            return Ok(());
        }
        let total = self.total_liquid_staked_tokens(ctx)?;
        if amount > total {
            tracing::warn!(%total, %amount, "total liquid staked tokens would go negative; clamping to zero");
        }
        self.set_total_liquid_staked_tokens(ctx, total.saturating_sub(amount))
    }

    /// Move the global counter from `before` to `after` without a cap check,
    /// for positions that change value but not liquidity. Saturates at zero.
    pub fn adjust_total_liquid_staked_tokens(
        &self,
        ctx: &mut Context<'_>,
        before: Amount,
        after: Amount,
    ) -> Result<(), StakingError> {
        if before == after || !self.params(ctx)?.global_cap_enabled() {
            return Ok(());
        }
        let total = self.total_liquid_staked_tokens(ctx)?;
        let adjusted = if after > before {
            total + (after - before)
        } else {
            total.saturating_sub(before - after)
        };
        self.set_total_liquid_staked_tokens(ctx, adjusted)
    }

    /// Add liquid shares to a validator after checking both validator caps.
    pub fn safely_increase_validator_liquid_shares(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        shares: Dec,
    ) -> Result<(), StakingError> {
        let mut validator = self.validator(ctx, operator)?;
        if self.check_exceeds_validator_bond_cap(ctx, &validator, shares)? {
            return Err(StakingError::InsufficientValidatorBondShares);
        }
        if self.check_exceeds_validator_liquid_staking_cap(ctx, &validator, shares)? {
            return Err(StakingError::ValidatorLiquidStakingCapExceeded);
        }
        if self.params(ctx)?.tracks_validator_liquid_shares() {
            validator.total_liquid_shares += shares;
            self.set_validator(ctx, &validator)?;
        }
        Ok(())
    }

    /// Saturates at zero.
    pub fn decrease_validator_liquid_shares(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        shares: Dec,
    ) -> Result<(), StakingError> {
        if !self.params(ctx)?.tracks_validator_liquid_shares() {
            return Ok(());
        }
        let mut validator = self.validator(ctx, operator)?;
        if shares > validator.total_liquid_shares {
            tracing::warn!(
                validator = %operator,
                liquid = %validator.total_liquid_shares,
                %shares,
                "validator liquid shares would go negative; clamping to zero"
            );
            validator.total_liquid_shares = Dec::ZERO;
        } else {
            validator.total_liquid_shares -= shares;
        }
        self.set_validator(ctx, &validator)
    }

    /// Record a new liquid position of `tokens` worth `shares` on
    /// `operator`. Every enabled cap is evaluated before anything is written.
    pub fn increase_liquid_stake(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        tokens: Amount,
        shares: Dec,
    ) -> Result<(), StakingError> {
        let params = self.params(ctx)?;
        if params.global_cap_enabled() && self.check_exceeds_global_liquid_staking_cap(ctx, tokens)? {
            return Err(StakingError::GlobalLiquidStakingCapExceeded);
        }
        let validator = self.validator(ctx, operator)?;
        if self.check_exceeds_validator_bond_cap(ctx, &validator, shares)? {
            return Err(StakingError::InsufficientValidatorBondShares);
        }
        if self.check_exceeds_validator_liquid_staking_cap(ctx, &validator, shares)? {
            return Err(StakingError::ValidatorLiquidStakingCapExceeded);
        }
        self.safely_increase_total_liquid_staked_tokens(ctx, tokens)?;
        self.safely_increase_validator_liquid_shares(ctx, operator, shares)?;
        tracing::debug!(validator = %operator, %tokens, %shares, "liquid stake increased");
        Ok(())
    }

    /// Remove a liquid position of `tokens` worth `shares` from `operator`.
    pub fn decrease_liquid_stake(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        tokens: Amount,
        shares: Dec,
    ) -> Result<(), StakingError> {
        self.decrease_total_liquid_staked_tokens(ctx, tokens)?;
        self.decrease_validator_liquid_shares(ctx, operator, shares)?;
        tracing::debug!(validator = %operator, %tokens, %shares, "liquid stake decreased");
        Ok(())
    }

    // ── Validator bond shares ───────────────────────────────────────────

    pub fn increase_validator_bond_shares(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        shares: Dec,
    ) -> Result<(), StakingError> {
        let mut validator = self.validator(ctx, operator)?;
        validator.total_validator_bond_shares += shares;
        self.set_validator(ctx, &validator)
    }

    /// Remove bond shares, failing if the remaining bond could no longer
    /// cover the validator's outstanding liquid shares.
    pub fn safely_decrease_validator_bond(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        shares: Dec,
    ) -> Result<(), StakingError> {
        let params = self.params(ctx)?;
        let mut validator = self.validator(ctx, operator)?;
        let remaining = if shares > validator.total_validator_bond_shares {
            Dec::ZERO
        } else {
            validator.total_validator_bond_shares - shares
        };
        if params.validator_bond_cap_enabled()
            && validator.total_liquid_shares > remaining.mul(params.validator_bond_factor)
        {
            return Err(StakingError::InsufficientValidatorBondShares);
        }
        validator.total_validator_bond_shares = remaining;
        self.set_validator(ctx, &validator)
    }

    // ── Refresh ─────────────────────────────────────────────────────────

    /// Recompute the global counter and every validator's liquid shares
    /// from the delegations of automated accounts. Returns the new total.
    pub fn refresh_total_liquid_staked(&self, ctx: &mut Context<'_>) -> Result<Amount, StakingError> {
        let mut validators = std::collections::BTreeMap::new();
        for mut validator in self.all_validators(ctx)? {
            validator.total_liquid_shares = Dec::ZERO;
            validators.insert(validator.operator.clone(), validator);
        }

        let mut total = Amount::ZERO;
        for delegation in self.all_delegations(ctx)? {
            if !self.holds_liquid_stake(ctx, &delegation.delegator)? {
                continue;
            }
            let validator = validators
                .get_mut(&delegation.validator)
                .ok_or(StakingError::NoValidatorFound)?;
            validator.total_liquid_shares += delegation.shares;
            total += liquid_tokens(validator, delegation.shares);
        }

        for validator in validators.values() {
            self.set_validator(ctx, validator)?;
        }
        self.set_total_liquid_staked_tokens(ctx, total)?;
        tracing::debug!(%total, validators = validators.len(), "liquid staking totals refreshed");
        Ok(total)
    }
}
