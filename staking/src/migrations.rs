//! One-shot store migration onto liquid staking.

use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{Amount, Dec, Params};

use crate::context::Context;
use crate::error::StakingError;
use crate::keeper::Keeper;

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    /// Bring a plain staking store onto liquid staking: the liquid params are
    /// reset to their disabled defaults, every validator's liquid and bond
    /// share counters and every delegation's bond flag are cleared, and the
    /// global counter is derived from the ledger. Returns the derived total.
    pub fn migrate_liquid_staking(&self, ctx: &mut Context<'_>) -> Result<Amount, StakingError> {
        let defaults = Params::default();
        let params = if self.has_params(ctx)? {
            Params {
                validator_bond_factor: defaults.validator_bond_factor,
                global_liquid_staking_cap: defaults.global_liquid_staking_cap,
                validator_liquid_staking_cap: defaults.validator_liquid_staking_cap,
                ..self.params(ctx)?
            }
        } else {
            defaults
        };
        self.set_params(ctx, &params)?;

        let validators = self.all_validators(ctx)?;
        for mut validator in validators.iter().cloned() {
            validator.total_liquid_shares = Dec::ZERO;
            validator.total_validator_bond_shares = Dec::ZERO;
            self.set_validator(ctx, &validator)?;
        }

        let mut delegations = 0usize;
        for mut delegation in self.all_delegations(ctx)? {
            if delegation.validator_bond {
                delegation.validator_bond = false;
                self.set_delegation(ctx, &delegation)?;
            }
            delegations += 1;
        }

        self.set_total_liquid_staked_tokens(ctx, Amount::ZERO)?;
        let total = self.refresh_total_liquid_staked(ctx)?;
        tracing::info!(
            validators = validators.len(),
            delegations,
            total_liquid_staked = %total,
            "liquid staking migration complete"
        );
        Ok(total)
    }
}
