//! Marking delegations as validator bond.

use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{AccAddress, ValAddress};

use crate::context::Context;
use crate::error::StakingError;
use crate::events::StakingEvent;
use crate::keeper::Keeper;

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    /// Flag `delegator`'s delegation to `operator` as validator bond. Its
    /// shares then count towards the validator's bond-cap capacity. Marking
    /// an already-bonded delegation changes nothing.
    pub fn validator_bond(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        operator: &ValAddress,
    ) -> Result<(), StakingError> {
        self.validator(ctx, operator)?;
        let mut delegation = self.delegation(ctx, delegator, operator)?;
        if self.is_liquid_staking_provider(ctx, delegator)? {
            return Err(StakingError::ValidatorBondNotAllowedFromModuleAccount);
        }
        if delegation.validator_bond {
            return Ok(());
        }

        delegation.validator_bond = true;
        self.set_delegation(ctx, &delegation)?;
        self.increase_validator_bond_shares(ctx, operator, delegation.shares)?;

        ctx.emit(StakingEvent::ValidatorBond {
            delegator: delegator.clone(),
            validator: operator.clone(),
        });
        tracing::info!(delegator = %delegator, validator = %operator, shares = %delegation.shares, "delegation marked as validator bond");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TokenSource;
    use crate::testutil::*;
    use lsm_store::AccountKind;
    use lsm_types::{Amount, Dec, Params};

    #[test]
    fn test_bond_counts_shares_once() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        setup(&keeper, &mut ctx, Params::default());
        let val = create_validator(&keeper, &mut ctx, 1, 100);

        keeper.validator_bond(&mut ctx, &addr(1), &val).unwrap();
        keeper.validator_bond(&mut ctx, &addr(1), &val).unwrap();
        assert_eq!(
            keeper.validator(&ctx, &val).unwrap().total_validator_bond_shares,
            Dec::new(100)
        );
        assert!(keeper.delegation(&ctx, &addr(1), &val).unwrap().validator_bond);

        // later delegations into a bonded position grow the bond
        fund(&keeper, &mut ctx, &addr(1), 50);
        keeper
            .delegate(&mut ctx, &addr(1), Amount::new(50), TokenSource::Account, &val)
            .unwrap();
        assert_eq!(
            keeper.validator(&ctx, &val).unwrap().total_validator_bond_shares,
            Dec::new(150)
        );
    }

    #[test]
    fn test_bond_requirements() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        setup(&keeper, &mut ctx, Params::default());
        let val = create_validator(&keeper, &mut ctx, 1, 100);

        assert_eq!(
            keeper.validator_bond(&mut ctx, &addr(1), &valaddr(9)),
            Err(StakingError::NoValidatorFound)
        );
        assert_eq!(
            keeper.validator_bond(&mut ctx, &addr(2), &val),
            Err(StakingError::NoDelegation)
        );

        let ica = addr(3);
        register(&keeper, &mut ctx, &ica, AccountKind::Interchain);
        fund(&keeper, &mut ctx, &ica, 10);
        keeper
            .delegate(&mut ctx, &ica, Amount::new(10), TokenSource::Account, &val)
            .unwrap();
        assert_eq!(
            keeper.validator_bond(&mut ctx, &ica, &val),
            Err(StakingError::ValidatorBondNotAllowedFromModuleAccount)
        );
    }

    #[test]
    fn test_unbonding_bond_is_blocked_by_outstanding_liquid_shares() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        setup(
            &keeper,
            &mut ctx,
            Params {
                validator_bond_factor: Dec::new(2),
                ..Params::default()
            },
        );
        let val = create_validator(&keeper, &mut ctx, 1, 100);
        keeper.validator_bond(&mut ctx, &addr(1), &val).unwrap();
        let mut v = keeper.validator(&ctx, &val).unwrap();
        v.total_liquid_shares = Dec::new(150);
        keeper.set_validator(&mut ctx, &v).unwrap();

        // 100 bond shares cover 200 liquid; 75 still cover 150
        keeper.unbond(&mut ctx, &addr(1), &val, Dec::new(25)).unwrap();
        assert_eq!(
            keeper.unbond(&mut ctx, &addr(1), &val, Dec::new(1)),
            Err(StakingError::InsufficientValidatorBondShares)
        );
    }
}
