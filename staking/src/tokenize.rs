//! Tokenizing delegations into share tokens, redeeming them, and moving
//! record ownership.

use lsm_store::{AccountKeeper, AccountKind, BankKeeper};
use lsm_types::{AccAddress, Amount, Coin, Dec, ValAddress};

use crate::context::Context;
use crate::error::StakingError;
use crate::events::StakingEvent;
use crate::keeper::Keeper;
use crate::liquid_stake::liquid_tokens;
use crate::tokenize_share_record::TokenizeShareRecord;

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    /// Convert `amount` of `delegator`'s delegation to `operator` into share
    /// tokens paid to `share_owner`. Returns the minted coin.
    ///
    /// The delegation shares themselves move to a fresh custodian, so the
    /// validator's exchange rate is unchanged and redeeming every share token
    /// gives back exactly the shares that were tokenized.
    pub fn tokenize_shares(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        operator: &ValAddress,
        amount: &Coin,
        share_owner: &AccAddress,
    ) -> Result<Coin, StakingError> {
        let validator = self.validator(ctx, operator)?;
        if self.get_tokenize_shares_lock(ctx, delegator)?.is_locked() {
            return Err(StakingError::TokenizeSharesDisabledForAccount);
        }
        let delegation = self.delegation(ctx, delegator, operator)?;
        if delegation.validator_bond {
            return Err(StakingError::ValidatorBondNotAllowedForTokenizeShare);
        }

        let bond_denom = self.bond_denom(ctx)?;
        if amount.denom != bond_denom {
            return Err(StakingError::BadDenom {
                got: amount.denom.clone(),
                expected: bond_denom,
            });
        }
        let requested = Dec::checked_from_amount(amount.amount).ok_or(StakingError::InvalidAmount)?;
        if requested > validator.tokens_from_shares(delegation.shares) {
            return Err(StakingError::NotEnoughDelegationShares);
        }

        let now = ctx.block_time();
        let account = self.accounts().get_account(ctx.store(), delegator)?;
        if let Some(vesting) = account.as_ref().and_then(|a| a.vesting()) {
            if amount.amount > vesting.free_delegated(now) {
                return Err(StakingError::ExceedingFreeVestingDelegations);
            }
        }

        let shares = self.validate_unbond_amount(ctx, delegator, operator, amount.amount)?;
        let tokens = liquid_tokens(&validator, shares);
        if tokens.is_zero() {
            return Err(StakingError::InvalidAmount);
        }

        if self.holds_liquid_stake(ctx, delegator)? {
            // already liquid; only truncation can move the counter
            let before = liquid_tokens(&validator, delegation.shares);
            let after = liquid_tokens(&validator, delegation.shares - shares) + tokens;
            self.adjust_total_liquid_staked_tokens(ctx, before, after)?;
        } else {
            self.increase_liquid_stake(ctx, operator, tokens, shares)?;
        }

        let id = self.next_tokenize_share_record_id(ctx)?;
        let record = TokenizeShareRecord::new(id, share_owner.clone(), operator.clone());
        self.accounts()
            .new_module_account(ctx.store_mut(), &record.module_account)?;
        self.add_tokenize_share_record(ctx, &record)?;
        self.transfer_delegation_shares(ctx, delegator, &record.module_address(), operator, shares)?;

        if let Some(mut account) = account {
            if let AccountKind::Vesting(vesting) = &mut account.kind {
                vesting.track_undelegation(tokens);
                self.accounts().set_account(ctx.store_mut(), &account)?;
            }
        }

        let share_coin = Coin::new(record.share_token_denom(), tokens);
        self.bank().mint(ctx.store_mut(), share_owner, &share_coin)?;

        ctx.emit(StakingEvent::TokenizeShares {
            delegator: delegator.clone(),
            validator: operator.clone(),
            share_owner: share_owner.clone(),
            share_record_id: id,
            amount: share_coin.clone(),
        });
        tracing::info!(
            delegator = %delegator,
            validator = %operator,
            record = id,
            amount = %tokens,
            %shares,
            "shares tokenized"
        );
        Ok(share_coin)
    }

    /// Burn share tokens and move the matching slice of the custodian's
    /// delegation shares to `delegator`. Returns the bond tokens those shares
    /// are worth.
    pub fn redeem_tokens_for_shares(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        amount: &Coin,
    ) -> Result<Coin, StakingError> {
        let record = self.get_tokenize_share_record_by_denom(ctx, &amount.denom)?;
        let balance = self.bank().balance(ctx.store(), delegator, &amount.denom)?;
        if balance < amount.amount {
            return Err(StakingError::NotEnoughBalance);
        }

        let operator = record.validator.clone();
        let validator = self.validator(ctx, &operator)?;
        let custodian = record.module_address();
        let custodian_delegation = self.delegation(ctx, &custodian, &operator)?;

        let supply = self.bank().supply(ctx.store(), &amount.denom)?;
        if supply.is_zero() {
            return Err(StakingError::NotEnoughBalance);
        }
        let held = custodian_delegation.shares;
        let shares = Dec::checked_from_amount(amount.amount)
            .zip(Dec::checked_from_amount(supply))
            .and_then(|(amount, supply)| held.checked_mul_quo_truncate(amount, supply))
            .ok_or(StakingError::InvalidAmount)?
            .min(held);
        if !shares.is_positive() {
            return Err(StakingError::BadSharesAmount);
        }

        let remaining = liquid_tokens(&validator, held - shares);
        let returned = liquid_tokens(&validator, held) - remaining;
        let existing = self
            .get_delegation(ctx, delegator, &operator)?
            .map_or(Dec::ZERO, |d| d.shares);
        if self.holds_liquid_stake(ctx, delegator)? {
            let before = liquid_tokens(&validator, held) + liquid_tokens(&validator, existing);
            let after = remaining + liquid_tokens(&validator, existing + shares);
            self.adjust_total_liquid_staked_tokens(ctx, before, after)?;
        } else {
            self.adjust_total_liquid_staked_tokens(ctx, returned, Amount::ZERO)?;
            self.decrease_validator_liquid_shares(ctx, &operator, shares)?;
        }
        self.transfer_delegation_shares(ctx, &custodian, delegator, &operator, shares)?;

        if self.get_delegation(ctx, &custodian, &operator)?.is_none() {
            self.delete_tokenize_share_record(ctx, record.id)?;
            self.accounts().remove_account(ctx.store_mut(), &custodian)?;
            tracing::debug!(record = record.id, "tokenize share record fully redeemed");
        }

        let now = ctx.block_time();
        let burn_pool = self.not_bonded_pool();
        self.bank().send(ctx.store_mut(), now, delegator, &burn_pool, amount)?;
        self.bank().burn(ctx.store_mut(), &burn_pool, amount)?;

        let redeemed = Coin::new(self.bond_denom(ctx)?, returned);
        ctx.emit(StakingEvent::RedeemShares {
            delegator: delegator.clone(),
            validator: operator.clone(),
            amount: redeemed.clone(),
        });
        tracing::info!(delegator = %delegator, validator = %operator, amount = %returned, "shares redeemed");
        Ok(redeemed)
    }

    pub fn transfer_tokenize_share_record(
        &self,
        ctx: &mut Context<'_>,
        id: u64,
        sender: &AccAddress,
        new_owner: &AccAddress,
    ) -> Result<(), StakingError> {
        let record = self.get_tokenize_share_record(ctx, id)?;
        if &record.owner != sender {
            return Err(StakingError::NotTokenizeShareRecordOwner);
        }
        if self.get_tokenize_shares_lock(ctx, new_owner)?.is_locked() {
            return Err(StakingError::TokenizeSharesDisabledForAccount);
        }
        self.update_tokenize_share_record_owner(ctx, id, new_owner)?;

        ctx.emit(StakingEvent::TransferTokenizeShareRecord {
            share_record_id: id,
            sender: sender.clone(),
            new_owner: new_owner.clone(),
        });
        tracing::info!(record = id, sender = %sender, new_owner = %new_owner, "tokenize share record transferred");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TokenSource;
    use crate::testutil::*;
    use lsm_store::{BankKeeper, VestingState};
    use lsm_types::{Params, Timestamp};

    fn capped() -> Params {
        Params {
            global_liquid_staking_cap: Dec::percent(50),
            validator_liquid_staking_cap: Dec::percent(50),
            ..Params::default()
        }
    }

    /// Validator 1 self-bonds 1000; addr(2) delegates 500.
    fn with_delegator(keeper: &TestKeeper, ctx: &mut Context<'_>, params: Params) -> ValAddress {
        setup(keeper, ctx, params);
        let val = create_validator(keeper, ctx, 1, 1_000);
        fund(keeper, ctx, &addr(2), 500);
        keeper
            .delegate(ctx, &addr(2), Amount::new(500), TokenSource::Account, &val)
            .unwrap();
        val
    }

    #[test]
    fn test_tokenize_then_redeem_restores_delegation() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, capped());

        let minted = keeper
            .tokenize_shares(&mut ctx, &addr(2), &val, &stake(300), &addr(2))
            .unwrap();
        assert_eq!(minted.amount, Amount::new(300));
        assert_eq!(minted.denom, format!("{val}/1"));

        let record = keeper.get_tokenize_share_record(&ctx, 1).unwrap();
        assert_eq!(keeper.delegation(&ctx, &addr(2), &val).unwrap().shares, Dec::new(200));
        assert_eq!(
            keeper.delegation(&ctx, &record.module_address(), &val).unwrap().shares,
            Dec::new(300)
        );
        assert_eq!(keeper.total_liquid_staked_tokens(&ctx).unwrap(), Amount::new(300));
        assert_eq!(keeper.validator(&ctx, &val).unwrap().total_liquid_shares, Dec::new(300));
        assert!(keeper.is_tokenize_share_custodian(&ctx, &record.module_address()).unwrap());

        let redeemed = keeper.redeem_tokens_for_shares(&mut ctx, &addr(2), &minted).unwrap();
        assert_eq!(redeemed, stake(300));
        assert_eq!(keeper.delegation(&ctx, &addr(2), &val).unwrap().shares, Dec::new(500));
        assert_eq!(
            keeper.get_tokenize_share_record(&ctx, 1),
            Err(StakingError::TokenizeShareRecordNotExists)
        );
        assert!(keeper
            .accounts()
            .get_account(ctx.store(), &record.module_address())
            .unwrap()
            .is_none());
        assert_eq!(keeper.total_liquid_staked_tokens(&ctx).unwrap(), Amount::ZERO);
        assert_eq!(keeper.validator(&ctx, &val).unwrap().total_liquid_shares, Dec::ZERO);
        assert_eq!(keeper.bank().supply(ctx.store(), &minted.denom).unwrap(), Amount::ZERO);
        assert_eq!(keeper.validator(&ctx, &val).unwrap().tokens, Amount::new(1_500));
    }

    #[test]
    fn test_partial_redeem_keeps_record() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, Params::default());

        let minted = keeper
            .tokenize_shares(&mut ctx, &addr(2), &val, &stake(300), &addr(3))
            .unwrap();
        let part = Coin::new(minted.denom.clone(), 100u128);
        let redeemed = keeper.redeem_tokens_for_shares(&mut ctx, &addr(3), &part).unwrap();
        assert_eq!(redeemed, stake(100));
        assert_eq!(keeper.delegation(&ctx, &addr(3), &val).unwrap().shares, Dec::new(100));
        let record = keeper.get_tokenize_share_record(&ctx, 1).unwrap();
        assert_eq!(
            keeper.delegation(&ctx, &record.module_address(), &val).unwrap().shares,
            Dec::new(200)
        );
        assert_eq!(
            keeper.bank().balance(ctx.store(), &addr(3), &minted.denom).unwrap(),
            Amount::new(200)
        );
    }

    #[test]
    fn test_tokenize_more_than_delegated_fails_cleanly() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, capped());
        assert_eq!(
            keeper.tokenize_shares(&mut ctx, &addr(2), &val, &stake(501), &addr(2)),
            Err(StakingError::NotEnoughDelegationShares)
        );
        assert_eq!(keeper.delegation(&ctx, &addr(2), &val).unwrap().shares, Dec::new(500));
        assert_eq!(keeper.total_liquid_staked_tokens(&ctx).unwrap(), Amount::ZERO);
        assert_eq!(keeper.validator(&ctx, &val).unwrap().total_liquid_shares, Dec::ZERO);
        assert_eq!(keeper.last_tokenize_share_record_id(&ctx).unwrap(), 0);
    }

    #[test]
    fn test_tokenize_rejections() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, Params::default());

        assert!(matches!(
            keeper.tokenize_shares(&mut ctx, &addr(2), &val, &Coin::new("atom", 1u128), &addr(2)),
            Err(StakingError::BadDenom { .. })
        ));
        assert_eq!(
            keeper.tokenize_shares(&mut ctx, &addr(2), &valaddr(9), &stake(1), &addr(2)),
            Err(StakingError::NoValidatorFound)
        );
        assert_eq!(
            keeper.tokenize_shares(&mut ctx, &addr(7), &val, &stake(1), &addr(2)),
            Err(StakingError::NoDelegation)
        );

        keeper.disable_tokenize_shares(&mut ctx, &addr(2)).unwrap();
        assert_eq!(
            keeper.tokenize_shares(&mut ctx, &addr(2), &val, &stake(1), &addr(2)),
            Err(StakingError::TokenizeSharesDisabledForAccount)
        );

        keeper.validator_bond(&mut ctx, &addr(1), &val).unwrap();
        assert_eq!(
            keeper.tokenize_shares(&mut ctx, &addr(1), &val, &stake(1), &addr(1)),
            Err(StakingError::ValidatorBondNotAllowedForTokenizeShare)
        );
    }

    #[test]
    fn test_global_cap_zero_blocks_and_one_allows() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(
            &keeper,
            &mut ctx,
            Params {
                global_liquid_staking_cap: Dec::ZERO,
                ..Params::default()
            },
        );
        assert_eq!(
            keeper.tokenize_shares(&mut ctx, &addr(2), &val, &stake(1), &addr(2)),
            Err(StakingError::GlobalLiquidStakingCapExceeded)
        );

        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, Params::default());
        keeper
            .tokenize_shares(&mut ctx, &addr(2), &val, &stake(500), &addr(2))
            .unwrap();
    }

    #[test]
    fn test_vesting_account_limited_to_free_delegations() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        setup(&keeper, &mut ctx, Params::default());
        let val = create_validator(&keeper, &mut ctx, 1, 1_000);

        let holder = addr(3);
        register(
            &keeper,
            &mut ctx,
            &holder,
            AccountKind::Vesting(VestingState {
                original_vesting: Amount::new(100),
                end_time: Timestamp::new(START + 1_000_000),
                delegated_free: Amount::ZERO,
                delegated_vesting: Amount::ZERO,
            }),
        );
        fund(&keeper, &mut ctx, &holder, 150);
        keeper
            .delegate(&mut ctx, &holder, Amount::new(150), TokenSource::Account, &val)
            .unwrap();

        assert_eq!(
            keeper.tokenize_shares(&mut ctx, &holder, &val, &stake(60), &holder),
            Err(StakingError::ExceedingFreeVestingDelegations)
        );
        keeper
            .tokenize_shares(&mut ctx, &holder, &val, &stake(50), &holder)
            .unwrap();
        let account = keeper.accounts().get_account(ctx.store(), &holder).unwrap().unwrap();
        assert_eq!(account.vesting().unwrap().delegated_free, Amount::ZERO);
        assert_eq!(account.vesting().unwrap().delegated_vesting, Amount::new(100));
    }

    #[test]
    fn test_provider_tokenizing_leaves_counters() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        setup(&keeper, &mut ctx, capped());
        let val = create_validator(&keeper, &mut ctx, 1, 1_000);
        let ica = addr(4);
        register(&keeper, &mut ctx, &ica, AccountKind::Interchain);
        fund(&keeper, &mut ctx, &ica, 100);
        keeper
            .delegate(&mut ctx, &ica, Amount::new(100), TokenSource::Account, &val)
            .unwrap();

        keeper.tokenize_shares(&mut ctx, &ica, &val, &stake(100), &ica).unwrap();
        assert_eq!(keeper.total_liquid_staked_tokens(&ctx).unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_slash_between_tokenize_and_redeem() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, capped());

        let minted = keeper
            .tokenize_shares(&mut ctx, &addr(2), &val, &stake(300), &addr(2))
            .unwrap();
        keeper.slash(&mut ctx, &val, Dec::percent(10)).unwrap();
        // 300 liquid tokens lose 30
        assert_eq!(keeper.total_liquid_staked_tokens(&ctx).unwrap(), Amount::new(270));

        let redeemed = keeper.redeem_tokens_for_shares(&mut ctx, &addr(2), &minted).unwrap();
        assert_eq!(redeemed, stake(270));
        assert_eq!(keeper.total_liquid_staked_tokens(&ctx).unwrap(), Amount::ZERO);
        assert_eq!(keeper.validator(&ctx, &val).unwrap().total_liquid_shares, Dec::ZERO);
        let delegation = keeper.delegation(&ctx, &addr(2), &val).unwrap();
        let v = keeper.validator(&ctx, &val).unwrap();
        assert_eq!(v.tokens_from_shares(delegation.shares).truncate_amount(), Amount::new(450));
    }

    #[test]
    fn test_round_trip_after_slash_restores_exact_shares() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, capped());
        keeper.slash(&mut ctx, &val, Dec::percent(1)).unwrap();
        let before = keeper.validator(&ctx, &val).unwrap();

        // 77 tokens at 0.99 is a non-terminating share count
        let minted = keeper
            .tokenize_shares(&mut ctx, &addr(2), &val, &stake(77), &addr(2))
            .unwrap();
        assert_eq!(minted.amount, Amount::new(77));
        assert_eq!(keeper.total_liquid_staked_tokens(&ctx).unwrap(), Amount::new(77));
        let v = keeper.validator(&ctx, &val).unwrap();
        assert_eq!((v.tokens, v.delegator_shares), (before.tokens, before.delegator_shares));

        let redeemed = keeper.redeem_tokens_for_shares(&mut ctx, &addr(2), &minted).unwrap();
        assert_eq!(redeemed, stake(77));
        assert_eq!(keeper.delegation(&ctx, &addr(2), &val).unwrap().shares, Dec::new(500));
        assert_eq!(keeper.total_liquid_staked_tokens(&ctx).unwrap(), Amount::ZERO);
        assert_eq!(keeper.validator(&ctx, &val).unwrap().total_liquid_shares, Dec::ZERO);
        assert_eq!(keeper.refresh_total_liquid_staked(&mut ctx).unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_counters_match_refresh_after_partial_redeems() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, capped());
        let ica = addr(4);
        register(&keeper, &mut ctx, &ica, AccountKind::Interchain);
        keeper.slash(&mut ctx, &val, Dec::percent(3)).unwrap();
        let now = ctx.block_time();

        let minted = keeper
            .tokenize_shares(&mut ctx, &addr(2), &val, &stake(133), &addr(3))
            .unwrap();
        keeper
            .bank()
            .send(ctx.store_mut(), now, &addr(3), &ica, &Coin::new(minted.denom.clone(), 41u128))
            .unwrap();
        keeper
            .redeem_tokens_for_shares(&mut ctx, &addr(3), &Coin::new(minted.denom.clone(), 29u128))
            .unwrap();
        keeper
            .redeem_tokens_for_shares(&mut ctx, &ica, &Coin::new(minted.denom.clone(), 41u128))
            .unwrap();

        let counter = keeper.total_liquid_staked_tokens(&ctx).unwrap();
        let liquid = keeper.validator(&ctx, &val).unwrap().total_liquid_shares;
        assert_eq!(keeper.refresh_total_liquid_staked(&mut ctx).unwrap(), counter);
        assert_eq!(keeper.validator(&ctx, &val).unwrap().total_liquid_shares, liquid);
    }

    #[test]
    fn test_redeem_errors() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, Params::default());
        let minted = keeper
            .tokenize_shares(&mut ctx, &addr(2), &val, &stake(100), &addr(2))
            .unwrap();

        assert_eq!(
            keeper.redeem_tokens_for_shares(&mut ctx, &addr(2), &Coin::new("nope/1", 1u128)),
            Err(StakingError::TokenizeShareRecordNotExists)
        );
        assert_eq!(
            keeper.redeem_tokens_for_shares(&mut ctx, &addr(2), &Coin::new(minted.denom.clone(), 101u128)),
            Err(StakingError::NotEnoughBalance)
        );
        assert_eq!(
            keeper.redeem_tokens_for_shares(&mut ctx, &addr(5), &minted),
            Err(StakingError::NotEnoughBalance)
        );
    }

    #[test]
    fn test_transfer_record() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();
        let val = with_delegator(&keeper, &mut ctx, Params::default());
        keeper
            .tokenize_shares(&mut ctx, &addr(2), &val, &stake(100), &addr(2))
            .unwrap();

        assert_eq!(
            keeper.transfer_tokenize_share_record(&mut ctx, 1, &addr(3), &addr(4)),
            Err(StakingError::NotTokenizeShareRecordOwner)
        );
        keeper.disable_tokenize_shares(&mut ctx, &addr(4)).unwrap();
        assert_eq!(
            keeper.transfer_tokenize_share_record(&mut ctx, 1, &addr(2), &addr(4)),
            Err(StakingError::TokenizeSharesDisabledForAccount)
        );
        keeper
            .transfer_tokenize_share_record(&mut ctx, 1, &addr(2), &addr(5))
            .unwrap();
        assert_eq!(keeper.get_tokenize_share_record(&ctx, 1).unwrap().owner, addr(5));
        assert!(matches!(
            ctx.events().last(),
            Some(StakingEvent::TransferTokenizeShareRecord { share_record_id: 1, .. })
        ));
    }
}
