//! Message routing.
//!
//! [`MsgServer::handle`] is the entry point for submitted messages: it runs
//! stateless validation and then the message inside one cache branch, so a
//! failure leaves no trace. Epoch-deferred messages are escrowed, queued and
//! shadow-executed against the projected next epoch; the rest are delivered
//! immediately.

use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{AccAddress, Amount, Coin, Dec, ValAddress};

use crate::context::Context;
use crate::epoch::escrow_of;
use crate::error::StakingError;
use crate::events::StakingEvent;
use crate::keeper::Keeper;
use crate::ledger::TokenSource;
use crate::msg::{
    Msg, MsgBeginRedelegate, MsgCreateValidator, MsgDelegate, MsgEditValidator, MsgResponse, MsgUndelegate,
};
use crate::validator::{Commission, Validator};

pub struct MsgServer<'k, B, A> {
    keeper: &'k Keeper<B, A>,
}

impl<'k, B: BankKeeper, A: AccountKeeper> MsgServer<'k, B, A> {
    pub fn new(keeper: &'k Keeper<B, A>) -> Self {
        Self { keeper }
    }

    pub fn handle(&self, ctx: &mut Context<'_>, msg: Msg) -> Result<MsgResponse, StakingError> {
        msg.validate_basic()?;
        let result = ctx.branch(|ctx| {
            if msg.is_epoch_deferred() {
                self.queue_for_epoch(ctx, &msg)
            } else {
                self.deliver(ctx, &msg, TokenSource::Account)
            }
        });
        if let Err(err) = &result {
            tracing::debug!(msg = msg.type_name(), error = %err, "message rejected");
        }
        result
    }

    /// Escrow, queue and shadow-execute a deferred message. A shadow failure
    /// rejects the message.
    fn queue_for_epoch(&self, ctx: &mut Context<'_>, msg: &Msg) -> Result<MsgResponse, StakingError> {
        if let Some((owner, coin)) = escrow_of(msg) {
            self.check_bond_denom(ctx, coin)?;
            self.keeper.escrow_epoch_coins(ctx, owner, coin)?;
        }
        let action_id = self.keeper.queue_msg_for_epoch(ctx, msg)?;
        let header = self.keeper.next_epoch_header(ctx)?;
        let response = ctx.simulate(header, |sim| self.deliver(sim, msg, TokenSource::EpochEscrow))?;
        tracing::debug!(action_id, msg = msg.type_name(), "deferred message accepted");
        Ok(response)
    }

    /// Apply `msg` to `ctx` now. Delegated coins come from `source`.
    pub fn deliver(&self, ctx: &mut Context<'_>, msg: &Msg, source: TokenSource) -> Result<MsgResponse, StakingError> {
        let k = self.keeper;
        match msg {
            Msg::CreateValidator(m) => self.create_validator(ctx, m, source),
            Msg::EditValidator(m) => self.edit_validator(ctx, m),
            Msg::Delegate(m) => self.delegate(ctx, m, source),
            Msg::Undelegate(m) => self.undelegate(ctx, m),
            Msg::BeginRedelegate(m) => self.begin_redelegate(ctx, m),
            Msg::TokenizeShares(m) => {
                let amount = k.tokenize_shares(ctx, &m.delegator, &m.validator, &m.amount, &m.tokenized_share_owner)?;
                Ok(MsgResponse::TokenizeShares { amount })
            }
            Msg::RedeemTokensForShares(m) => {
                let amount = k.redeem_tokens_for_shares(ctx, &m.delegator, &m.amount)?;
                Ok(MsgResponse::RedeemTokensForShares { amount })
            }
            Msg::TransferTokenizeShareRecord(m) => {
                k.transfer_tokenize_share_record(ctx, m.record_id, &m.sender, &m.new_owner)?;
                Ok(MsgResponse::TransferTokenizeShareRecord)
            }
            Msg::ValidatorBond(m) => {
                k.validator_bond(ctx, &m.delegator, &m.validator)?;
                Ok(MsgResponse::ValidatorBond)
            }
            Msg::DisableTokenizeShares(m) => {
                k.disable_tokenize_shares(ctx, &m.delegator)?;
                ctx.emit(StakingEvent::DisableTokenizeShares {
                    delegator: m.delegator.clone(),
                });
                Ok(MsgResponse::DisableTokenizeShares)
            }
            Msg::EnableTokenizeShares(m) => {
                let completion_time = k.enable_tokenize_shares(ctx, &m.delegator)?;
                ctx.emit(StakingEvent::EnableTokenizeShares {
                    delegator: m.delegator.clone(),
                    completion_time,
                });
                Ok(MsgResponse::EnableTokenizeShares { completion_time })
            }
            Msg::UnbondValidator(m) => {
                k.jail(ctx, &m.validator)?;
                ctx.emit(StakingEvent::UnbondValidator {
                    validator: m.validator.clone(),
                });
                Ok(MsgResponse::UnbondValidator)
            }
        }
    }

    fn check_bond_denom(&self, ctx: &Context<'_>, coin: &Coin) -> Result<(), StakingError> {
        let expected = self.keeper.bond_denom(ctx)?;
        if coin.denom != expected {
            return Err(StakingError::BadDenom {
                got: coin.denom.clone(),
                expected,
            });
        }
        Ok(())
    }

    /// Delegate, running the liquid caps first when the delegator is a
    /// liquid staking provider.
    fn delegate_with_caps(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        amount: Amount,
        source: TokenSource,
        operator: &ValAddress,
    ) -> Result<Dec, StakingError> {
        let k = self.keeper;
        let validator = k.validator(ctx, operator)?;
        if k.is_liquid_staking_provider(ctx, delegator)? {
            let shares = prospective_shares(&validator, amount)?;
            k.increase_liquid_stake(ctx, operator, amount, shares)?;
        }
        k.delegate(ctx, delegator, amount, source, operator)
    }

    fn create_validator(
        &self,
        ctx: &mut Context<'_>,
        m: &MsgCreateValidator,
        source: TokenSource,
    ) -> Result<MsgResponse, StakingError> {
        let k = self.keeper;
        self.check_bond_denom(ctx, &m.value)?;
        if k.get_validator(ctx, &m.validator)?.is_some() {
            return Err(StakingError::ValidatorOwnerExists);
        }
        if k.validator_by_cons(ctx, &m.consensus_pubkey)?.is_some() {
            return Err(StakingError::ValidatorPubKeyExists);
        }
        if m.commission.rate < k.params(ctx)?.min_commission_rate {
            return Err(StakingError::CommissionRules(
                "commission rate cannot be less than the min commission rate".to_string(),
            ));
        }

        let validator = Validator::new(
            m.validator.clone(),
            m.consensus_pubkey.clone(),
            m.description.clone(),
            Commission::new(m.commission, ctx.block_time()),
            m.min_self_delegation,
        );
        k.set_validator(ctx, &validator)?;
        k.set_validator_by_cons(ctx, &validator)?;
        self.delegate_with_caps(ctx, &m.delegator, m.value.amount, source, &m.validator)?;

        ctx.emit(StakingEvent::CreateValidator {
            validator: m.validator.clone(),
            amount: m.value.clone(),
        });
        tracing::info!(validator = %m.validator, amount = %m.value, "validator created");
        Ok(MsgResponse::CreateValidator)
    }

    fn edit_validator(&self, ctx: &mut Context<'_>, m: &MsgEditValidator) -> Result<MsgResponse, StakingError> {
        let k = self.keeper;
        let mut validator = k.validator(ctx, &m.validator)?;
        validator.description = validator.description.update(&m.description)?;

        if let Some(rate) = m.commission_rate {
            if rate < k.params(ctx)?.min_commission_rate {
                return Err(StakingError::CommissionRules(
                    "commission rate cannot be less than the min commission rate".to_string(),
                ));
            }
            let now = ctx.block_time();
            validator.commission.validate_new_rate(rate, now)?;
            validator.commission.rates.rate = rate;
            validator.commission.update_time = now;
        }

        if let Some(min) = m.min_self_delegation {
            if min <= validator.min_self_delegation {
                return Err(StakingError::MinSelfDelegationDecreased);
            }
            if min > validator.tokens {
                return Err(StakingError::SelfDelegationBelowMinimum);
            }
            validator.min_self_delegation = min;
        }

        k.set_validator(ctx, &validator)?;
        ctx.emit(StakingEvent::EditValidator {
            validator: m.validator.clone(),
            commission_rate: validator.commission.rates.rate,
            min_self_delegation: validator.min_self_delegation,
        });
        tracing::info!(validator = %m.validator, "validator edited");
        Ok(MsgResponse::EditValidator)
    }

    fn delegate(&self, ctx: &mut Context<'_>, m: &MsgDelegate, source: TokenSource) -> Result<MsgResponse, StakingError> {
        self.check_bond_denom(ctx, &m.amount)?;
        let new_shares = self.delegate_with_caps(ctx, &m.delegator, m.amount.amount, source, &m.validator)?;
        ctx.emit(StakingEvent::Delegate {
            delegator: m.delegator.clone(),
            validator: m.validator.clone(),
            amount: m.amount.clone(),
            new_shares,
        });
        tracing::info!(delegator = %m.delegator, validator = %m.validator, amount = %m.amount, "delegated");
        Ok(MsgResponse::Delegate)
    }

    fn undelegate(&self, ctx: &mut Context<'_>, m: &MsgUndelegate) -> Result<MsgResponse, StakingError> {
        let k = self.keeper;
        self.check_bond_denom(ctx, &m.amount)?;
        let shares = k.validate_unbond_amount(ctx, &m.delegator, &m.validator, m.amount.amount)?;
        if k.is_liquid_staking_provider(ctx, &m.delegator)? {
            k.decrease_liquid_stake(ctx, &m.validator, m.amount.amount, shares)?;
        }

        let (completion_time, amount) = k.undelegate(ctx, &m.delegator, &m.validator, shares)?;
        let amount = Coin::new(m.amount.denom.clone(), amount);
        ctx.emit(StakingEvent::Unbond {
            delegator: m.delegator.clone(),
            validator: m.validator.clone(),
            amount: amount.clone(),
            completion_time,
        });
        Ok(MsgResponse::Undelegate {
            completion_time,
            amount,
        })
    }

    fn begin_redelegate(&self, ctx: &mut Context<'_>, m: &MsgBeginRedelegate) -> Result<MsgResponse, StakingError> {
        let k = self.keeper;
        self.check_bond_denom(ctx, &m.amount)?;
        let shares = k.validate_unbond_amount(ctx, &m.delegator, &m.src_validator, m.amount.amount)?;
        if k.is_liquid_staking_provider(ctx, &m.delegator)? && m.src_validator != m.dst_validator {
            let dst = k.validator(ctx, &m.dst_validator)?;
            let dst_shares = prospective_shares_truncated(&dst, m.amount.amount)?;
            k.safely_increase_validator_liquid_shares(ctx, &m.dst_validator, dst_shares)?;
            k.decrease_validator_liquid_shares(ctx, &m.src_validator, shares)?;
        }

        let (completion_time, _) =
            k.begin_redelegation(ctx, &m.delegator, &m.src_validator, &m.dst_validator, shares)?;
        ctx.emit(StakingEvent::Redelegate {
            delegator: m.delegator.clone(),
            src_validator: m.src_validator.clone(),
            dst_validator: m.dst_validator.clone(),
            amount: m.amount.clone(),
            completion_time,
        });
        Ok(MsgResponse::BeginRedelegate { completion_time })
    }
}

/// Shares `amount` would be issued by `validator`.
fn prospective_shares(validator: &Validator, amount: Amount) -> Result<Dec, StakingError> {
    if validator.delegator_shares.is_zero() {
        return Dec::checked_from_amount(amount).ok_or(StakingError::InvalidAmount);
    }
    validator.shares_from_tokens(amount)
}

fn prospective_shares_truncated(validator: &Validator, amount: Amount) -> Result<Dec, StakingError> {
    if validator.delegator_shares.is_zero() {
        return Dec::checked_from_amount(amount).ok_or(StakingError::InvalidAmount);
    }
    validator.shares_from_tokens_truncated(amount)
}
