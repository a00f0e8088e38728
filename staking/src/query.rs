//! Read-only accessors for collaborators and clients.

use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{AccAddress, Amount, Coin, Params, Timestamp, ValAddress};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::delegation::{Delegation, Redelegation, UnbondingDelegation};
use crate::error::StakingError;
use crate::keeper::Keeper;
use crate::lock::TokenizeShareLockStatus;
use crate::tokenize_share_record::TokenizeShareRecord;
use crate::validator::Validator;

/// A delegation together with its current token value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationResponse {
    pub delegation: Delegation,
    pub balance: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub bonded_tokens: Amount,
    pub not_bonded_tokens: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeShareLockInfo {
    /// "UNLOCKED", "LOCKED" or "LOCK_EXPIRING".
    pub status: String,
    pub expiration_time: Option<Timestamp>,
}

impl From<TokenizeShareLockStatus> for TokenizeShareLockInfo {
    fn from(status: TokenizeShareLockStatus) -> Self {
        let (label, expiration_time) = match status {
            TokenizeShareLockStatus::Unlocked => ("UNLOCKED", None),
            TokenizeShareLockStatus::Locked => ("LOCKED", None),
            TokenizeShareLockStatus::LockExpiring(t) => ("LOCK_EXPIRING", Some(t)),
        };
        Self {
            status: label.to_string(),
            expiration_time,
        }
    }
}

pub struct Querier<'k, B, A> {
    keeper: &'k Keeper<B, A>,
}

impl<'k, B: BankKeeper, A: AccountKeeper> Querier<'k, B, A> {
    pub fn new(keeper: &'k Keeper<B, A>) -> Self {
        Self { keeper }
    }

    pub fn validator(&self, ctx: &Context<'_>, operator: &ValAddress) -> Result<Validator, StakingError> {
        self.keeper.validator(ctx, operator)
    }

    pub fn validators(&self, ctx: &Context<'_>) -> Result<Vec<Validator>, StakingError> {
        self.keeper.all_validators(ctx)
    }

    pub fn delegation(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        operator: &ValAddress,
    ) -> Result<DelegationResponse, StakingError> {
        let delegation = self.keeper.delegation(ctx, delegator, operator)?;
        self.with_balance(ctx, delegation)
    }

    pub fn delegator_delegations(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
    ) -> Result<Vec<DelegationResponse>, StakingError> {
        self.keeper
            .delegator_delegations(ctx, delegator)?
            .into_iter()
            .map(|d| self.with_balance(ctx, d))
            .collect()
    }

    pub fn validator_delegations(
        &self,
        ctx: &Context<'_>,
        operator: &ValAddress,
    ) -> Result<Vec<DelegationResponse>, StakingError> {
        self.keeper
            .validator_delegations(ctx, operator)?
            .into_iter()
            .map(|d| self.with_balance(ctx, d))
            .collect()
    }

    fn with_balance(&self, ctx: &Context<'_>, delegation: Delegation) -> Result<DelegationResponse, StakingError> {
        let validator = self.keeper.validator(ctx, &delegation.validator)?;
        let tokens = validator.tokens_from_shares_truncated(delegation.shares).truncate_amount();
        Ok(DelegationResponse {
            balance: Coin::new(self.keeper.bond_denom(ctx)?, tokens),
            delegation,
        })
    }

    pub fn unbonding_delegation(
        &self,
        ctx: &Context<'_>,
        delegator: &AccAddress,
        operator: &ValAddress,
    ) -> Result<UnbondingDelegation, StakingError> {
        self.keeper
            .get_unbonding_delegation(ctx, delegator, operator)?
            .ok_or(StakingError::NoUnbondingDelegation)
    }

    pub fn redelegations(&self, ctx: &Context<'_>, delegator: &AccAddress) -> Result<Vec<Redelegation>, StakingError> {
        self.keeper.delegator_redelegations(ctx, delegator)
    }

    pub fn tokenize_share_record_by_id(&self, ctx: &Context<'_>, id: u64) -> Result<TokenizeShareRecord, StakingError> {
        self.keeper.get_tokenize_share_record(ctx, id)
    }

    pub fn tokenize_share_record_by_denom(
        &self,
        ctx: &Context<'_>,
        denom: &str,
    ) -> Result<TokenizeShareRecord, StakingError> {
        self.keeper.get_tokenize_share_record_by_denom(ctx, denom)
    }

    pub fn tokenize_share_records_owned(
        &self,
        ctx: &Context<'_>,
        owner: &AccAddress,
    ) -> Result<Vec<TokenizeShareRecord>, StakingError> {
        self.keeper.get_tokenize_share_records_by_owner(ctx, owner)
    }

    pub fn all_tokenize_share_records(&self, ctx: &Context<'_>) -> Result<Vec<TokenizeShareRecord>, StakingError> {
        self.keeper.all_tokenize_share_records(ctx)
    }

    pub fn last_tokenize_share_record_id(&self, ctx: &Context<'_>) -> Result<u64, StakingError> {
        self.keeper.last_tokenize_share_record_id(ctx)
    }

    pub fn total_tokenize_shared_assets(&self, ctx: &Context<'_>) -> Result<Coin, StakingError> {
        let total = self.keeper.total_tokenize_shared_assets(ctx)?;
        Ok(Coin::new(self.keeper.bond_denom(ctx)?, total))
    }

    pub fn total_liquid_staked(&self, ctx: &Context<'_>) -> Result<Amount, StakingError> {
        self.keeper.total_liquid_staked_tokens(ctx)
    }

    pub fn tokenize_share_lock_info(
        &self,
        ctx: &Context<'_>,
        address: &AccAddress,
    ) -> Result<TokenizeShareLockInfo, StakingError> {
        Ok(self.keeper.get_tokenize_shares_lock(ctx, address)?.into())
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<Params, StakingError> {
        self.keeper.params(ctx)
    }

    pub fn pool(&self, ctx: &Context<'_>) -> Result<Pool, StakingError> {
        Ok(Pool {
            bonded_tokens: self.keeper.pool_balance(ctx, &self.keeper.bonded_pool())?,
            not_bonded_tokens: self.keeper.pool_balance(ctx, &self.keeper.not_bonded_pool())?,
        })
    }
}
