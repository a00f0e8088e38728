//! Per-account tokenize-share locks and the time-bucketed queue that lifts
//! them once the unbonding period has passed.
//!
//! An account without a lock record is unlocked. Disabling tokenization
//! writes a `Locked` record; re-enabling turns it into `LockExpiring(t)` and
//! files the account in the pending bucket for `t`. The end-of-block sweep
//! deletes every bucket at or before the block time and the locks in it.

use lsm_store::codec::{decode, get_value, set_value};
use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{AccAddress, Timestamp};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::StakingError;
use crate::keeper::Keeper;
use crate::keys;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenizeShareLockStatus {
    #[default]
    Unlocked,
    Locked,
    /// Locked until the given block time.
    LockExpiring(Timestamp),
}

impl TokenizeShareLockStatus {
    /// Whether tokenizing is currently forbidden.
    pub fn is_locked(&self) -> bool {
        !matches!(self, Self::Unlocked)
    }
}

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    pub fn get_tokenize_shares_lock(
        &self,
        ctx: &Context<'_>,
        address: &AccAddress,
    ) -> Result<TokenizeShareLockStatus, StakingError> {
        Ok(get_value(ctx.store(), &keys::tokenize_shares_lock_key(address))?.unwrap_or_default())
    }

    pub fn add_tokenize_shares_lock(&self, ctx: &mut Context<'_>, address: &AccAddress) -> Result<(), StakingError> {
        set_value(
            ctx.store_mut(),
            &keys::tokenize_shares_lock_key(address),
            &TokenizeShareLockStatus::Locked,
        )?;
        Ok(())
    }

    pub fn remove_tokenize_shares_lock(&self, ctx: &mut Context<'_>, address: &AccAddress) -> Result<(), StakingError> {
        ctx.store_mut().delete(&keys::tokenize_shares_lock_key(address))?;
        Ok(())
    }

    pub fn set_tokenize_shares_unlock_time(
        &self,
        ctx: &mut Context<'_>,
        address: &AccAddress,
        unlock_time: Timestamp,
    ) -> Result<(), StakingError> {
        set_value(
            ctx.store_mut(),
            &keys::tokenize_shares_lock_key(address),
            &TokenizeShareLockStatus::LockExpiring(unlock_time),
        )?;
        Ok(())
    }

    pub fn all_tokenize_share_locks(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<(AccAddress, TokenizeShareLockStatus)>, StakingError> {
        let prefix = [keys::TOKENIZE_SHARES_LOCK_PREFIX];
        ctx.store()
            .iter_prefix(&prefix)?
            .into_iter()
            .map(|(key, bytes)| -> Result<_, StakingError> { Ok((AccAddress::new(&key[1..]), decode(&bytes)?)) })
            .collect()
    }

    // ── Pending buckets ─────────────────────────────────────────────────

    pub fn get_pending_tokenize_share_authorizations(
        &self,
        ctx: &Context<'_>,
        time: Timestamp,
    ) -> Result<Vec<AccAddress>, StakingError> {
        Ok(get_value(ctx.store(), &keys::pending_tokenize_share_authorization_key(time))?.unwrap_or_default())
    }

    /// Write a bucket. An empty bucket is deleted.
    pub fn set_pending_tokenize_share_authorizations(
        &self,
        ctx: &mut Context<'_>,
        time: Timestamp,
        addresses: &[AccAddress],
    ) -> Result<(), StakingError> {
        let key = keys::pending_tokenize_share_authorization_key(time);
        if addresses.is_empty() {
            ctx.store_mut().delete(&key)?;
        } else {
            set_value(ctx.store_mut(), &key, &addresses.to_vec())?;
        }
        Ok(())
    }

    pub fn all_pending_tokenize_share_authorizations(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<(Timestamp, Vec<AccAddress>)>, StakingError> {
        let prefix = [keys::PENDING_TOKENIZE_SHARE_AUTHORIZATION_PREFIX];
        ctx.store()
            .iter_prefix(&prefix)?
            .into_iter()
            .map(|(key, bytes)| -> Result<_, StakingError> { Ok((bucket_time(&key)?, decode(&bytes)?)) })
            .collect()
    }

    /// Start the countdown on `address`'s lock and return when it lifts.
    pub fn queue_tokenize_shares_authorization(
        &self,
        ctx: &mut Context<'_>,
        address: &AccAddress,
    ) -> Result<Timestamp, StakingError> {
        let unlock_time = ctx.block_time().plus_secs(self.params(ctx)?.unbonding_time_secs);
        let mut bucket = self.get_pending_tokenize_share_authorizations(ctx, unlock_time)?;
        bucket.push(address.clone());
        self.set_pending_tokenize_share_authorizations(ctx, unlock_time, &bucket)?;
        self.set_tokenize_shares_unlock_time(ctx, address, unlock_time)?;
        Ok(unlock_time)
    }

    /// Take `address` out of the bucket at `unlock_time`.
    pub fn cancel_tokenize_share_lock_expiration(
        &self,
        ctx: &mut Context<'_>,
        address: &AccAddress,
        unlock_time: Timestamp,
    ) -> Result<(), StakingError> {
        let mut bucket = self.get_pending_tokenize_share_authorizations(ctx, unlock_time)?;
        bucket.retain(|a| a != address);
        self.set_pending_tokenize_share_authorizations(ctx, unlock_time, &bucket)
    }

    /// Lift every lock whose unlock time is at or before `cutoff`, oldest
    /// bucket first, and return the unlocked addresses.
    pub fn remove_expired_tokenize_share_locks(
        &self,
        ctx: &mut Context<'_>,
        cutoff: Timestamp,
    ) -> Result<Vec<AccAddress>, StakingError> {
        let start = [keys::PENDING_TOKENIZE_SHARE_AUTHORIZATION_PREFIX];
        let end = keys::pending_tokenize_share_authorization_key(cutoff.plus_secs(1));
        let buckets = ctx.store().range(&start, Some(&end))?;

        let mut unlocked = Vec::new();
        for (key, bytes) in buckets {
            let addresses: Vec<AccAddress> = decode(&bytes)?;
            for address in &addresses {
                self.remove_tokenize_shares_lock(ctx, address)?;
            }
            ctx.store_mut().delete(&key)?;
            unlocked.extend(addresses);
        }
        tracing::debug!(%cutoff, unlocked = unlocked.len(), "tokenize share locks swept");
        Ok(unlocked)
    }

    // ── Message semantics ───────────────────────────────────────────────

    /// Lock `address` against tokenizing, cancelling a pending unlock if any.
    pub fn disable_tokenize_shares(&self, ctx: &mut Context<'_>, address: &AccAddress) -> Result<(), StakingError> {
        match self.get_tokenize_shares_lock(ctx, address)? {
            TokenizeShareLockStatus::Locked => return Err(StakingError::TokenizeSharesAlreadyDisabledForAccount),
            TokenizeShareLockStatus::LockExpiring(unlock_time) => {
                self.cancel_tokenize_share_lock_expiration(ctx, address, unlock_time)?;
            }
            TokenizeShareLockStatus::Unlocked => {}
        }
        self.add_tokenize_shares_lock(ctx, address)?;
        tracing::info!(delegator = %address, "tokenize shares disabled");
        Ok(())
    }

    /// Schedule removal of `address`'s lock after the unbonding period.
    pub fn enable_tokenize_shares(&self, ctx: &mut Context<'_>, address: &AccAddress) -> Result<Timestamp, StakingError> {
        match self.get_tokenize_shares_lock(ctx, address)? {
            TokenizeShareLockStatus::Locked => {
                let unlock_time = self.queue_tokenize_shares_authorization(ctx, address)?;
                let wait = lsm_utils::format_duration(ctx.block_time().until(unlock_time));
                tracing::info!(delegator = %address, unlock_time = %unlock_time, %wait, "tokenize shares enable queued");
                Ok(unlock_time)
            }
            _ => Err(StakingError::TokenizeSharesAlreadyEnabledForAccount),
        }
    }
}

fn bucket_time(key: &[u8]) -> Result<Timestamp, StakingError> {
    let bytes: [u8; 8] = key
        .get(1..9)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| StakingError::InvalidGenesis("malformed pending authorization key".to_string()))?;
    Ok(Timestamp::from_be_bytes(bytes))
}
