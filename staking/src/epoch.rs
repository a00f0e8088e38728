//! The epoch action queue.
//!
//! Deferred messages are stored under the current epoch number and replayed
//! when the block height reaches the next multiple of the epoch interval.
//! Each replayed action runs in its own branch; a failure refunds any
//! escrowed coins and never touches the other actions.

use lsm_store::codec::{decode, get_value, set_value};
use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{AccAddress, Coin, Timestamp};
use serde::{Deserialize, Serialize};

use crate::context::{BlockHeader, Context};
use crate::error::StakingError;
use crate::events::StakingEvent;
use crate::keeper::Keeper;
use crate::keys;
use crate::ledger::TokenSource;
use crate::msg::Msg;
use crate::msg_server::MsgServer;

/// Expected block spacing used to project the next epoch's block time.
pub const BLOCK_TIME_SECS: u64 = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEpochAction {
    pub epoch: u64,
    pub action_id: u64,
    pub msg: Msg,
}

/// Coins a deferred message parks in the epoch pool while it waits.
pub fn escrow_of(msg: &Msg) -> Option<(&AccAddress, &Coin)> {
    match msg {
        Msg::Delegate(m) => Some((&m.delegator, &m.amount)),
        Msg::CreateValidator(m) => Some((&m.delegator, &m.value)),
        _ => None,
    }
}

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    pub fn epoch_number(&self, ctx: &Context<'_>) -> Result<u64, StakingError> {
        Ok(get_value(ctx.store(), keys::EPOCH_NUMBER_KEY)?.unwrap_or(0))
    }

    pub fn set_epoch_number(&self, ctx: &mut Context<'_>, epoch: u64) -> Result<(), StakingError> {
        set_value(ctx.store_mut(), keys::EPOCH_NUMBER_KEY, &epoch)?;
        Ok(())
    }

    /// The id the next queued action will get. Ids start at 1.
    pub fn next_epoch_action_id(&self, ctx: &Context<'_>) -> Result<u64, StakingError> {
        Ok(get_value(ctx.store(), keys::NEXT_EPOCH_ACTION_ID_KEY)?.unwrap_or(1))
    }

    pub fn set_next_epoch_action_id(&self, ctx: &mut Context<'_>, id: u64) -> Result<(), StakingError> {
        set_value(ctx.store_mut(), keys::NEXT_EPOCH_ACTION_ID_KEY, &id)?;
        Ok(())
    }

    pub fn set_epoch_action(&self, ctx: &mut Context<'_>, action: &QueuedEpochAction) -> Result<(), StakingError> {
        set_value(
            ctx.store_mut(),
            &keys::epoch_action_key(action.epoch, action.action_id),
            &action.msg,
        )?;
        Ok(())
    }

    pub fn delete_epoch_action(&self, ctx: &mut Context<'_>, epoch: u64, action_id: u64) -> Result<(), StakingError> {
        ctx.store_mut().delete(&keys::epoch_action_key(epoch, action_id))?;
        Ok(())
    }

    /// Append `msg` to the current epoch's queue and return its action id.
    pub fn queue_msg_for_epoch(&self, ctx: &mut Context<'_>, msg: &Msg) -> Result<u64, StakingError> {
        let epoch = self.epoch_number(ctx)?;
        let action_id = self.next_epoch_action_id(ctx)?;
        self.set_epoch_action(
            ctx,
            &QueuedEpochAction {
                epoch,
                action_id,
                msg: msg.clone(),
            },
        )?;
        self.set_next_epoch_action_id(ctx, action_id + 1)?;
        tracing::debug!(epoch, action_id, msg = msg.type_name(), "message queued for epoch");
        Ok(action_id)
    }

    /// Actions queued under `epoch`, in submission order.
    pub fn epoch_actions(&self, ctx: &Context<'_>, epoch: u64) -> Result<Vec<QueuedEpochAction>, StakingError> {
        let mut prefix = vec![keys::EPOCH_ACTION_QUEUE_PREFIX];
        prefix.extend_from_slice(&epoch.to_be_bytes());
        self.decode_actions(ctx.store().iter_prefix(&prefix)?)
    }

    pub fn all_epoch_actions(&self, ctx: &Context<'_>) -> Result<Vec<QueuedEpochAction>, StakingError> {
        self.decode_actions(ctx.store().iter_prefix(&[keys::EPOCH_ACTION_QUEUE_PREFIX])?)
    }

    fn decode_actions(&self, entries: Vec<(Vec<u8>, Vec<u8>)>) -> Result<Vec<QueuedEpochAction>, StakingError> {
        entries
            .into_iter()
            .map(|(key, bytes)| -> Result<QueuedEpochAction, StakingError> {
                let (epoch, action_id) = keys::parse_epoch_action_key(&key)
                    .ok_or_else(|| StakingError::InvalidGenesis("malformed epoch action key".to_string()))?;
                let msg: Msg = decode(&bytes)?;
                Ok(QueuedEpochAction { epoch, action_id, msg })
            })
            .collect()
    }

    /// First block height at or after the current one that closes an epoch.
    pub fn next_epoch_height(&self, ctx: &Context<'_>) -> Result<u64, StakingError> {
        let interval = self.params(ctx)?.epoch_interval;
        Ok(ctx.block_height().div_ceil(interval) * interval)
    }

    /// Projected block time of [`Self::next_epoch_height`].
    pub fn next_epoch_time(&self, ctx: &Context<'_>) -> Result<Timestamp, StakingError> {
        let remaining = self.next_epoch_height(ctx)? - ctx.block_height();
        Ok(ctx.block_time().plus_secs(remaining * BLOCK_TIME_SECS))
    }

    pub fn next_epoch_header(&self, ctx: &Context<'_>) -> Result<BlockHeader, StakingError> {
        Ok(BlockHeader::new(self.next_epoch_height(ctx)?, self.next_epoch_time(ctx)?))
    }

    /// Park `coin` from `owner` in the epoch pool.
    pub fn escrow_epoch_coins(&self, ctx: &mut Context<'_>, owner: &AccAddress, coin: &Coin) -> Result<(), StakingError> {
        let now = ctx.block_time();
        let pool = self.epoch_delegation_pool();
        self.bank().delegate_coins(ctx.store_mut(), now, owner, &pool, coin)?;
        Ok(())
    }

    /// Return escrowed `coin` to `owner`.
    pub fn refund_epoch_escrow(&self, ctx: &mut Context<'_>, owner: &AccAddress, coin: &Coin) -> Result<(), StakingError> {
        let pool = self.epoch_delegation_pool();
        self.bank().undelegate_coins(ctx.store_mut(), &pool, owner, coin)?;
        Ok(())
    }

    /// Replay and commit every action of the current epoch, then advance the
    /// epoch number.
    pub fn execute_epoch(&self, ctx: &mut Context<'_>) -> Result<(), StakingError> {
        let epoch = self.epoch_number(ctx)?;
        let actions = self.epoch_actions(ctx, epoch)?;
        let server = MsgServer::new(self);
        let mut failed = 0usize;

        for action in &actions {
            let result = ctx.branch(|c| server.deliver(c, &action.msg, TokenSource::EpochEscrow));
            if let Err(err) = result {
                failed += 1;
                tracing::warn!(
                    epoch,
                    action_id = action.action_id,
                    msg = action.msg.type_name(),
                    error = %err,
                    "queued epoch action failed"
                );
                if let Some((owner, coin)) = escrow_of(&action.msg) {
                    self.refund_epoch_escrow(ctx, owner, coin)?;
                }
                ctx.emit(StakingEvent::EpochActionFailed {
                    epoch,
                    action_id: action.action_id,
                    reason: err.to_string(),
                });
            }
            self.delete_epoch_action(ctx, epoch, action.action_id)?;
        }

        self.set_epoch_number(ctx, epoch + 1)?;
        tracing::info!(epoch, actions = actions.len(), failed, "epoch executed");
        Ok(())
    }
}
