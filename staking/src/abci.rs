//! End-of-block processing.

use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::Coin;

use crate::context::Context;
use crate::error::StakingError;
use crate::events::StakingEvent;
use crate::keeper::Keeper;

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    /// Run the per-block hooks in order: the epoch replay when the height
    /// closes an epoch, mature unbondings, mature redelegations, then the
    /// tokenize-share lock sweep.
    pub fn end_blocker(&self, ctx: &mut Context<'_>) -> Result<(), StakingError> {
        let height = ctx.block_height();
        let now = ctx.block_time();

        if height % self.params(ctx)?.epoch_interval == 0 {
            self.execute_epoch(ctx)?;
        }

        let denom = self.bond_denom(ctx)?;
        for pair in self.dequeue_mature_unbondings(ctx, now)? {
            match self.complete_unbonding(ctx, &pair.delegator, &pair.validator) {
                Ok(released) => ctx.emit(StakingEvent::CompleteUnbonding {
                    delegator: pair.delegator,
                    validator: pair.validator,
                    amount: Coin::new(denom.clone(), released),
                }),
                // slots can outlive their entries after a genesis import
                Err(StakingError::NoUnbondingDelegation) => continue,
                Err(err) => return Err(err),
            }
        }

        for triplet in self.dequeue_mature_redelegations(ctx, now)? {
            self.complete_redelegation(ctx, &triplet.delegator, &triplet.src_validator, &triplet.dst_validator)?;
            ctx.emit(StakingEvent::CompleteRedelegation {
                delegator: triplet.delegator,
                src_validator: triplet.src_validator,
                dst_validator: triplet.dst_validator,
            });
        }

        let unlocked = self.remove_expired_tokenize_share_locks(ctx, now)?;
        if !unlocked.is_empty() {
            tracing::debug!(height, count = unlocked.len(), "tokenize share locks expired");
        }
        for delegator in unlocked {
            ctx.emit(StakingEvent::TokenizeSharesUnlocked { delegator });
        }
        Ok(())
    }
}
