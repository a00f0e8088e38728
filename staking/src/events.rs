//! Events emitted by state-changing operations.

use lsm_types::{AccAddress, Amount, Coin, Dec, Timestamp, ValAddress};
use serde::{Deserialize, Serialize};

/// Staking-level events that observers read from the [`crate::Context`]
/// after a message or block hook has run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingEvent {
    CreateValidator {
        validator: ValAddress,
        amount: Coin,
    },
    EditValidator {
        validator: ValAddress,
        commission_rate: Dec,
        min_self_delegation: Amount,
    },
    Delegate {
        delegator: AccAddress,
        validator: ValAddress,
        amount: Coin,
        new_shares: Dec,
    },
    Unbond {
        delegator: AccAddress,
        validator: ValAddress,
        amount: Coin,
        completion_time: Timestamp,
    },
    Redelegate {
        delegator: AccAddress,
        src_validator: ValAddress,
        dst_validator: ValAddress,
        amount: Coin,
        completion_time: Timestamp,
    },
    CompleteUnbonding {
        delegator: AccAddress,
        validator: ValAddress,
        amount: Coin,
    },
    CompleteRedelegation {
        delegator: AccAddress,
        src_validator: ValAddress,
        dst_validator: ValAddress,
    },
    TokenizeShares {
        delegator: AccAddress,
        validator: ValAddress,
        share_owner: AccAddress,
        share_record_id: u64,
        amount: Coin,
    },
    RedeemShares {
        delegator: AccAddress,
        validator: ValAddress,
        amount: Coin,
    },
    TransferTokenizeShareRecord {
        share_record_id: u64,
        sender: AccAddress,
        new_owner: AccAddress,
    },
    ValidatorBond {
        delegator: AccAddress,
        validator: ValAddress,
    },
    DisableTokenizeShares {
        delegator: AccAddress,
    },
    EnableTokenizeShares {
        delegator: AccAddress,
        completion_time: Timestamp,
    },
    TokenizeSharesUnlocked {
        delegator: AccAddress,
    },
    UnbondValidator {
        validator: ValAddress,
    },
    Slash {
        validator: ValAddress,
        fraction: Dec,
        burned: Amount,
    },
    EpochActionFailed {
        epoch: u64,
        action_id: u64,
        reason: String,
    },
}
