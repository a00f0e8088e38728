//! Staking messages and their stateless validation.
//!
//! Stateful checks (denominations against params, balances, caps) happen
//! when the message is delivered.

use lsm_types::{AccAddress, Amount, Coin, Dec, Timestamp, ValAddress};
use serde::{Deserialize, Serialize};

use crate::error::StakingError;
use crate::validator::{CommissionRates, Description};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateValidator {
    pub description: Description,
    pub commission: CommissionRates,
    pub min_self_delegation: Amount,
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub consensus_pubkey: String,
    pub value: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEditValidator {
    pub validator: ValAddress,
    /// Fields set to [`crate::validator::DO_NOT_MODIFY`] are left as they are.
    pub description: Description,
    pub commission_rate: Option<Dec>,
    pub min_self_delegation: Option<Amount>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegate {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub amount: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUndelegate {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub amount: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBeginRedelegate {
    pub delegator: AccAddress,
    pub src_validator: ValAddress,
    pub dst_validator: ValAddress,
    pub amount: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTokenizeShares {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub amount: Coin,
    pub tokenized_share_owner: AccAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRedeemTokensForShares {
    pub delegator: AccAddress,
    pub amount: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTransferTokenizeShareRecord {
    pub record_id: u64,
    pub sender: AccAddress,
    pub new_owner: AccAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgValidatorBond {
    pub delegator: AccAddress,
    pub validator: ValAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDisableTokenizeShares {
    pub delegator: AccAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEnableTokenizeShares {
    pub delegator: AccAddress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUnbondValidator {
    pub validator: ValAddress,
}

/// Every message the staking module accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    CreateValidator(MsgCreateValidator),
    EditValidator(MsgEditValidator),
    Delegate(MsgDelegate),
    Undelegate(MsgUndelegate),
    BeginRedelegate(MsgBeginRedelegate),
    TokenizeShares(MsgTokenizeShares),
    RedeemTokensForShares(MsgRedeemTokensForShares),
    TransferTokenizeShareRecord(MsgTransferTokenizeShareRecord),
    ValidatorBond(MsgValidatorBond),
    DisableTokenizeShares(MsgDisableTokenizeShares),
    EnableTokenizeShares(MsgEnableTokenizeShares),
    UnbondValidator(MsgUnbondValidator),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsgResponse {
    CreateValidator,
    EditValidator,
    Delegate,
    Undelegate { completion_time: Timestamp, amount: Coin },
    BeginRedelegate { completion_time: Timestamp },
    TokenizeShares { amount: Coin },
    RedeemTokensForShares { amount: Coin },
    TransferTokenizeShareRecord,
    ValidatorBond,
    DisableTokenizeShares,
    EnableTokenizeShares { completion_time: Timestamp },
    UnbondValidator,
}

impl Msg {
    /// Messages that are queued and applied at the next epoch boundary.
    pub fn is_epoch_deferred(&self) -> bool {
        matches!(
            self,
            Msg::CreateValidator(_) | Msg::EditValidator(_) | Msg::Delegate(_) | Msg::Undelegate(_) | Msg::BeginRedelegate(_)
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Msg::CreateValidator(_) => "create_validator",
            Msg::EditValidator(_) => "edit_validator",
            Msg::Delegate(_) => "delegate",
            Msg::Undelegate(_) => "undelegate",
            Msg::BeginRedelegate(_) => "begin_redelegate",
            Msg::TokenizeShares(_) => "tokenize_shares",
            Msg::RedeemTokensForShares(_) => "redeem_tokens_for_shares",
            Msg::TransferTokenizeShareRecord(_) => "transfer_tokenize_share_record",
            Msg::ValidatorBond(_) => "validator_bond",
            Msg::DisableTokenizeShares(_) => "disable_tokenize_shares",
            Msg::EnableTokenizeShares(_) => "enable_tokenize_shares",
            Msg::UnbondValidator(_) => "unbond_validator",
        }
    }

    /// Checks that need no state.
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        match self {
            Msg::CreateValidator(m) => {
                require_acc(&m.delegator)?;
                require_val(&m.validator)?;
                if AccAddress::from(&m.validator) != m.delegator {
                    return Err(StakingError::BadValidatorAddr);
                }
                if m.consensus_pubkey.is_empty() {
                    return Err(StakingError::EmptyValidatorPubKey);
                }
                require_positive(&m.value)?;
                m.description.ensure_length()?;
                if m.description.moniker.is_empty() {
                    return Err(StakingError::InvalidDescription("empty moniker".to_string()));
                }
                m.commission.validate()?;
                if !m.min_self_delegation.is_positive() {
                    return Err(StakingError::InvalidAmount);
                }
                if m.value.amount < m.min_self_delegation {
                    return Err(StakingError::SelfDelegationBelowMinimum);
                }
            }
            Msg::EditValidator(m) => {
                require_val(&m.validator)?;
                if let Some(rate) = m.commission_rate {
                    if rate.is_negative() || rate > Dec::ONE {
                        return Err(StakingError::CommissionRules(
                            "commission rate must be within [0, 1]".to_string(),
                        ));
                    }
                }
                if m.min_self_delegation.is_some_and(|min| !min.is_positive()) {
                    return Err(StakingError::InvalidAmount);
                }
            }
            Msg::Delegate(m) => {
                require_acc(&m.delegator)?;
                require_val(&m.validator)?;
                require_positive(&m.amount)?;
            }
            Msg::Undelegate(m) => {
                require_acc(&m.delegator)?;
                require_val(&m.validator)?;
                require_positive(&m.amount)?;
            }
            Msg::BeginRedelegate(m) => {
                require_acc(&m.delegator)?;
                require_val(&m.src_validator)?;
                require_val(&m.dst_validator)?;
                require_positive(&m.amount)?;
            }
            Msg::TokenizeShares(m) => {
                require_acc(&m.delegator)?;
                require_val(&m.validator)?;
                require_acc(&m.tokenized_share_owner)?;
                require_positive(&m.amount)?;
            }
            Msg::RedeemTokensForShares(m) => {
                require_acc(&m.delegator)?;
                require_positive(&m.amount)?;
            }
            Msg::TransferTokenizeShareRecord(m) => {
                require_acc(&m.sender)?;
                require_acc(&m.new_owner)?;
            }
            Msg::ValidatorBond(m) => {
                require_acc(&m.delegator)?;
                require_val(&m.validator)?;
            }
            Msg::DisableTokenizeShares(m) => require_acc(&m.delegator)?,
            Msg::EnableTokenizeShares(m) => require_acc(&m.delegator)?,
            Msg::UnbondValidator(m) => require_val(&m.validator)?,
        }
        Ok(())
    }
}

fn require_acc(address: &AccAddress) -> Result<(), StakingError> {
    if address.is_empty() {
        return Err(StakingError::EmptyAddress);
    }
    Ok(())
}

fn require_val(address: &ValAddress) -> Result<(), StakingError> {
    if address.is_empty() {
        return Err(StakingError::BadValidatorAddr);
    }
    Ok(())
}

fn require_positive(coin: &Coin) -> Result<(), StakingError> {
    coin.validate()?;
    if !coin.amount.is_positive() || Dec::checked_from_amount(coin.amount).is_none() {
        return Err(StakingError::InvalidAmount);
    }
    Ok(())
}
