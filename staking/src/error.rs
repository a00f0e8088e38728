//! Staking-specific errors.

use lsm_store::{BankError, StoreError};
use lsm_types::LsmError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StakingError {
    // ── Validation ───────────────────────────────────────────────────────
    #[error("empty address")]
    EmptyAddress,

    #[error("invalid amount: must be positive")]
    InvalidAmount,

    #[error("invalid coin denomination: got {got}, expected {expected}")]
    BadDenom { got: String, expected: String },

    #[error("validator address is invalid")]
    BadValidatorAddr,

    #[error("empty validator public key")]
    EmptyValidatorPubKey,

    #[error("invalid description: {0}")]
    InvalidDescription(String),

    #[error("commission rules violated: {0}")]
    CommissionRules(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid genesis state: {0}")]
    InvalidGenesis(String),

    // ── Not found ────────────────────────────────────────────────────────
    #[error("validator does not exist")]
    NoValidatorFound,

    #[error("no delegation for (address, validator) tuple")]
    NoDelegation,

    #[error("no unbonding delegation found")]
    NoUnbondingDelegation,

    #[error("tokenize share record not exists")]
    TokenizeShareRecordNotExists,

    // ── Ledger rules ─────────────────────────────────────────────────────
    #[error("validator already exist for this operator address; must use new validator operator address")]
    ValidatorOwnerExists,

    #[error("validator already exist for this pubkey; must use new validator pubkey")]
    ValidatorPubKeyExists,

    #[error("validator for this address is currently jailed")]
    ValidatorJailed,

    #[error("invalid shares amount")]
    BadSharesAmount,

    #[error("not enough delegation shares")]
    NotEnoughDelegationShares,

    #[error("insufficient delegation shares")]
    InsufficientShares,

    #[error("cannot delegate to validators with invalid (zero) ex-rate")]
    InvalidExchangeRate,

    #[error("cannot redelegate to the same validator")]
    SelfRedelegation,

    #[error("redelegation to this validator already in progress; first redelegation to this validator must complete before next redelegation")]
    TransitiveRedelegation,

    #[error("too many unbonding/redelegation entries for (delegator, validator) tuple")]
    MaxEntries,

    #[error("too few tokens to redelegate (truncates to zero tokens)")]
    TinyRedelegationAmount,

    #[error("validator's self delegation must be greater than their minimum self delegation")]
    SelfDelegationBelowMinimum,

    #[error("minimum self delegation cannot be decrease")]
    MinSelfDelegationDecreased,

    #[error("not enough balance")]
    NotEnoughBalance,

    // ── Liquid staking ───────────────────────────────────────────────────
    #[error("delegation or tokenization exceeds the global cap")]
    GlobalLiquidStakingCapExceeded,

    #[error("insufficient validator bond shares")]
    InsufficientValidatorBondShares,

    #[error("delegation or tokenization exceeds the validator cap")]
    ValidatorLiquidStakingCapExceeded,

    #[error("validator bond delegation is not allowed from a module account")]
    ValidatorBondNotAllowedFromModuleAccount,

    #[error("validator bond delegation is not allowed to tokenize share")]
    ValidatorBondNotAllowedForTokenizeShare,

    #[error("not tokenize share record owner")]
    NotTokenizeShareRecordOwner,

    #[error("tokenize shares currently disabled for account")]
    TokenizeSharesDisabledForAccount,

    #[error("tokenize shares is already disabled for this account")]
    TokenizeSharesAlreadyDisabledForAccount,

    #[error("tokenize shares is already enabled for this account")]
    TokenizeSharesAlreadyEnabledForAccount,

    #[error("trying to exceed vested free delegation for vesting account")]
    ExceedingFreeVestingDelegations,

    // ── Wrapped ──────────────────────────────────────────────────────────
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error(transparent)]
    Types(#[from] LsmError),
}
