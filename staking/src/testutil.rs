//! Shared fixtures for unit tests.

use lsm_nullables::{NullAccounts, NullBank, NullKvStore};
use lsm_store::{Account, AccountKeeper, AccountKind, BankKeeper};
use lsm_types::{AccAddress, Amount, Coin, Dec, Params, Timestamp, ValAddress};

use crate::context::{BlockHeader, Context};
use crate::keeper::Keeper;
use crate::validator::{Commission, CommissionRates, Description, Validator};

pub type TestKeeper = Keeper<NullBank, NullAccounts>;

/// 2023-01-01T00:00:00Z
pub const START: u64 = 1_672_531_200;

pub fn keeper() -> TestKeeper {
    Keeper::new(NullBank::new(), NullAccounts::new())
}

pub fn addr(b: u8) -> AccAddress {
    AccAddress::new(vec![b; 20])
}

pub fn valaddr(b: u8) -> ValAddress {
    ValAddress::new(vec![b; 20])
}

pub fn stake(amount: u128) -> Coin {
    Coin::new("stake", amount)
}

pub struct TestEnv {
    pub store: NullKvStore,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            store: NullKvStore::new(),
        }
    }

    pub fn ctx(&mut self) -> Context<'_> {
        Context::new(&mut self.store, BlockHeader::new(1, Timestamp::new(START)))
    }
}

/// Pools, params and an initialised liquid counter.
pub fn setup(keeper: &TestKeeper, ctx: &mut Context<'_>, params: Params) {
    keeper.ensure_module_accounts(ctx).unwrap();
    keeper.set_params(ctx, &params).unwrap();
    keeper.set_total_liquid_staked_tokens(ctx, Amount::ZERO).unwrap();
}

pub fn fund(keeper: &TestKeeper, ctx: &mut Context<'_>, to: &AccAddress, amount: u128) {
    keeper.bank().mint(ctx.store_mut(), to, &stake(amount)).unwrap();
}

pub fn register(keeper: &TestKeeper, ctx: &mut Context<'_>, address: &AccAddress, kind: AccountKind) {
    keeper
        .accounts()
        .set_account(
            ctx.store_mut(),
            &Account {
                address: address.clone(),
                kind,
            },
        )
        .unwrap();
}

/// A validator record with the given tokens and shares and no backing pool
/// balance, for pure accounting tests.
pub fn raw_validator(operator: ValAddress, tokens: u128, shares: i64) -> Validator {
    let mut v = Validator::new(
        operator.clone(),
        format!("pk-{operator}"),
        Description::new("test"),
        Commission::new(
            CommissionRates::new(Dec::percent(5), Dec::percent(20), Dec::percent(1)),
            Timestamp::EPOCH,
        ),
        Amount::new(1),
    );
    v.tokens = Amount::new(tokens);
    v.delegator_shares = Dec::new(shares);
    v
}

/// Create a validator whose operator self-delegates `self_bond` from a
/// freshly funded account.
pub fn create_validator(keeper: &TestKeeper, ctx: &mut Context<'_>, b: u8, self_bond: u128) -> ValAddress {
    let operator = valaddr(b);
    let account = addr(b);
    register(keeper, ctx, &account, AccountKind::Base);
    fund(keeper, ctx, &account, self_bond);
    let validator = raw_validator(operator.clone(), 0, 0);
    keeper.set_validator(ctx, &validator).unwrap();
    keeper.set_validator_by_cons(ctx, &validator).unwrap();
    keeper
        .delegate(ctx, &account, Amount::new(self_bond), crate::ledger::TokenSource::Account, &operator)
        .unwrap();
    operator
}
