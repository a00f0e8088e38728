//! Nullable bank: balances and supply kept in the shared store.

use lsm_store::codec::{get_value, set_value};
use lsm_store::{AccountKeeper, AccountKind, BankError, BankKeeper, KvStore};
use lsm_types::{AccAddress, Amount, Coin, Timestamp};

use crate::accounts::NullAccounts;

const BALANCE_PREFIX: u8 = 0x02;
const SUPPLY_PREFIX: u8 = 0x03;

fn balance_key(address: &AccAddress, denom: &str) -> Vec<u8> {
    let mut key = vec![BALANCE_PREFIX, address.len() as u8];
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(denom.as_bytes());
    key
}

fn supply_key(denom: &str) -> Vec<u8> {
    let mut key = vec![SUPPLY_PREFIX];
    key.extend_from_slice(denom.as_bytes());
    key
}

/// In-memory bank. Vesting accounts registered through [`NullAccounts`]
/// have their delegations tracked and their locked coins protected.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullBank {
    accounts: NullAccounts,
}

impl NullBank {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_balance(
        &self,
        store: &mut dyn KvStore,
        address: &AccAddress,
        denom: &str,
        amount: Amount,
    ) -> Result<(), BankError> {
        let key = balance_key(address, denom);
        if amount.is_zero() {
            store.delete(&key)?;
        } else {
            set_value(store, &key, &amount)?;
        }
        Ok(())
    }

    fn set_supply(&self, store: &mut dyn KvStore, denom: &str, amount: Amount) -> Result<(), BankError> {
        let key = supply_key(denom);
        if amount.is_zero() {
            store.delete(&key)?;
        } else {
            set_value(store, &key, &amount)?;
        }
        Ok(())
    }

    fn sub_balance(
        &self,
        store: &mut dyn KvStore,
        address: &AccAddress,
        coin: &Coin,
        available: Amount,
    ) -> Result<(), BankError> {
        if available < coin.amount {
            return Err(BankError::InsufficientFunds {
                address: address.clone(),
                denom: coin.denom.clone(),
                needed: coin.amount,
                available,
            });
        }
        let balance = self.balance(store, address, &coin.denom)?;
        self.set_balance(store, address, &coin.denom, balance - coin.amount)
    }

    fn add_balance(&self, store: &mut dyn KvStore, address: &AccAddress, coin: &Coin) -> Result<(), BankError> {
        let balance = self.balance(store, address, &coin.denom)?;
        let updated = balance
            .checked_add(coin.amount)
            .ok_or_else(|| BankError::SupplyOverflow(coin.denom.clone()))?;
        self.set_balance(store, address, &coin.denom, updated)
    }

    /// Credit `coin` to `to` out of thin air, bumping supply. Test setup only.
    pub fn fund(&self, store: &mut dyn KvStore, to: &AccAddress, coin: &Coin) -> Result<(), BankError> {
        self.mint(store, to, coin)
    }

    /// Total balance of `denom` held by every account.
    pub fn total_balances(&self, store: &dyn KvStore, denom: &str) -> Result<Amount, BankError> {
        let mut total = Amount::ZERO;
        for (key, bytes) in store.iter_prefix(&[BALANCE_PREFIX])? {
            let addr_len = key[1] as usize;
            if &key[2 + addr_len..] == denom.as_bytes() {
                let amount: Amount = lsm_store::codec::decode(&bytes)?;
                total += amount;
            }
        }
        Ok(total)
    }
}

impl BankKeeper for NullBank {
    fn balance(&self, store: &dyn KvStore, address: &AccAddress, denom: &str) -> Result<Amount, BankError> {
        Ok(get_value(store, &balance_key(address, denom))?.unwrap_or_default())
    }

    fn supply(&self, store: &dyn KvStore, denom: &str) -> Result<Amount, BankError> {
        Ok(get_value(store, &supply_key(denom))?.unwrap_or_default())
    }

    fn send(
        &self,
        store: &mut dyn KvStore,
        now: Timestamp,
        from: &AccAddress,
        to: &AccAddress,
        coin: &Coin,
    ) -> Result<(), BankError> {
        let balance = self.balance(store, from, &coin.denom)?;
        let spendable = match self.accounts.get_account(store, from)?.as_ref().and_then(|a| a.vesting()) {
            Some(vesting) => vesting.spendable(now, balance),
            None => balance,
        };
        self.sub_balance(store, from, coin, spendable)?;
        self.add_balance(store, to, coin)
    }

    fn mint(&self, store: &mut dyn KvStore, to: &AccAddress, coin: &Coin) -> Result<(), BankError> {
        let supply = self.supply(store, &coin.denom)?;
        let updated = supply
            .checked_add(coin.amount)
            .ok_or_else(|| BankError::SupplyOverflow(coin.denom.clone()))?;
        self.set_supply(store, &coin.denom, updated)?;
        self.add_balance(store, to, coin)
    }

    fn burn(&self, store: &mut dyn KvStore, from: &AccAddress, coin: &Coin) -> Result<(), BankError> {
        let balance = self.balance(store, from, &coin.denom)?;
        self.sub_balance(store, from, coin, balance)?;
        let supply = self.supply(store, &coin.denom)?;
        self.set_supply(store, &coin.denom, supply.saturating_sub(coin.amount))
    }

    fn delegate_coins(
        &self,
        store: &mut dyn KvStore,
        now: Timestamp,
        delegator: &AccAddress,
        pool: &AccAddress,
        coin: &Coin,
    ) -> Result<(), BankError> {
        let balance = self.balance(store, delegator, &coin.denom)?;
        self.sub_balance(store, delegator, coin, balance)?;
        if let Some(mut account) = self.accounts.get_account(store, delegator)? {
            if let AccountKind::Vesting(vesting) = &mut account.kind {
                vesting.track_delegation(now, balance, coin.amount);
                self.accounts.set_account(store, &account)?;
            }
        }
        self.add_balance(store, pool, coin)
    }

    fn undelegate_coins(
        &self,
        store: &mut dyn KvStore,
        pool: &AccAddress,
        delegator: &AccAddress,
        coin: &Coin,
    ) -> Result<(), BankError> {
        let pool_balance = self.balance(store, pool, &coin.denom)?;
        self.sub_balance(store, pool, coin, pool_balance)?;
        if let Some(mut account) = self.accounts.get_account(store, delegator)? {
            if let AccountKind::Vesting(vesting) = &mut account.kind {
                vesting.track_undelegation(coin.amount);
                self.accounts.set_account(store, &account)?;
            }
        }
        self.add_balance(store, delegator, coin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullKvStore;
    use lsm_store::{Account, VestingState};

    fn addr(b: u8) -> AccAddress {
        AccAddress::new(vec![b; 20])
    }

    #[test]
    fn test_mint_send_burn() {
        let mut store = NullKvStore::new();
        let bank = NullBank::new();
        bank.mint(&mut store, &addr(1), &Coin::new("stake", 100u128)).unwrap();
        bank.send(&mut store, Timestamp::EPOCH, &addr(1), &addr(2), &Coin::new("stake", 40u128))
            .unwrap();
        bank.burn(&mut store, &addr(2), &Coin::new("stake", 10u128)).unwrap();

        assert_eq!(bank.balance(&store, &addr(1), "stake").unwrap(), Amount::new(60));
        assert_eq!(bank.balance(&store, &addr(2), "stake").unwrap(), Amount::new(30));
        assert_eq!(bank.supply(&store, "stake").unwrap(), Amount::new(90));
        assert_eq!(bank.total_balances(&store, "stake").unwrap(), Amount::new(90));
    }

    #[test]
    fn test_insufficient_funds() {
        let mut store = NullKvStore::new();
        let bank = NullBank::new();
        bank.mint(&mut store, &addr(1), &Coin::new("stake", 5u128)).unwrap();
        let err = bank
            .send(&mut store, Timestamp::EPOCH, &addr(1), &addr(2), &Coin::new("stake", 6u128))
            .unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_vesting_coins_can_be_delegated_not_sent() {
        let mut store = NullKvStore::new();
        let bank = NullBank::new();
        let accounts = NullAccounts::new();
        let holder = addr(3);
        accounts
            .set_account(
                &mut store,
                &Account {
                    address: holder.clone(),
                    kind: AccountKind::Vesting(VestingState {
                        original_vesting: Amount::new(100),
                        end_time: Timestamp::new(1_000),
                        delegated_free: Amount::ZERO,
                        delegated_vesting: Amount::ZERO,
                    }),
                },
            )
            .unwrap();
        bank.mint(&mut store, &holder, &Coin::new("stake", 100u128)).unwrap();

        let now = Timestamp::new(10);
        assert!(bank
            .send(&mut store, now, &holder, &addr(4), &Coin::new("stake", 1u128))
            .is_err());
        bank.delegate_coins(&mut store, now, &holder, &addr(5), &Coin::new("stake", 60u128))
            .unwrap();

        let account = accounts.get_account(&store, &holder).unwrap().unwrap();
        assert_eq!(account.vesting().unwrap().delegated_vesting, Amount::new(60));
    }
}
