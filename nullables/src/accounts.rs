//! Nullable account registry.

use lsm_store::codec::{decode, get_value, set_value};
use lsm_store::{Account, AccountKeeper, KvStore, StoreError};
use lsm_types::AccAddress;

const ACCOUNT_PREFIX: u8 = 0x01;

fn account_key(address: &AccAddress) -> Vec<u8> {
    let mut key = vec![ACCOUNT_PREFIX];
    key.extend_from_slice(address.as_bytes());
    key
}

/// Account registry that keeps accounts in the shared store under a
/// dedicated prefix.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAccounts;

impl NullAccounts {
    pub fn new() -> Self {
        Self
    }
}

impl AccountKeeper for NullAccounts {
    fn get_account(&self, store: &dyn KvStore, address: &AccAddress) -> Result<Option<Account>, StoreError> {
        get_value(store, &account_key(address))
    }

    fn set_account(&self, store: &mut dyn KvStore, account: &Account) -> Result<(), StoreError> {
        set_value(store, &account_key(&account.address), account)
    }

    fn remove_account(&self, store: &mut dyn KvStore, address: &AccAddress) -> Result<(), StoreError> {
        store.delete(&account_key(address))
    }

    fn all_accounts(&self, store: &dyn KvStore) -> Result<Vec<Account>, StoreError> {
        store
            .iter_prefix(&[ACCOUNT_PREFIX])?
            .into_iter()
            .map(|(_, bytes)| decode(&bytes))
            .collect()
    }
}
