//! Tokenize share records: one per tokenization, owning a custodian module
//! account that holds the tokenized delegation.

use lsm_store::codec::{get_value, prefix_values, set_value};
use lsm_store::{AccountKeeper, BankKeeper};
use lsm_types::{AccAddress, Amount, ValAddress};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::StakingError;
use crate::keeper::{Keeper, TOKENIZE_SHARE_MODULE_PREFIX};
use crate::keys;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeShareRecord {
    pub id: u64,
    /// Account allowed to transfer the record and claim its rewards.
    pub owner: AccAddress,
    /// Name of the custodian module account.
    pub module_account: String,
    pub validator: ValAddress,
}

impl TokenizeShareRecord {
    pub fn new(id: u64, owner: AccAddress, validator: ValAddress) -> Self {
        Self {
            id,
            owner,
            module_account: format!("{TOKENIZE_SHARE_MODULE_PREFIX}{id}"),
            validator,
        }
    }

    /// Denomination of the share tokens minted against this record.
    pub fn share_token_denom(&self) -> String {
        format!("{}/{}", self.validator, self.id)
    }

    pub fn module_address(&self) -> AccAddress {
        AccAddress::module(&self.module_account)
    }
}

impl<B: BankKeeper, A: AccountKeeper> Keeper<B, A> {
    pub fn last_tokenize_share_record_id(&self, ctx: &Context<'_>) -> Result<u64, StakingError> {
        Ok(get_value(ctx.store(), keys::LAST_TOKENIZE_SHARE_RECORD_ID_KEY)?.unwrap_or(0))
    }

    pub fn set_last_tokenize_share_record_id(&self, ctx: &mut Context<'_>, id: u64) -> Result<(), StakingError> {
        set_value(ctx.store_mut(), keys::LAST_TOKENIZE_SHARE_RECORD_ID_KEY, &id)?;
        Ok(())
    }

    /// Bump and return the record id counter. Ids start at 1.
    pub fn next_tokenize_share_record_id(&self, ctx: &mut Context<'_>) -> Result<u64, StakingError> {
        let id = self.last_tokenize_share_record_id(ctx)? + 1;
        self.set_last_tokenize_share_record_id(ctx, id)?;
        Ok(id)
    }

    pub fn get_tokenize_share_record(&self, ctx: &Context<'_>, id: u64) -> Result<TokenizeShareRecord, StakingError> {
        get_value(ctx.store(), &keys::tokenize_share_record_key(id))?
            .ok_or(StakingError::TokenizeShareRecordNotExists)
    }

    pub fn get_tokenize_share_record_by_denom(
        &self,
        ctx: &Context<'_>,
        denom: &str,
    ) -> Result<TokenizeShareRecord, StakingError> {
        let id: Option<u64> = get_value(ctx.store(), &keys::tokenize_share_record_by_denom_key(denom))?;
        match id {
            Some(id) => self.get_tokenize_share_record(ctx, id),
            None => Err(StakingError::TokenizeShareRecordNotExists),
        }
    }

    pub fn get_tokenize_share_records_by_owner(
        &self,
        ctx: &Context<'_>,
        owner: &AccAddress,
    ) -> Result<Vec<TokenizeShareRecord>, StakingError> {
        let ids: Vec<u64> = prefix_values(ctx.store(), &keys::tokenize_share_records_by_owner_prefix(owner))?;
        ids.into_iter()
            .map(|id| self.get_tokenize_share_record(ctx, id))
            .collect()
    }

    pub fn all_tokenize_share_records(&self, ctx: &Context<'_>) -> Result<Vec<TokenizeShareRecord>, StakingError> {
        Ok(prefix_values(ctx.store(), &[keys::TOKENIZE_SHARE_RECORD_PREFIX])?)
    }

    /// Store a new record and its indexes. Ids are never reused.
    pub fn add_tokenize_share_record(&self, ctx: &mut Context<'_>, record: &TokenizeShareRecord) -> Result<(), StakingError> {
        if ctx.store().has(&keys::tokenize_share_record_key(record.id))? {
            return Err(StakingError::InvalidGenesis(format!(
                "tokenize share record {} already exists",
                record.id
            )));
        }
        self.write_tokenize_share_record(ctx, record)
    }

    fn write_tokenize_share_record(&self, ctx: &mut Context<'_>, record: &TokenizeShareRecord) -> Result<(), StakingError> {
        let store = ctx.store_mut();
        set_value(store, &keys::tokenize_share_record_key(record.id), record)?;
        set_value(
            store,
            &keys::tokenize_share_record_by_owner_key(&record.owner, record.id),
            &record.id,
        )?;
        set_value(
            store,
            &keys::tokenize_share_record_by_denom_key(&record.share_token_denom()),
            &record.id,
        )?;
        Ok(())
    }

    pub fn delete_tokenize_share_record(&self, ctx: &mut Context<'_>, id: u64) -> Result<(), StakingError> {
        let record = self.get_tokenize_share_record(ctx, id)?;
        let store = ctx.store_mut();
        store.delete(&keys::tokenize_share_record_key(id))?;
        store.delete(&keys::tokenize_share_record_by_owner_key(&record.owner, id))?;
        store.delete(&keys::tokenize_share_record_by_denom_key(&record.share_token_denom()))?;
        Ok(())
    }

    /// Move a record to a new owner, keeping the owner index in step.
    pub fn update_tokenize_share_record_owner(
        &self,
        ctx: &mut Context<'_>,
        id: u64,
        new_owner: &AccAddress,
    ) -> Result<TokenizeShareRecord, StakingError> {
        let mut record = self.get_tokenize_share_record(ctx, id)?;
        ctx.store_mut()
            .delete(&keys::tokenize_share_record_by_owner_key(&record.owner, id))?;
        record.owner = new_owner.clone();
        self.write_tokenize_share_record(ctx, &record)?;
        Ok(record)
    }

    /// Tokens currently backing every record's custodian delegation.
    pub fn total_tokenize_shared_assets(&self, ctx: &Context<'_>) -> Result<Amount, StakingError> {
        let mut total = Amount::ZERO;
        for record in self.all_tokenize_share_records(ctx)? {
            let Some(validator) = self.get_validator(ctx, &record.validator)? else {
                continue;
            };
            if let Some(delegation) = self.get_delegation(ctx, &record.module_address(), &record.validator)? {
                total += validator.tokens_from_shares(delegation.shares).truncate_amount();
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn test_record_naming() {
        let record = TokenizeShareRecord::new(7, addr(1), valaddr(2));
        assert_eq!(record.module_account, "tokenizeshare_7");
        assert_eq!(record.share_token_denom(), format!("{}/7", valaddr(2)));
        assert_eq!(record.module_address(), AccAddress::module("tokenizeshare_7"));
    }

    #[test]
    fn test_record_indexes() {
        let keeper = keeper();
        let mut env = TestEnv::new();
        let mut ctx = env.ctx();

        assert_eq!(keeper.next_tokenize_share_record_id(&mut ctx).unwrap(), 1);
        assert_eq!(keeper.next_tokenize_share_record_id(&mut ctx).unwrap(), 2);

        let a = TokenizeShareRecord::new(1, addr(1), valaddr(9));
        let b = TokenizeShareRecord::new(2, addr(1), valaddr(9));
        keeper.add_tokenize_share_record(&mut ctx, &a).unwrap();
        keeper.add_tokenize_share_record(&mut ctx, &b).unwrap();
        assert!(keeper.add_tokenize_share_record(&mut ctx, &a).is_err());

        assert_eq!(keeper.get_tokenize_share_records_by_owner(&ctx, &addr(1)).unwrap().len(), 2);
        assert_eq!(
            keeper
                .get_tokenize_share_record_by_denom(&ctx, &b.share_token_denom())
                .unwrap(),
            b
        );

        keeper.update_tokenize_share_record_owner(&mut ctx, 2, &addr(3)).unwrap();
        assert_eq!(keeper.get_tokenize_share_records_by_owner(&ctx, &addr(1)).unwrap(), vec![a]);
        assert_eq!(keeper.get_tokenize_share_records_by_owner(&ctx, &addr(3)).unwrap()[0].id, 2);

        keeper.delete_tokenize_share_record(&mut ctx, 1).unwrap();
        assert_eq!(
            keeper.get_tokenize_share_record(&ctx, 1),
            Err(StakingError::TokenizeShareRecordNotExists)
        );
        assert!(keeper.get_tokenize_share_records_by_owner(&ctx, &addr(1)).unwrap().is_empty());
        assert_eq!(keeper.last_tokenize_share_record_id(&ctx).unwrap(), 2);
    }
}
