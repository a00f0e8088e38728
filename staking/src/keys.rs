//! Store key layout.
//!
//! Every key starts with a one-byte prefix naming the collection. Addresses
//! inside composite keys are length-prefixed so that prefix scans by a
//! leading address never match a longer address. Integers and timestamps
//! are big-endian so that byte order equals numeric order.

use lsm_types::{AccAddress, Timestamp, ValAddress};

pub const PARAMS_KEY: &[u8] = &[0x51];

pub const VALIDATOR_PREFIX: u8 = 0x21;
pub const VALIDATOR_BY_CONS_PREFIX: u8 = 0x22;

pub const DELEGATION_PREFIX: u8 = 0x31;
pub const UNBONDING_DELEGATION_PREFIX: u8 = 0x32;
pub const REDELEGATION_PREFIX: u8 = 0x34;

pub const UNBONDING_QUEUE_PREFIX: u8 = 0x41;
pub const REDELEGATION_QUEUE_PREFIX: u8 = 0x42;

pub const TOKENIZE_SHARE_RECORD_PREFIX: u8 = 0x81;
pub const TOKENIZE_SHARE_RECORD_BY_OWNER_PREFIX: u8 = 0x82;
pub const TOKENIZE_SHARE_RECORD_BY_DENOM_PREFIX: u8 = 0x83;
pub const LAST_TOKENIZE_SHARE_RECORD_ID_KEY: &[u8] = &[0x84];
pub const TOTAL_LIQUID_STAKED_TOKENS_KEY: &[u8] = &[0x85];
pub const TOKENIZE_SHARES_LOCK_PREFIX: u8 = 0x86;
pub const PENDING_TOKENIZE_SHARE_AUTHORIZATION_PREFIX: u8 = 0x87;

pub const EPOCH_NUMBER_KEY: &[u8] = &[0x91];
pub const NEXT_EPOCH_ACTION_ID_KEY: &[u8] = &[0x92];
pub const EPOCH_ACTION_QUEUE_PREFIX: u8 = 0x93;

fn with_prefix(prefix: u8, parts: &[&[u8]]) -> Vec<u8> {
    let mut key = vec![prefix];
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// Length-prefixed address bytes.
fn lp(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    out
}

/// Split a length-prefixed address off the front of `bytes`.
pub fn split_lp(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&len, rest) = bytes.split_first()?;
    let len = len as usize;
    (rest.len() >= len).then(|| rest.split_at(len))
}

// ── Validators ──────────────────────────────────────────────────────────

pub fn validator_key(operator: &ValAddress) -> Vec<u8> {
    with_prefix(VALIDATOR_PREFIX, &[&lp(operator.as_bytes())])
}

pub fn validator_by_cons_key(consensus_pubkey: &str) -> Vec<u8> {
    with_prefix(VALIDATOR_BY_CONS_PREFIX, &[consensus_pubkey.as_bytes()])
}

// ── Delegations ─────────────────────────────────────────────────────────

pub fn delegation_key(delegator: &AccAddress, validator: &ValAddress) -> Vec<u8> {
    with_prefix(
        DELEGATION_PREFIX,
        &[&lp(delegator.as_bytes()), &lp(validator.as_bytes())],
    )
}

pub fn delegations_by_delegator_prefix(delegator: &AccAddress) -> Vec<u8> {
    with_prefix(DELEGATION_PREFIX, &[&lp(delegator.as_bytes())])
}

pub fn unbonding_delegation_key(delegator: &AccAddress, validator: &ValAddress) -> Vec<u8> {
    with_prefix(
        UNBONDING_DELEGATION_PREFIX,
        &[&lp(delegator.as_bytes()), &lp(validator.as_bytes())],
    )
}

pub fn unbonding_delegations_by_delegator_prefix(delegator: &AccAddress) -> Vec<u8> {
    with_prefix(UNBONDING_DELEGATION_PREFIX, &[&lp(delegator.as_bytes())])
}

pub fn redelegation_key(delegator: &AccAddress, src: &ValAddress, dst: &ValAddress) -> Vec<u8> {
    with_prefix(
        REDELEGATION_PREFIX,
        &[&lp(delegator.as_bytes()), &lp(src.as_bytes()), &lp(dst.as_bytes())],
    )
}

pub fn redelegations_by_delegator_prefix(delegator: &AccAddress) -> Vec<u8> {
    with_prefix(REDELEGATION_PREFIX, &[&lp(delegator.as_bytes())])
}

pub fn unbonding_queue_key(time: Timestamp) -> Vec<u8> {
    with_prefix(UNBONDING_QUEUE_PREFIX, &[&time.to_be_bytes()])
}

pub fn redelegation_queue_key(time: Timestamp) -> Vec<u8> {
    with_prefix(REDELEGATION_QUEUE_PREFIX, &[&time.to_be_bytes()])
}

// ── Tokenize share records ──────────────────────────────────────────────

pub fn tokenize_share_record_key(id: u64) -> Vec<u8> {
    with_prefix(TOKENIZE_SHARE_RECORD_PREFIX, &[&id.to_be_bytes()])
}

pub fn tokenize_share_record_by_owner_key(owner: &AccAddress, id: u64) -> Vec<u8> {
    with_prefix(
        TOKENIZE_SHARE_RECORD_BY_OWNER_PREFIX,
        &[&lp(owner.as_bytes()), &id.to_be_bytes()],
    )
}

pub fn tokenize_share_records_by_owner_prefix(owner: &AccAddress) -> Vec<u8> {
    with_prefix(TOKENIZE_SHARE_RECORD_BY_OWNER_PREFIX, &[&lp(owner.as_bytes())])
}

pub fn tokenize_share_record_by_denom_key(denom: &str) -> Vec<u8> {
    with_prefix(TOKENIZE_SHARE_RECORD_BY_DENOM_PREFIX, &[denom.as_bytes()])
}

// ── Tokenize share locks ────────────────────────────────────────────────

pub fn tokenize_shares_lock_key(owner: &AccAddress) -> Vec<u8> {
    with_prefix(TOKENIZE_SHARES_LOCK_PREFIX, &[owner.as_bytes()])
}

pub fn pending_tokenize_share_authorization_key(time: Timestamp) -> Vec<u8> {
    with_prefix(PENDING_TOKENIZE_SHARE_AUTHORIZATION_PREFIX, &[&time.to_be_bytes()])
}

// ── Epoch queue ─────────────────────────────────────────────────────────

pub fn epoch_action_key(epoch: u64, action_id: u64) -> Vec<u8> {
    with_prefix(
        EPOCH_ACTION_QUEUE_PREFIX,
        &[&epoch.to_be_bytes(), &action_id.to_be_bytes()],
    )
}

/// Decode `(epoch, action_id)` from an action queue key.
pub fn parse_epoch_action_key(key: &[u8]) -> Option<(u64, u64)> {
    let body = key.strip_prefix(&[EPOCH_ACTION_QUEUE_PREFIX])?;
    if body.len() != 16 {
        return None;
    }
    let epoch = u64::from_be_bytes(body[..8].try_into().ok()?);
    let id = u64::from_be_bytes(body[8..].try_into().ok()?);
    Some((epoch, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegator_prefix_does_not_match_longer_address() {
        let short = AccAddress::new(vec![1; 20]);
        let long = AccAddress::new(vec![1; 32]);
        let val = ValAddress::new(vec![9; 20]);
        let key = delegation_key(&long, &val);
        assert!(!key.starts_with(&delegations_by_delegator_prefix(&short)));
        assert!(key.starts_with(&delegations_by_delegator_prefix(&long)));
    }

    #[test]
    fn test_time_keys_sort_chronologically() {
        let a = pending_tokenize_share_authorization_key(Timestamp::new(9));
        let b = pending_tokenize_share_authorization_key(Timestamp::new(300));
        assert!(a < b);
    }

    #[test]
    fn test_epoch_action_key_roundtrip() {
        let key = epoch_action_key(3, 42);
        assert_eq!(parse_epoch_action_key(&key), Some((3, 42)));
        assert_eq!(parse_epoch_action_key(&[EPOCH_ACTION_QUEUE_PREFIX, 1]), None);
    }

    #[test]
    fn test_split_lp() {
        let bytes = lp(&[7, 8, 9]);
        assert_eq!(split_lp(&bytes), Some((&[7u8, 8, 9][..], &[][..])));
        assert_eq!(split_lp(&[5, 1]), None);
    }
}
