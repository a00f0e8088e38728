//! Validators and their share/token exchange rate.

use lsm_types::{AccAddress, Amount, Dec, Timestamp, ValAddress};
use serde::{Deserialize, Serialize};

use crate::error::StakingError;

/// Placeholder in an edit that leaves a description field untouched.
pub const DO_NOT_MODIFY: &str = "[do-not-modify]";

pub const MAX_MONIKER_LENGTH: usize = 70;
pub const MAX_IDENTITY_LENGTH: usize = 3000;
pub const MAX_WEBSITE_LENGTH: usize = 140;
pub const MAX_SECURITY_CONTACT_LENGTH: usize = 140;
pub const MAX_DETAILS_LENGTH: usize = 280;

/// Minimum time between two commission rate changes.
pub const COMMISSION_UPDATE_INTERVAL_SECS: u64 = 24 * 3600;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondStatus {
    #[default]
    Unbonded,
    Unbonding,
    Bonded,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub moniker: String,
    pub identity: String,
    pub website: String,
    pub security_contact: String,
    pub details: String,
}

impl Description {
    pub fn new(moniker: impl Into<String>) -> Self {
        Self {
            moniker: moniker.into(),
            ..Self::default()
        }
    }

    pub fn ensure_length(&self) -> Result<(), StakingError> {
        let fields = [
            ("moniker", &self.moniker, MAX_MONIKER_LENGTH),
            ("identity", &self.identity, MAX_IDENTITY_LENGTH),
            ("website", &self.website, MAX_WEBSITE_LENGTH),
            ("security contact", &self.security_contact, MAX_SECURITY_CONTACT_LENGTH),
            ("details", &self.details, MAX_DETAILS_LENGTH),
        ];
        for (name, value, max) in fields {
            if value.len() > max {
                return Err(StakingError::InvalidDescription(format!(
                    "invalid {name} length; got: {}, max: {max}",
                    value.len()
                )));
            }
        }
        Ok(())
    }

    /// Apply an edit. Fields set to [`DO_NOT_MODIFY`] keep their value.
    pub fn update(&self, edit: &Description) -> Result<Description, StakingError> {
        let pick = |new: &String, old: &String| {
            if new == DO_NOT_MODIFY {
                old.clone()
            } else {
                new.clone()
            }
        };
        let updated = Description {
            moniker: pick(&edit.moniker, &self.moniker),
            identity: pick(&edit.identity, &self.identity),
            website: pick(&edit.website, &self.website),
            security_contact: pick(&edit.security_contact, &self.security_contact),
            details: pick(&edit.details, &self.details),
        };
        updated.ensure_length()?;
        Ok(updated)
    }

    /// An edit that changes nothing.
    pub fn unchanged() -> Self {
        Self {
            moniker: DO_NOT_MODIFY.into(),
            identity: DO_NOT_MODIFY.into(),
            website: DO_NOT_MODIFY.into(),
            security_contact: DO_NOT_MODIFY.into(),
            details: DO_NOT_MODIFY.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub rate: Dec,
    pub max_rate: Dec,
    pub max_change_rate: Dec,
}

impl CommissionRates {
    pub fn new(rate: Dec, max_rate: Dec, max_change_rate: Dec) -> Self {
        Self {
            rate,
            max_rate,
            max_change_rate,
        }
    }

    pub fn validate(&self) -> Result<(), StakingError> {
        let rule = |msg: &str| Err(StakingError::CommissionRules(msg.to_string()));
        if self.max_rate.is_negative() || self.max_rate > Dec::ONE {
            return rule("max rate must be within [0, 1]");
        }
        if self.rate.is_negative() {
            return rule("rate must be non-negative");
        }
        if self.rate > self.max_rate {
            return rule("rate cannot be more than the max rate");
        }
        if self.max_change_rate.is_negative() {
            return rule("max change rate must be non-negative");
        }
        if self.max_change_rate > self.max_rate {
            return rule("max change rate cannot be more than the max rate");
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    pub rates: CommissionRates,
    pub update_time: Timestamp,
}

impl Commission {
    pub fn new(rates: CommissionRates, update_time: Timestamp) -> Self {
        Self { rates, update_time }
    }

    /// Check a rate change requested at `now`.
    pub fn validate_new_rate(&self, new_rate: Dec, now: Timestamp) -> Result<(), StakingError> {
        let rule = |msg: &str| Err(StakingError::CommissionRules(msg.to_string()));
        if !self.update_time.has_expired(COMMISSION_UPDATE_INTERVAL_SECS, now) {
            return rule("commission cannot be changed more than once in 24h");
        }
        if new_rate.is_negative() {
            return rule("commission rate must be non-negative");
        }
        if new_rate > self.rates.max_rate {
            return rule("commission cannot be more than the max rate");
        }
        if (new_rate - self.rates.rate).abs() > self.rates.max_change_rate {
            return rule("commission cannot be changed more than max change rate");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: ValAddress,
    pub consensus_pubkey: String,
    pub jailed: bool,
    pub status: BondStatus,
    /// Underlying stake backing all shares.
    pub tokens: Amount,
    /// Shares issued to all delegators.
    pub delegator_shares: Dec,
    pub description: Description,
    pub unbonding_height: u64,
    pub unbonding_time: Timestamp,
    pub commission: Commission,
    pub min_self_delegation: Amount,
    /// Shares held by liquid staking providers and tokenize-share custodians.
    pub total_liquid_shares: Dec,
    /// Shares of delegations marked as validator bond.
    pub total_validator_bond_shares: Dec,
}

impl Validator {
    pub fn new(
        operator: ValAddress,
        consensus_pubkey: impl Into<String>,
        description: Description,
        commission: Commission,
        min_self_delegation: Amount,
    ) -> Self {
        Self {
            operator,
            consensus_pubkey: consensus_pubkey.into(),
            jailed: false,
            status: BondStatus::Unbonded,
            tokens: Amount::ZERO,
            delegator_shares: Dec::ZERO,
            description,
            unbonding_height: 0,
            unbonding_time: Timestamp::EPOCH,
            commission,
            min_self_delegation,
            total_liquid_shares: Dec::ZERO,
            total_validator_bond_shares: Dec::ZERO,
        }
    }

    /// The operator's own account.
    pub fn operator_account(&self) -> AccAddress {
        AccAddress::from(&self.operator)
    }

    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    pub fn is_unbonded(&self) -> bool {
        self.status == BondStatus::Unbonded
    }

    /// Tokens are gone but shares remain: nobody can enter at this rate.
    pub fn invalid_ex_rate(&self) -> bool {
        self.tokens.is_zero() && self.delegator_shares.is_positive()
    }

    // ── Exchange rate ───────────────────────────────────────────────────

    /// Token value of `shares`, rounded.
    pub fn tokens_from_shares(&self, shares: Dec) -> Dec {
        if self.delegator_shares.is_zero() {
            return Dec::ZERO;
        }
        Dec::from_amount(self.tokens).mul_quo(shares, self.delegator_shares)
    }

    /// Token value of `shares`, truncated.
    pub fn tokens_from_shares_truncated(&self, shares: Dec) -> Dec {
        if self.delegator_shares.is_zero() {
            return Dec::ZERO;
        }
        Dec::from_amount(self.tokens).mul_quo_truncate(shares, self.delegator_shares)
    }

    /// Shares worth `amount` tokens, rounded.
    pub fn shares_from_tokens(&self, amount: Amount) -> Result<Dec, StakingError> {
        if self.tokens.is_zero() {
            return Err(StakingError::InsufficientShares);
        }
        let tokens = Dec::from_amount(self.tokens);
        Dec::checked_from_amount(amount)
            .and_then(|amount| self.delegator_shares.checked_mul_quo(amount, tokens))
            .ok_or(StakingError::InvalidAmount)
    }

    /// Shares worth `amount` tokens, truncated.
    pub fn shares_from_tokens_truncated(&self, amount: Amount) -> Result<Dec, StakingError> {
        if self.tokens.is_zero() {
            return Err(StakingError::InsufficientShares);
        }
        let tokens = Dec::from_amount(self.tokens);
        Dec::checked_from_amount(amount)
            .and_then(|amount| self.delegator_shares.checked_mul_quo_truncate(amount, tokens))
            .ok_or(StakingError::InvalidAmount)
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Add delegated tokens and return the shares issued for them. The
    /// first delegation sets a 1:1 rate; later ones keep the current rate,
    /// truncating in the protocol's favour.
    pub fn add_tokens_from_del(&mut self, amount: Amount) -> Dec {
        let issued = if self.delegator_shares.is_zero() {
            Dec::from_amount(amount)
        } else {
            self.delegator_shares
                .mul_quo_truncate(Dec::from_amount(amount), Dec::from_amount(self.tokens))
        };
        self.tokens += amount;
        self.delegator_shares += issued;
        issued
    }

    /// Remove shares and return the tokens they were worth. The last holder
    /// takes every remaining token; otherwise the payout is truncated.
    pub fn remove_del_shares(&mut self, shares: Dec) -> Amount {
        let remaining = self.delegator_shares - shares;
        let issued = if remaining.is_zero() {
            std::mem::take(&mut self.tokens)
        } else {
            let issued = self.tokens_from_shares(shares).truncate_amount();
            self.tokens = self.tokens.saturating_sub(issued);
            issued
        };
        self.delegator_shares = remaining;
        issued
    }

    /// Remove tokens without touching shares (slashing).
    pub fn remove_tokens(&mut self, amount: Amount) {
        self.tokens = self.tokens.saturating_sub(amount);
    }
}
