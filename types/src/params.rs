//! Staking module parameters, including the liquid-staking caps.

use serde::{Deserialize, Serialize};

use crate::coin::validate_denom;
use crate::dec::Dec;
use crate::error::LsmError;

/// All staking parameters stored in the parameter store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    // ── Ledger ───────────────────────────────────────────────────────────
    /// Time an undelegation or redelegation takes to mature. Also the
    /// delay between re-enabling tokenization and the lock lifting.
    pub unbonding_time_secs: u64,

    /// Maximum unbonding or redelegation entries per delegator/validator pair.
    pub max_entries: u32,

    /// Denomination that may be staked.
    pub bond_denom: String,

    /// Floor for every validator's commission rate.
    pub min_commission_rate: Dec,

    // ── Epochs ───────────────────────────────────────────────────────────
    /// Number of blocks between epoch boundaries.
    pub epoch_interval: u64,

    // ── Liquid staking ───────────────────────────────────────────────────
    /// Multiple of a validator's bond shares that bounds its liquid shares.
    /// Negative disables the check.
    pub validator_bond_factor: Dec,

    /// Maximum fraction of total stake that may be liquid. 1 disables.
    pub global_liquid_staking_cap: Dec,

    /// Maximum fraction of one validator's shares that may be liquid. 1 disables.
    pub validator_liquid_staking_cap: Dec,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            unbonding_time_secs: 21 * 24 * 3600, // 21 days
            max_entries: 7,
            bond_denom: "stake".to_string(),
            min_commission_rate: Dec::ZERO,
            epoch_interval: 10,
            validator_bond_factor: Dec::new(-1),
            global_liquid_staking_cap: Dec::ONE,
            validator_liquid_staking_cap: Dec::ONE,
        }
    }
}

impl Params {
    pub fn global_cap_enabled(&self) -> bool {
        self.global_liquid_staking_cap < Dec::ONE
    }

    pub fn validator_bond_cap_enabled(&self) -> bool {
        !self.validator_bond_factor.is_negative()
    }

    pub fn validator_liquid_cap_enabled(&self) -> bool {
        self.validator_liquid_staking_cap < Dec::ONE
    }

    /// Per-validator liquid shares are only maintained while some cap needs
    /// them. Slashing reads them to keep the global counter in step.
    pub fn tracks_validator_liquid_shares(&self) -> bool {
        self.global_cap_enabled() || self.validator_bond_cap_enabled() || self.validator_liquid_cap_enabled()
    }

    pub fn validate(&self) -> Result<(), LsmError> {
        if self.unbonding_time_secs == 0 {
            return Err(LsmError::InvalidParams("unbonding time must be positive".into()));
        }
        if self.max_entries == 0 {
            return Err(LsmError::InvalidParams("max entries must be positive".into()));
        }
        if self.epoch_interval == 0 {
            return Err(LsmError::InvalidParams("epoch interval must be positive".into()));
        }
        validate_denom(&self.bond_denom)?;
        check_fraction("min commission rate", self.min_commission_rate)?;
        check_fraction("global liquid staking cap", self.global_liquid_staking_cap)?;
        check_fraction("validator liquid staking cap", self.validator_liquid_staking_cap)?;
        if self.validator_bond_factor.is_negative() && self.validator_bond_factor != Dec::new(-1) {
            return Err(LsmError::InvalidParams(
                "validator bond factor must be non-negative or -1".into(),
            ));
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: Dec) -> Result<(), LsmError> {
    if value.is_negative() || value > Dec::ONE {
        return Err(LsmError::InvalidParams(format!("{name} must be in [0, 1], got {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_disable_all_caps() {
        let p = Params::default();
        assert!(p.validate().is_ok());
        assert!(!p.global_cap_enabled());
        assert!(!p.validator_bond_cap_enabled());
        assert!(!p.validator_liquid_cap_enabled());
        assert!(!p.tracks_validator_liquid_shares());
    }

    #[test]
    fn test_enablement_thresholds() {
        let p = Params {
            validator_bond_factor: Dec::ZERO,
            global_liquid_staking_cap: Dec::percent(99),
            ..Params::default()
        };
        assert!(p.global_cap_enabled());
        assert!(p.validator_bond_cap_enabled());
        assert!(p.tracks_validator_liquid_shares());

        let global_only = Params {
            global_liquid_staking_cap: Dec::percent(25),
            ..Params::default()
        };
        assert!(global_only.tracks_validator_liquid_shares());
    }

    #[test]
    fn test_rejects_out_of_range_caps() {
        let p = Params {
            global_liquid_staking_cap: Dec::new(2),
            ..Params::default()
        };
        assert!(p.validate().is_err());
        let p = Params {
            validator_bond_factor: Dec::percent(-50),
            ..Params::default()
        };
        assert!(p.validate().is_err());
        let p = Params {
            bond_denom: "x".into(),
            ..Params::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let p: Params = serde_json::from_str(r#"{"epoch_interval": 5}"#).unwrap();
        assert_eq!(p.epoch_interval, 5);
        assert_eq!(p.bond_denom, "stake");
    }
}
