//! Denominated token amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::amount::Amount;
use crate::error::LsmError;

/// A quantity of a single denomination.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

/// Check that a denomination is well formed.
///
/// Denoms start with a letter and contain only ASCII alphanumerics and
/// `/ : . _ -`, 3 to 128 characters long. Tokenized share denoms such as
/// `lsmvaloper1ab.../7` pass this check.
pub fn validate_denom(denom: &str) -> Result<(), LsmError> {
    let len_ok = (3..=128).contains(&denom.len());
    let first_ok = denom.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let chars_ok = denom
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
    if len_ok && first_ok && chars_ok {
        Ok(())
    } else {
        Err(LsmError::InvalidDenom(denom.to_string()))
    }
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<Amount>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn validate(&self) -> Result<(), LsmError> {
        validate_denom(&self.denom)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = LsmError;

    /// Parses `"100stake"` style strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| LsmError::InvalidCoin(s.to_string()))?;
        if split == 0 {
            return Err(LsmError::InvalidCoin(s.to_string()));
        }
        let (amount, denom) = s.split_at(split);
        validate_denom(denom)?;
        Ok(Self::new(denom, amount.parse::<Amount>()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coin() {
        let c: Coin = "100stake".parse().unwrap();
        assert_eq!(c, Coin::new("stake", 100u128));
        assert_eq!(c.to_string(), "100stake");
    }

    #[test]
    fn test_parse_share_denom() {
        let c: Coin = "5lsmvaloper10a0b/12".parse().unwrap();
        assert_eq!(c.denom, "lsmvaloper10a0b/12");
        assert_eq!(c.amount, Amount::new(5));
    }

    #[test]
    fn test_invalid_coins() {
        assert!("stake".parse::<Coin>().is_err());
        assert!("100".parse::<Coin>().is_err());
        assert!("100s".parse::<Coin>().is_err());
        assert!("10 stake".parse::<Coin>().is_err());
    }
}
