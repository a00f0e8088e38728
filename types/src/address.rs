//! Account and validator operator addresses.
//!
//! Addresses are raw byte strings rendered as a human readable prefix
//! followed by lowercase hex. Key-controlled accounts use 20-byte addresses;
//! module-owned accounts use the 32-byte Blake2b digest of `"module" || name`,
//! so a custodian address can be recomputed from its module name alone.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::LsmError;

/// Length of a module account address in bytes.
pub const MODULE_ADDRESS_LEN: usize = 32;

macro_rules! impl_address {
    ($name:ident, $prefix:expr) => {
        impl $name {
            /// Human readable prefix of the string encoding.
            pub const PREFIX: &'static str = $prefix;

            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", Self::PREFIX, hex::encode(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        impl FromStr for $name {
            type Err = LsmError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let body = s
                    .strip_prefix(Self::PREFIX)
                    .ok_or_else(|| LsmError::InvalidAddress(format!("{s}: expected prefix {}", Self::PREFIX)))?;
                let bytes = hex::decode(body).map_err(|e| LsmError::InvalidAddress(format!("{s}: {e}")))?;
                if bytes.is_empty() {
                    return Err(LsmError::InvalidAddress(format!("{s}: empty address")));
                }
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Address of an account (key-controlled, module-owned or interchain).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccAddress(Vec<u8>);

/// Address of a validator operator. Shares its bytes with the operator's
/// account address.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ValAddress(Vec<u8>);

impl_address!(AccAddress, "lsm1");
impl_address!(ValAddress, "lsmvaloper1");

impl AccAddress {
    /// Deterministic address of the module account called `name`.
    pub fn module(name: &str) -> Self {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(b"module");
        hasher.update(name.as_bytes());
        Self(hasher.finalize().to_vec())
    }
}

impl From<&ValAddress> for AccAddress {
    fn from(val: &ValAddress) -> Self {
        Self(val.0.clone())
    }
}

impl From<&AccAddress> for ValAddress {
    fn from(acc: &AccAddress) -> Self {
        Self(acc.0.clone())
    }
}
