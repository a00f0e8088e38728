//! Fundamental types for the liquid staking core.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: addresses, integer token amounts, fixed-point decimals, coins,
//! timestamps and the module parameters.

pub mod address;
pub mod amount;
pub mod coin;
pub mod dec;
pub mod error;
pub mod params;
pub mod time;

pub use address::{AccAddress, ValAddress};
pub use amount::Amount;
pub use coin::Coin;
pub use dec::Dec;
pub use error::LsmError;
pub use params::Params;
pub use time::Timestamp;
