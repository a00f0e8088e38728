//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors raised while parsing or validating the fundamental types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LsmError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("invalid denom: {0}")]
    InvalidDenom(String),

    #[error("invalid coin: {0}")]
    InvalidCoin(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("arithmetic overflow")]
    Overflow,
}
