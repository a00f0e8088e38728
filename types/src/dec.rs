//! Fixed-point signed decimals with 18 fractional digits.
//!
//! Share balances, exchange rates and the liquid-staking caps are all `Dec`s.
//! Products and quotients are computed through a 256-bit intermediate so that
//! no precision is lost before the final rounding step.
//!
//! Rounding rules:
//! - [`Dec::mul`] and [`Dec::quo`] round half to even at the 18th digit.
//! - [`Dec::mul_truncate`] and [`Dec::quo_truncate`] truncate toward zero.
//! - [`Dec::mul_amount`] is exact; [`Dec::quo_amount`] truncates.
//!
//! Operator overloads panic on overflow. Use the `checked_*` methods where a
//! value may come from untrusted input.

use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::amount::Amount;
use crate::error::LsmError;

/// Number of fractional decimal digits.
pub const PRECISION: u32 = 18;

const ONE_RAW: i128 = 1_000_000_000_000_000_000;

/// A signed fixed-point decimal: `raw / 10^18`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(i128);

fn precision_multiplier() -> U256 {
    U256::from(ONE_RAW as u128)
}

fn to_u256(raw: i128) -> U256 {
    U256::from(raw.unsigned_abs())
}

/// Re-apply a sign to a 256-bit magnitude, failing if it no longer fits.
fn from_u256(magnitude: U256, negative: bool) -> Option<i128> {
    if magnitude > U256::from(i128::MAX as u128) {
        return None;
    }
    let v = magnitude.as_u128() as i128;
    Some(if negative { -v } else { v })
}

/// Divide by 10^18 rounding half to even.
fn chop_precision_and_round(x: U256) -> U256 {
    let one = precision_multiplier();
    let (quo, rem) = x.div_mod(one);
    let half = one / 2;
    match rem.cmp(&half) {
        Ordering::Less => quo,
        Ordering::Greater => quo + 1,
        Ordering::Equal => {
            if quo.low_u32() % 2 == 0 {
                quo
            } else {
                quo + 1
            }
        }
    }
}

/// Quotient, remainder and divisor of `|a * b| / |c|` on raw values, plus the
/// sign of the result. Raw scales cancel: `(a/1e18 * b/1e18) / (c/1e18)`
/// has raw value `a * b / c`.
fn mul_div_parts(a: Dec, b: Dec, c: Dec) -> Option<(U256, U256, U256, bool)> {
    if c.0 == 0 {
        return None;
    }
    let negative = ((a.0 < 0) != (b.0 < 0)) != (c.0 < 0);
    let product = to_u256(a.0).checked_mul(to_u256(b.0))?;
    let divisor = to_u256(c.0);
    let (quo, rem) = product.div_mod(divisor);
    Some((quo, rem, divisor, negative))
}

impl Dec {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE_RAW);

    /// Integer value `i`.
    pub fn new(i: i64) -> Self {
        Self(i as i128 * ONE_RAW)
    }

    /// `i * 10^-prec`, e.g. `with_prec(25, 2)` is `0.25`.
    pub fn with_prec(i: i64, prec: u32) -> Self {
        assert!(prec <= PRECISION, "precision {prec} exceeds {PRECISION}");
        Self(i as i128 * 10i128.pow(PRECISION - prec))
    }

    /// Percentage helper: `percent(5)` is `0.05`.
    pub fn percent(p: i64) -> Self {
        Self::with_prec(p, 2)
    }

    pub fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i128 {
        self.0
    }

    pub fn from_amount(amount: Amount) -> Self {
        Self::checked_from_amount(amount).expect("decimal overflow converting amount")
    }

    pub fn checked_from_amount(amount: Amount) -> Option<Self> {
        i128::try_from(amount.raw())
            .ok()
            .and_then(|v| v.checked_mul(ONE_RAW))
            .map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    // ── Multiplication ──────────────────────────────────────────────────

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        let negative = (self.0 < 0) != (other.0 < 0);
        let product = to_u256(self.0).checked_mul(to_u256(other.0))?;
        from_u256(chop_precision_and_round(product), negative).map(Self)
    }

    /// Product rounded half to even.
    pub fn mul(self, other: Self) -> Self {
        self.checked_mul(other).expect("decimal overflow in mul")
    }

    pub fn checked_mul_truncate(self, other: Self) -> Option<Self> {
        let negative = (self.0 < 0) != (other.0 < 0);
        let product = to_u256(self.0).checked_mul(to_u256(other.0))?;
        from_u256(product / precision_multiplier(), negative).map(Self)
    }

    /// Product truncated toward zero.
    pub fn mul_truncate(self, other: Self) -> Self {
        self.checked_mul_truncate(other)
            .expect("decimal overflow in mul_truncate")
    }

    /// Exact product with an integer amount.
    pub fn mul_amount(self, amount: Amount) -> Self {
        let factor = i128::try_from(amount.raw()).expect("decimal overflow in mul_amount");
        Self(
            self.0
                .checked_mul(factor)
                .expect("decimal overflow in mul_amount"),
        )
    }

    // ── Division ────────────────────────────────────────────────────────

    pub fn checked_quo(self, other: Self) -> Option<Self> {
        if other.0 == 0 {
            return None;
        }
        let negative = (self.0 < 0) != (other.0 < 0);
        let one = precision_multiplier();
        let scaled = to_u256(self.0).checked_mul(one)?.checked_mul(one)?;
        let quo = scaled / to_u256(other.0);
        from_u256(chop_precision_and_round(quo), negative).map(Self)
    }

    /// Quotient rounded half to even. Panics on division by zero.
    pub fn quo(self, other: Self) -> Self {
        assert!(!other.is_zero(), "decimal division by zero");
        self.checked_quo(other).expect("decimal overflow in quo")
    }

    pub fn checked_quo_truncate(self, other: Self) -> Option<Self> {
        if other.0 == 0 {
            return None;
        }
        let negative = (self.0 < 0) != (other.0 < 0);
        let scaled = to_u256(self.0).checked_mul(precision_multiplier())?;
        from_u256(scaled / to_u256(other.0), negative).map(Self)
    }

    /// Quotient truncated toward zero. Panics on division by zero.
    pub fn quo_truncate(self, other: Self) -> Self {
        assert!(!other.is_zero(), "decimal division by zero");
        self.checked_quo_truncate(other)
            .expect("decimal overflow in quo_truncate")
    }

    // ── Scaling ─────────────────────────────────────────────────────────

    /// `self * mul / div` with a single rounding step, half to even. Only the
    /// final result has to fit.
    pub fn checked_mul_quo(self, mul: Self, div: Self) -> Option<Self> {
        let (magnitude, rem, divisor, negative) = mul_div_parts(self, mul, div)?;
        let twice = rem.checked_mul(U256::from(2u8))?;
        let rounded = match twice.cmp(&divisor) {
            Ordering::Less => magnitude,
            Ordering::Greater => magnitude + 1,
            Ordering::Equal if magnitude.low_u32() % 2 == 0 => magnitude,
            Ordering::Equal => magnitude + 1,
        };
        from_u256(rounded, negative).map(Self)
    }

    /// `self * mul / div` truncated toward zero.
    pub fn checked_mul_quo_truncate(self, mul: Self, div: Self) -> Option<Self> {
        let (magnitude, _, _, negative) = mul_div_parts(self, mul, div)?;
        from_u256(magnitude, negative).map(Self)
    }

    pub fn mul_quo(self, mul: Self, div: Self) -> Self {
        self.checked_mul_quo(mul, div)
            .expect("decimal overflow or division by zero in mul_quo")
    }

    pub fn mul_quo_truncate(self, mul: Self, div: Self) -> Self {
        self.checked_mul_quo_truncate(mul, div)
            .expect("decimal overflow or division by zero in mul_quo_truncate")
    }

    /// Quotient by an integer amount, truncated toward zero.
    pub fn quo_amount(self, amount: Amount) -> Self {
        assert!(!amount.is_zero(), "decimal division by zero");
        let divisor = i128::try_from(amount.raw()).unwrap_or(i128::MAX);
        Self(self.0 / divisor)
    }

    // ── Conversion ──────────────────────────────────────────────────────

    /// Integer part, truncated toward zero. Panics on negative values.
    pub fn truncate_amount(self) -> Amount {
        assert!(self.0 >= 0, "negative decimal {self} has no amount");
        Amount::new((self.0 / ONE_RAW) as u128)
    }

    /// Integer part as a decimal.
    pub fn truncate(self) -> Self {
        Self((self.0 / ONE_RAW) * ONE_RAW)
    }

    /// Nearest integer amount, ties to even. Panics on negative values.
    pub fn round_amount(self) -> Amount {
        assert!(self.0 >= 0, "negative decimal {self} has no amount");
        Amount::new(chop_precision_and_round(to_u256(self.0)).as_u128())
    }
}

impl Add for Dec {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).expect("decimal overflow in add")
    }
}

impl AddAssign for Dec {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Dec {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs).expect("decimal overflow in sub")
    }
}

impl SubAssign for Dec {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Dec {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let one = ONE_RAW as u128;
        write!(f, "{sign}{}.{:018}", abs / one, abs % one)
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Dec {
    type Err = LsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: &str| LsmError::InvalidDecimal(format!("{s}: {why}"));
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("bad integer part"));
        }
        if body.contains('.') && frac_part.is_empty() {
            return Err(invalid("empty fractional part"));
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("bad fractional part"));
        }
        if frac_part.len() > PRECISION as usize {
            return Err(invalid("too many decimal places"));
        }
        let int: i128 = int_part.parse().map_err(|_| invalid("integer overflow"))?;
        let frac: i128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{frac_part:0<18}");
            padded.parse().map_err(|_| invalid("bad fractional part"))?
        };
        let raw = int
            .checked_mul(ONE_RAW)
            .and_then(|v| v.checked_add(frac))
            .ok_or(LsmError::Overflow)?;
        Ok(Self(if negative { -raw } else { raw }))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
