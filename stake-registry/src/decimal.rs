//! Deterministic fixed-point decimal used for every token and share amount.
//!
//! Floating point never enters the registry: two nodes replaying the same
//! sequence of stake changes must arrive at identical bytes. `Dec` is a
//! non-negative decimal with [`Dec::PRECISION`] fractional digits; every
//! operation rounds its result half-to-even ("banker's rounding") back to that
//! precision, and every operation is checked.

use {
    borsh::{BorshDeserialize, BorshSerialize},
    num_bigint::BigUint,
    rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy},
    serde::{Deserialize, Serialize},
    std::{
        fmt,
        io::{Read, Write},
        str::FromStr,
    },
};

/// A non-negative fixed-point decimal with 10 fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Decimal", try_from = "Decimal")]
pub struct Dec(Decimal);

impl Dec {
    /// Number of fractional digits kept after every operation.
    pub const PRECISION: u32 = 10;

    pub const ZERO: Dec = Dec(Decimal::ZERO);
    pub const ONE: Dec = Dec(Decimal::ONE);

    fn canonical(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return None;
        }
        let rounded = value
            .round_dp_with_strategy(Self::PRECISION, RoundingStrategy::MidpointNearestEven)
            .normalize();
        Some(Self(rounded))
    }

    /// Whole-number amount.
    pub fn from_int(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// `numerator / 10^scale`, e.g. `Dec::from_scaled(25, 2)` is `0.25`.
    /// Returns `None` if the scale exceeds what the backing type can hold.
    pub fn from_scaled(numerator: u64, scale: u32) -> Option<Self> {
        let value = Decimal::try_from_i128_with_scale(i128::from(numerator), scale).ok()?;
        Self::canonical(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.0.is_zero()
    }

    /// Returns `None` on overflow.
    pub fn checked_add(self, other: Dec) -> Option<Dec> {
        self.0.checked_add(other.0).and_then(Self::canonical)
    }

    /// Returns `None` if the result would be negative.
    pub fn checked_sub(self, other: Dec) -> Option<Dec> {
        self.0.checked_sub(other.0).and_then(Self::canonical)
    }

    /// Returns `None` on overflow.
    pub fn checked_mul(self, other: Dec) -> Option<Dec> {
        self.0.checked_mul(other.0).and_then(Self::canonical)
    }

    /// Returns `None` on division by zero or overflow.
    pub fn checked_quo(self, other: Dec) -> Option<Dec> {
        self.0.checked_div(other.0).and_then(Self::canonical)
    }

    /// `self * numerator / denominator` with a single rounding step.
    ///
    /// The product is formed exactly in units of `10^-PRECISION` on a big
    /// integer, so operands whose product exceeds the 96-bit mantissa still
    /// convert. Returns `None` on division by zero or when the quotient does
    /// not fit a `Dec`.
    pub fn checked_mul_quo(self, numerator: Dec, denominator: Dec) -> Option<Dec> {
        let denominator = denominator.units()?;
        if denominator.bits() == 0 {
            return None;
        }
        let product = mul_units(&self.units()?, &numerator.units()?);
        Self::from_units(&div_half_even(&product, &denominator))
    }

    /// The value as an integer count of `10^-PRECISION`.
    fn units(self) -> Option<BigUint> {
        let mantissa = u128::try_from(self.0.mantissa()).ok()?;
        let shift = Self::PRECISION.checked_sub(self.0.scale())?;
        Some(mul_units(
            &BigUint::from(mantissa),
            &BigUint::from(10u32).pow(shift),
        ))
    }

    /// Inverse of [`Self::units`]. Values too large to keep every fractional
    /// digit in the mantissa are rounded once to the finest scale that fits.
    fn from_units(units: &BigUint) -> Option<Self> {
        (0..=Self::PRECISION).find_map(|dropped| {
            let scale = Self::PRECISION.checked_sub(dropped)?;
            let divisor = BigUint::from(10u32).pow(dropped);
            let mantissa = i128::try_from(&div_half_even(units, &divisor)).ok()?;
            let value = Decimal::try_from_i128_with_scale(mantissa, scale).ok()?;
            Self::canonical(value)
        })
    }

    /// Rounds half-to-even to a whole number. Voting power is derived this way.
    pub fn round_u64(&self) -> Option<u64> {
        self.0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_u64()
    }
}

// Big-integer arithmetic cannot overflow; division by zero is ruled out by
// the caller.
#[allow(clippy::arithmetic_side_effects)]
fn mul_units(a: &BigUint, b: &BigUint) -> BigUint {
    a * b
}

/// `numerator / denominator` rounded half-to-even. `denominator` is non-zero.
#[allow(clippy::arithmetic_side_effects)]
fn div_half_even(numerator: &BigUint, denominator: &BigUint) -> BigUint {
    let quotient = numerator / denominator;
    let twice_remainder = (numerator % denominator) * 2u32;
    let round_up = match twice_remainder.cmp(denominator) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Equal => quotient.bit(0),
        std::cmp::Ordering::Less => false,
    };
    if round_up {
        quotient + 1u32
    } else {
        quotient
    }
}

impl From<Dec> for Decimal {
    fn from(value: Dec) -> Self {
        value.0
    }
}

impl TryFrom<Decimal> for Dec {
    type Error = ParseDecError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::canonical(value).ok_or_else(|| ParseDecError(value.to_string()))
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when parsing a [`Dec`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal literal: {0}")]
pub struct ParseDecError(pub String);

impl FromStr for Dec {
    type Err = ParseDecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s)
            .ok()
            .and_then(Self::canonical)
            .ok_or_else(|| ParseDecError(s.to_string()))
    }
}

impl BorshSerialize for Dec {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.0.serialize())
    }
}

impl BorshDeserialize for Dec {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; 16];
        reader.read_exact(&mut bytes)?;
        Self::canonical(Decimal::deserialize(bytes)).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "negative decimal")
        })
    }
}
