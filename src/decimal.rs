//! Fixed-scale decimal arithmetic with HALF_UP rounding.
//!
//! Every operation takes an explicit output scale; there is no
//! implicit precision anywhere in the crate. Divisions compute one
//! guard digit beyond the requested scale before the final rescale.

use crate::error::{Error, Result};
use bigdecimal::num_bigint::BigInt;
use bigdecimal::num_traits::{Signed, Zero};
use bigdecimal::{BigDecimal, RoundingMode};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits carried by a decimal value.
pub type Scale = i64;

/// The scale used for internal arithmetic before results are rescaled
/// for presentation.
pub const CANONICAL_SCALE: Scale = 18;

/// The coarser scale at which path costs are compared for ordering and
/// dominance purposes.
pub const COMPARISON_SCALE: Scale = 6;

/// The largest scale accepted anywhere in the crate.
pub const MAX_SCALE: Scale = 30;

/// An exact decimal value with an explicit, non-negative scale.
///
/// The canonical string form always pads the fraction to exactly
/// `scale` digits, so a value rescaled to 3 prints as `"1.200"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Decimal(BigDecimal);

impl Decimal {
    /// Parses a canonical numeric string. Exponent notation is not
    /// canonical and is rejected.
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::invalid_input("empty decimal string"));
        }
        if input.contains('e') || input.contains('E') {
            return Err(Error::invalid_input(format!(
                "exponent notation is not canonical: {:?}",
                input
            )));
        }
        let value = BigDecimal::from_str(input).map_err(|err| {
            Error::invalid_input(format!("malformed decimal string {:?}: {}", input, err))
        })?;
        Decimal::new(value)
    }

    /// Wraps a raw value, normalising negative scales away and
    /// rejecting scales beyond [`MAX_SCALE`].
    pub(crate) fn new(value: BigDecimal) -> Result<Self> {
        let scale = value.fractional_digit_count();
        if scale < 0 {
            // NOTE: A negative scale only carries trailing zeros, so
            // expanding it to scale 0 is exact.
            return Ok(Decimal(value.with_scale(0)));
        }
        if scale > MAX_SCALE {
            return Err(Error::invalid_input(format!(
                "scale {} exceeds the maximum supported scale {}",
                scale, MAX_SCALE
            )));
        }
        Ok(Decimal(value))
    }

    /// A value of `units * 10^-scale`, the integer-unit constructor
    /// that round-trips through canonical strings.
    pub fn from_units(units: i64, scale: Scale) -> Result<Self> {
        check_scale(scale)?;
        Ok(Decimal(BigDecimal::new(BigInt::from(units), scale)))
    }

    /// Zero at the given scale.
    pub fn zero(scale: Scale) -> Self {
        let scale = scale.max(0).min(MAX_SCALE);
        Decimal(BigDecimal::zero().with_scale(scale))
    }

    /// One at scale 0.
    pub fn one() -> Self {
        Decimal(BigDecimal::from(1))
    }

    pub fn scale(&self) -> Scale {
        self.0.fractional_digit_count().max(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Rescales HALF_UP; the only rounding primitive in the crate.
    pub fn to_scale(&self, scale: Scale) -> Result<Self> {
        check_scale(scale)?;
        Ok(Decimal(self.0.with_scale_round(scale, RoundingMode::HalfUp)))
    }

    pub fn add(&self, rhs: &Self, scale: Scale) -> Result<Self> {
        check_scale(scale)?;
        Ok(Decimal(
            (&self.0 + &rhs.0).with_scale_round(scale, RoundingMode::HalfUp),
        ))
    }

    pub fn sub(&self, rhs: &Self, scale: Scale) -> Result<Self> {
        check_scale(scale)?;
        Ok(Decimal(
            (&self.0 - &rhs.0).with_scale_round(scale, RoundingMode::HalfUp),
        ))
    }

    pub fn mul(&self, rhs: &Self, scale: Scale) -> Result<Self> {
        check_scale(scale)?;
        Ok(Decimal(
            (&self.0 * &rhs.0).with_scale_round(scale, RoundingMode::HalfUp),
        ))
    }

    /// Division with one guard digit before the final rescale.
    pub fn div(&self, rhs: &Self, scale: Scale) -> Result<Self> {
        check_scale(scale)?;
        if rhs.is_zero() {
            return Err(Error::invalid_input(format!(
                "division by zero: {} / {}",
                self, rhs
            )));
        }
        let quotient = &self.0 / &rhs.0;
        let guarded = quotient.with_scale_round(scale + 1, RoundingMode::HalfUp);
        Ok(Decimal(guarded.with_scale_round(scale, RoundingMode::HalfUp)))
    }

    /// Compares at scale `max(self.scale(), rhs.scale(), scale)`. The
    /// comparison scale never coarsens either operand.
    pub fn compare(&self, rhs: &Self, scale: Scale) -> Ordering {
        let at = self.scale().max(rhs.scale()).max(scale);
        self.0
            .with_scale_round(at, RoundingMode::HalfUp)
            .cmp(&rhs.0.with_scale_round(at, RoundingMode::HalfUp))
    }

    /// Compares after rounding both operands HALF_UP to `scale`. Used
    /// where nearby values must collate as equal, e.g. cost ordering.
    pub fn compare_rounded(&self, rhs: &Self, scale: Scale) -> Ordering {
        self.0
            .with_scale_round(scale, RoundingMode::HalfUp)
            .cmp(&rhs.0.with_scale_round(scale, RoundingMode::HalfUp))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The output scale for a binary operation on operands with the given
/// scales: the wider of the two, at least 1.
pub(crate) fn working_scale(a: Scale, b: Scale) -> Scale {
    a.max(b).max(1)
}

fn check_scale(scale: Scale) -> Result<()> {
    if (0..=MAX_SCALE).contains(&scale) {
        Ok(())
    } else {
        Err(Error::invalid_input(format!(
            "scale {} out of range 0..={}",
            scale, MAX_SCALE
        )))
    }
}
