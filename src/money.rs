//! Currency-tagged amounts, directional exchange rates and spend
//! ranges.

use crate::decimal::{Decimal, Scale};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// An asset code: 3 to 12 ASCII letters, normalised to upper case.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self> {
        let valid = (3..=12).contains(&code.len())
            && code.chars().all(|c| c.is_ascii_alphabetic());
        if !valid {
            return Err(Error::invalid_input(format!(
                "invalid currency code {:?}: expected 3 to 12 ASCII letters",
                code
            )));
        }
        Ok(Currency(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A non-negative amount of a single currency.
///
/// Amounts of different currencies never combine; every combining
/// operation checks the tags and fails with `InvalidInput` naming both
/// currencies on a mismatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Money {
    currency: Currency,
    amount: Decimal,
}

impl Money {
    pub fn new(currency: Currency, amount: Decimal) -> Result<Self> {
        if amount.is_negative() {
            return Err(Error::invalid_input(format!(
                "negative amount {} {}",
                amount, currency
            )));
        }
        Ok(Money { currency, amount })
    }

    pub fn parse(currency: &str, amount: &str) -> Result<Self> {
        Money::new(Currency::new(currency)?, Decimal::parse(amount)?)
    }

    pub fn zero(currency: Currency) -> Self {
        Money {
            currency,
            amount: Decimal::zero(0),
        }
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn amount(&self) -> &Decimal {
        &self.amount
    }

    pub fn scale(&self) -> Scale {
        self.amount.scale()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    fn ensure_same_currency(&self, rhs: &Money, operation: &str) -> Result<()> {
        if self.currency != rhs.currency {
            return Err(Error::invalid_input(format!(
                "{} on mismatched currencies {} and {}",
                operation, self.currency, rhs.currency
            )));
        }
        Ok(())
    }

    pub fn add(&self, rhs: &Self, scale: Scale) -> Result<Self> {
        self.ensure_same_currency(rhs, "addition")?;
        Money::new(self.currency.clone(), self.amount.add(&rhs.amount, scale)?)
    }

    /// Subtraction that fails when the result would be negative,
    /// naming both operands.
    pub fn sub(&self, rhs: &Self, scale: Scale) -> Result<Self> {
        self.ensure_same_currency(rhs, "subtraction")?;
        let amount = self.amount.sub(&rhs.amount, scale)?;
        if amount.is_negative() {
            return Err(Error::invalid_input(format!(
                "subtraction underflow: {} - {}",
                self, rhs
            )));
        }
        Money::new(self.currency.clone(), amount)
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(&self, rhs: &Self, scale: Scale) -> Result<Self> {
        self.ensure_same_currency(rhs, "subtraction")?;
        let amount = self.amount.sub(&rhs.amount, scale)?;
        if amount.is_negative() {
            return Ok(Money::zero(self.currency.clone()));
        }
        Money::new(self.currency.clone(), amount)
    }

    pub fn mul_decimal(&self, factor: &Decimal, scale: Scale) -> Result<Self> {
        Money::new(self.currency.clone(), self.amount.mul(factor, scale)?)
    }

    pub fn div_decimal(&self, divisor: &Decimal, scale: Scale) -> Result<Self> {
        Money::new(self.currency.clone(), self.amount.div(divisor, scale)?)
    }

    pub fn with_scale(&self, scale: Scale) -> Result<Self> {
        Money::new(self.currency.clone(), self.amount.to_scale(scale)?)
    }

    /// Exact value comparison; fails on mismatched currencies.
    pub fn compare(&self, rhs: &Self) -> Result<Ordering> {
        self.ensure_same_currency(rhs, "comparison")?;
        Ok(self.amount.compare(&rhs.amount, 0))
    }

    pub(crate) fn min_of(&self, rhs: &Self) -> Result<Self> {
        Ok(match self.compare(rhs)? {
            Ordering::Greater => rhs.clone(),
            _ => self.clone(),
        })
    }

    pub(crate) fn max_of(&self, rhs: &Self) -> Result<Self> {
        Ok(match self.compare(rhs)? {
            Ordering::Less => rhs.clone(),
            _ => self.clone(),
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// A directional conversion rate: one unit of `base` is worth `rate`
/// units of `quote`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeRate {
    base: Currency,
    quote: Currency,
    rate: Decimal,
}

impl ExchangeRate {
    pub fn new(base: Currency, quote: Currency, rate: Decimal) -> Result<Self> {
        if base == quote {
            return Err(Error::invalid_input(format!(
                "exchange rate between identical currencies {} and {}",
                base, quote
            )));
        }
        if rate.is_zero() || rate.is_negative() {
            return Err(Error::invalid_input(format!(
                "non-positive rate {} for {}/{}",
                rate, base, quote
            )));
        }
        Ok(ExchangeRate { base, quote, rate })
    }

    pub fn parse(base: &str, quote: &str, rate: &str) -> Result<Self> {
        ExchangeRate::new(Currency::new(base)?, Currency::new(quote)?, Decimal::parse(rate)?)
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn quote(&self) -> &Currency {
        &self.quote
    }

    pub fn rate(&self) -> &Decimal {
        &self.rate
    }

    pub fn scale(&self) -> Scale {
        self.rate.scale()
    }

    /// Converts a base-denominated amount into the quote currency at
    /// output scale `max(amount.scale, rate.scale)`.
    pub fn convert(&self, amount: &Money) -> Result<Money> {
        if amount.currency() != &self.base {
            return Err(Error::invalid_input(format!(
                "cannot convert {} through rate {}/{}",
                amount, self.base, self.quote
            )));
        }
        let scale = amount.scale().max(self.rate.scale());
        Money::new(self.quote.clone(), amount.amount().mul(&self.rate, scale)?)
    }

    /// The inverse rate, computed with a guard digit at `scale + 1`
    /// and rescaled to the original scale.
    pub fn invert(&self) -> Result<Self> {
        let inverted = Decimal::one().div(&self.rate, self.rate.scale())?;
        if inverted.is_zero() {
            return Err(Error::precision(format!(
                "inverting rate {} {}/{} loses all precision at scale {}",
                self.rate,
                self.base,
                self.quote,
                self.rate.scale()
            )));
        }
        ExchangeRate::new(self.quote.clone(), self.base.clone(), inverted)
    }
}

/// An inclusive range of amounts in one currency. Swapped constructor
/// operands are normalised rather than rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendRange {
    min: Money,
    max: Money,
}

impl SpendRange {
    pub fn new(a: Money, b: Money) -> Result<Self> {
        let (min, max) = match a.compare(&b)? {
            Ordering::Greater => (b, a),
            _ => (a, b),
        };
        Ok(SpendRange { min, max })
    }

    pub fn min(&self) -> &Money {
        &self.min
    }

    pub fn max(&self) -> &Money {
        &self.max
    }

    pub fn currency(&self) -> &Currency {
        self.min.currency()
    }

    pub fn contains(&self, amount: &Money) -> Result<bool> {
        Ok(amount.compare(&self.min)? != Ordering::Less
            && amount.compare(&self.max)? != Ordering::Greater)
    }

    pub fn clamp(&self, amount: &Money) -> Result<Money> {
        amount.max_of(&self.min)?.min_of(&self.max)
    }

    /// The overlap of two ranges, or `None` when they are disjoint.
    pub fn intersect(&self, other: &Self) -> Result<Option<SpendRange>> {
        let min = self.min.max_of(&other.min)?;
        let max = self.max.min_of(&other.max)?;
        if min.compare(&max)? == Ordering::Greater {
            return Ok(None);
        }
        Ok(Some(SpendRange { min, max }))
    }
}

/// A spend range plus the preferred point inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendConstraints {
    range: SpendRange,
    desired: Money,
}

impl SpendConstraints {
    /// The desired point is clamped into the range.
    pub fn new(range: SpendRange, desired: Money) -> Result<Self> {
        let desired = range.clamp(&desired)?;
        Ok(SpendConstraints { range, desired })
    }

    pub fn range(&self) -> &SpendRange {
        &self.range
    }

    pub fn desired(&self) -> &Money {
        &self.desired
    }

    pub fn currency(&self) -> &Currency {
        self.range.currency()
    }
}
