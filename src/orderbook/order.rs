//! The directional order model.

use crate::decimal::{working_scale, Scale};
use crate::error::{Error, Result};
use crate::money::{Currency, ExchangeRate, Money};
use crate::orderbook::fee::FeePolicy;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// The side of the order's maker.
///
/// A `Buy` maker buys the pair's base asset and pays quote, so a
/// router traversing the order surrenders base and collects quote. A
/// `Sell` maker sells base for quote, so the router surrenders quote
/// and collects base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The traded pair; base and quote must differ.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetPair {
    base: Currency,
    quote: Currency,
}

impl AssetPair {
    pub fn new(base: Currency, quote: Currency) -> Result<Self> {
        if base == quote {
            return Err(Error::invalid_input(format!(
                "asset pair with identical base and quote {}",
                base
            )));
        }
        Ok(AssetPair { base, quote })
    }

    pub fn parse(base: &str, quote: &str) -> Result<Self> {
        AssetPair::new(Currency::new(base)?, Currency::new(quote)?)
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn quote(&self) -> &Currency {
        &self.quote
    }
}

/// Inclusive fillable bounds, denominated in the pair's base asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBounds {
    min: Money,
    max: Money,
}

impl OrderBounds {
    pub fn new(min: Money, max: Money) -> Result<Self> {
        if min.compare(&max)? == Ordering::Greater {
            return Err(Error::invalid_input(format!(
                "order bounds minimum {} exceeds maximum {}",
                min, max
            )));
        }
        Ok(OrderBounds { min, max })
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

    pub fn scale(&self) -> Scale {
        self.min.scale().max(self.max.scale())
    }
}

/// A one-directional offer to exchange between two assets inside a
/// min/max quantity band at a fixed rate, optionally under a fee
/// policy.
#[derive(Clone, Debug)]
pub struct Order {
    side: OrderSide,
    pair: AssetPair,
    bounds: OrderBounds,
    rate: ExchangeRate,
    fee_policy: Option<Arc<dyn FeePolicy>>,
}

impl Order {
    pub fn new(
        side: OrderSide,
        pair: AssetPair,
        bounds: OrderBounds,
        rate: ExchangeRate,
        fee_policy: Option<Arc<dyn FeePolicy>>,
    ) -> Result<Self> {
        if bounds.currency() != pair.base() {
            return Err(Error::invalid_input(format!(
                "order bounds denominated in {} instead of the base asset {}",
                bounds.currency(),
                pair.base()
            )));
        }
        if rate.base() != pair.base() || rate.quote() != pair.quote() {
            return Err(Error::invalid_input(format!(
                "order rate {}/{} does not match the pair {}/{}",
                rate.base(),
                rate.quote(),
                pair.base(),
                pair.quote()
            )));
        }
        Ok(Order {
            side,
            pair,
            bounds,
            rate,
            fee_policy,
        })
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn pair(&self) -> &AssetPair {
        &self.pair
    }

    pub fn bounds(&self) -> &OrderBounds {
        &self.bounds
    }

    pub fn rate(&self) -> &ExchangeRate {
        &self.rate
    }

    pub fn fee_policy(&self) -> Option<&Arc<dyn FeePolicy>> {
        self.fee_policy.as_ref()
    }

    /// The rate after any policy adjustment; the raw rate when the
    /// policy does not express one.
    pub fn effective_rate(&self) -> ExchangeRate {
        self.fee_policy
            .as_ref()
            .and_then(|policy| policy.effective_rate(self.side, &self.rate))
            .unwrap_or_else(|| self.rate.clone())
    }

    /// The quote amount for a base fill at the raw rate.
    pub fn quote_amount(&self, base: &Money) -> Result<Money> {
        self.rate.convert(base)
    }

    /// The quote amount for a base fill with the policy's quote-side
    /// fee applied: reduced for a buy fill (the router collects less),
    /// grossed up for a sell fill (the router pays more).
    pub fn effective_quote_amount(&self, base: &Money) -> Result<Money> {
        let quote = self.rate.convert(base)?;
        let policy = match &self.fee_policy {
            Some(policy) => policy,
            None => return Ok(quote),
        };
        let fees = policy.assess(self.side, base, &quote)?;
        let fee = match fees.quote_fee {
            Some(fee) => fee,
            None => return Ok(quote),
        };
        let scale = working_scale(quote.scale(), fee.scale());
        match self.side {
            OrderSide::Buy => quote.sub(&fee, scale),
            OrderSide::Sell => quote.add(&fee, scale),
        }
    }

    /// Validates that a fill lies inside the order's bounds.
    pub fn validate_partial_fill(&self, fill: &Money) -> Result<()> {
        if fill.currency() != self.pair.base() {
            return Err(Error::invalid_input(format!(
                "fill currency {} does not match the order's base asset {}",
                fill.currency(),
                self.pair.base()
            )));
        }
        if fill.compare(self.bounds.min())? == Ordering::Less
            || fill.compare(self.bounds.max())? == Ordering::Greater
        {
            return Err(Error::invalid_input(format!(
                "fill amount {} outside order bounds [{}, {}]",
                fill,
                self.bounds.min(),
                self.bounds.max()
            )));
        }
        Ok(())
    }
}
