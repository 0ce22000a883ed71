//! The fee policy port and the proportional policy shipped with the
//! crate.
//!
//! A policy adjusts both sides of a fill: the spend side (base for a
//! buy maker, quote for a sell maker) is grossed up on top of the
//! maker-credited net amount, and the receive side is deducted from
//! the converted amount before it is delivered.

use crate::decimal::{working_scale, Decimal};
use crate::error::{Error, Result};
use crate::money::{ExchangeRate, Money};
use crate::orderbook::order::OrderSide;
use std::fmt;

/// Fees assessed on a single fill, possibly on both sides of the
/// pair. Either side may be absent or zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeeBreakdown {
    pub base_fee: Option<Money>,
    pub quote_fee: Option<Money>,
}

impl FeeBreakdown {
    pub fn is_free(&self) -> bool {
        self.base_fee.as_ref().map_or(true, Money::is_zero)
            && self.quote_fee.as_ref().map_or(true, Money::is_zero)
    }
}

/// Pricing policy attached to an order.
///
/// Implementations must be pure, and `fingerprint` must change
/// whenever any rate-affecting parameter changes; the fingerprint
/// participates in search-state signatures and edge ordering.
pub trait FeePolicy: fmt::Debug + Send + Sync {
    /// Fees for a fill of `base` units against `quote` units, both
    /// expressed as the maker-credited net amounts.
    fn assess(&self, side: OrderSide, base: &Money, quote: &Money) -> Result<FeeBreakdown>;

    /// The gross spend-side amount a router must surrender for the
    /// maker to net `net`.
    fn gross_spend(&self, side: OrderSide, net: &Money) -> Result<Money>;

    /// The net remaining from a gross spend-side amount; inverse of
    /// [`FeePolicy::gross_spend`].
    fn net_spend(&self, side: OrderSide, gross: &Money) -> Result<Money>;

    /// The spend-side net whose fee, had it been deducted from the
    /// gross, would leave exactly `desired`. Seeds the first leg of a
    /// materialisation.
    fn seed_spend(&self, side: OrderSide, desired: &Money) -> Result<Money>;

    /// A stable, non-empty identifier for the policy and all of its
    /// parameters.
    fn fingerprint(&self) -> String;

    /// A rate adjustment expressed by the policy, if any.
    fn effective_rate(&self, side: OrderSide, rate: &ExchangeRate) -> Option<ExchangeRate> {
        let _ = (side, rate);
        None
    }
}

/// Percentage fees on both sides of a fill. Rates must lie in
/// `[0, 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ProportionalFeePolicy {
    base_rate: Decimal,
    quote_rate: Decimal,
}

impl ProportionalFeePolicy {
    pub fn new(base_rate: Decimal, quote_rate: Decimal) -> Result<Self> {
        for (name, rate) in &[("base", &base_rate), ("quote", &quote_rate)] {
            if rate.is_negative() || rate.compare(&Decimal::one(), 0) != std::cmp::Ordering::Less {
                return Err(Error::invalid_input(format!(
                    "{} fee rate {} out of range [0, 1)",
                    name, rate
                )));
            }
        }
        Ok(ProportionalFeePolicy {
            base_rate,
            quote_rate,
        })
    }

    pub fn parse(base_rate: &str, quote_rate: &str) -> Result<Self> {
        ProportionalFeePolicy::new(Decimal::parse(base_rate)?, Decimal::parse(quote_rate)?)
    }

    /// The rate charged on the side the router spends.
    fn spend_rate(&self, side: OrderSide) -> &Decimal {
        match side {
            OrderSide::Buy => &self.base_rate,
            OrderSide::Sell => &self.quote_rate,
        }
    }
}

impl FeePolicy for ProportionalFeePolicy {
    fn assess(&self, _side: OrderSide, base: &Money, quote: &Money) -> Result<FeeBreakdown> {
        let base_scale = working_scale(base.scale(), self.base_rate.scale());
        let quote_scale = working_scale(quote.scale(), self.quote_rate.scale());
        Ok(FeeBreakdown {
            base_fee: Some(base.mul_decimal(&self.base_rate, base_scale)?),
            quote_fee: Some(quote.mul_decimal(&self.quote_rate, quote_scale)?),
        })
    }

    fn gross_spend(&self, side: OrderSide, net: &Money) -> Result<Money> {
        let rate = self.spend_rate(side);
        let factor = Decimal::one().add(rate, rate.scale().max(1))?;
        net.mul_decimal(&factor, working_scale(net.scale(), rate.scale()))
    }

    fn net_spend(&self, side: OrderSide, gross: &Money) -> Result<Money> {
        let rate = self.spend_rate(side);
        let divisor = Decimal::one().add(rate, rate.scale().max(1))?;
        gross.div_decimal(&divisor, working_scale(gross.scale(), rate.scale()))
    }

    fn seed_spend(&self, side: OrderSide, desired: &Money) -> Result<Money> {
        let rate = self.spend_rate(side);
        let divisor = Decimal::one().sub(rate, rate.scale().max(1))?;
        if divisor.is_zero() || divisor.is_negative() {
            return Err(Error::precision(format!(
                "spend-side fee rate {} leaves no net amount to seed",
                rate
            )));
        }
        desired.div_decimal(&divisor, working_scale(desired.scale(), rate.scale()))
    }

    fn fingerprint(&self) -> String {
        format!("proportional:{}:{}", self.base_rate, self.quote_rate)
    }
}
