//! Edges of the conversion graph with derived capacities and capacity
//! segments.

use crate::decimal::working_scale;
use crate::error::Result;
use crate::money::{Currency, ExchangeRate, Money, SpendRange};
use crate::orderbook::{Order, OrderSide};
use std::cmp::Ordering;
use std::sync::Arc;

/// Stable identity of an order inside one graph: the position at
/// which it was inserted. Top-K exclusion and state signatures key on
/// this rather than machine addresses so that two runs over the same
/// order book collate identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(pub(crate) usize);

impl OrderId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The quantity measure a capacity range is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CapacityMeasure {
    Base,
    Quote,
    GrossBase,
}

/// One contiguous slice of an edge's capacity. An edge carries at
/// most one mandatory segment (the order's minimum fill) and one
/// optional segment (the headroom above it).
#[derive(Clone, Debug)]
pub struct EdgeSegment {
    mandatory: bool,
    base: SpendRange,
    quote: SpendRange,
    gross_base: SpendRange,
}

impl EdgeSegment {
    pub(crate) fn new(
        mandatory: bool,
        base: SpendRange,
        quote: SpendRange,
        gross_base: SpendRange,
    ) -> Self {
        EdgeSegment {
            mandatory,
            base,
            quote,
            gross_base,
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn base(&self) -> &SpendRange {
        &self.base
    }

    pub fn quote(&self) -> &SpendRange {
        &self.quote
    }

    pub fn gross_base(&self) -> &SpendRange {
        &self.gross_base
    }

    pub(crate) fn range(&self, measure: CapacityMeasure) -> &SpendRange {
        match measure {
            CapacityMeasure::Base => &self.base,
            CapacityMeasure::Quote => &self.quote,
            CapacityMeasure::GrossBase => &self.gross_base,
        }
    }
}

/// The directed projection of one order: base to quote for a buy
/// maker, quote to base for a sell maker.
#[derive(Clone, Debug)]
pub struct GraphEdge {
    pub(crate) from: Currency,
    pub(crate) to: Currency,
    pub(crate) side: OrderSide,
    pub(crate) order: Arc<Order>,
    pub(crate) order_id: OrderId,
    pub(crate) fee_fingerprint: String,
    /// The order's effective rate, base to quote.
    pub(crate) rate: ExchangeRate,
    /// The rate in traversal direction, `from` to `to`; the inverted
    /// effective rate for sell edges.
    pub(crate) conversion: ExchangeRate,
    pub(crate) base_capacity: SpendRange,
    pub(crate) quote_capacity: SpendRange,
    pub(crate) gross_base_capacity: SpendRange,
    pub(crate) segments: Vec<EdgeSegment>,
}

impl GraphEdge {
    pub fn from(&self) -> &Currency {
        &self.from
    }

    pub fn to(&self) -> &Currency {
        &self.to
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn order(&self) -> &Arc<Order> {
        &self.order
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn rate(&self) -> &ExchangeRate {
        &self.rate
    }

    pub fn base_capacity(&self) -> &SpendRange {
        &self.base_capacity
    }

    pub fn quote_capacity(&self) -> &SpendRange {
        &self.quote_capacity
    }

    pub fn gross_base_capacity(&self) -> &SpendRange {
        &self.gross_base_capacity
    }

    pub fn segments(&self) -> &[EdgeSegment] {
        &self.segments
    }

    pub(crate) fn capacity(&self, measure: CapacityMeasure) -> &SpendRange {
        match measure {
            CapacityMeasure::Base => &self.base_capacity,
            CapacityMeasure::Quote => &self.quote_capacity,
            CapacityMeasure::GrossBase => &self.gross_base_capacity,
        }
    }

    /// The capacity governing the currency a router spends traversing
    /// this edge: pre-fee base for buy edges, quote for sell edges.
    pub fn spend_capacity(&self) -> &SpendRange {
        self.capacity(self.spend_measure())
    }

    pub(crate) fn spend_measure(&self) -> CapacityMeasure {
        match self.side {
            OrderSide::Buy => CapacityMeasure::GrossBase,
            OrderSide::Sell => CapacityMeasure::Quote,
        }
    }

    /// The sum of mandatory segment minimums in the given measure.
    pub(crate) fn mandatory_total(&self, measure: CapacityMeasure) -> Result<Money> {
        let mut total = Money::zero(self.capacity(measure).currency().clone());
        for segment in self.segments.iter().filter(|s| s.is_mandatory()) {
            let min = segment.range(measure).min();
            total = total.add(min, working_scale(total.scale(), min.scale()))?;
        }
        Ok(total)
    }

    /// The sum of all segment maximums in the given measure. A
    /// degenerate edge without segments carries its whole capacity in
    /// one implicit optional segment.
    pub(crate) fn maximum_total(&self, measure: CapacityMeasure) -> Result<Money> {
        if self.segments.is_empty() {
            return Ok(self.capacity(measure).max().clone());
        }
        let mut total = Money::zero(self.capacity(measure).currency().clone());
        for segment in &self.segments {
            let max = segment.range(measure).max();
            total = total.add(max, working_scale(total.scale(), max.scale()))?;
        }
        Ok(total)
    }

    /// The canonical total ordering of edges leaving one node:
    /// destination, side, fee fingerprint, effective rate descending,
    /// bounds, insertion index.
    pub(crate) fn cmp_canonical(&self, other: &GraphEdge) -> Ordering {
        self.to
            .cmp(&other.to)
            .then_with(|| self.side.cmp(&other.side))
            .then_with(|| self.fee_fingerprint.cmp(&other.fee_fingerprint))
            .then_with(|| other.rate.rate().compare(self.rate.rate(), 0))
            .then_with(|| {
                self.order
                    .bounds()
                    .min()
                    .amount()
                    .compare(other.order.bounds().min().amount(), 0)
            })
            .then_with(|| {
                self.order
                    .bounds()
                    .max()
                    .amount()
                    .compare(other.order.bounds().max().amount(), 0)
            })
            .then_with(|| self.order_id.cmp(&other.order_id))
    }
}
