//! Optimal conversion paths through a peer-to-peer order book.
//!
//! The crate projects an order book onto a graph whose nodes are
//! assets and whose edges are orders, runs a deterministic best-first
//! search for routes between a source and a target asset, and
//! materialises the surviving routes into concrete plans with exact
//! per-hop amounts and fees. All monetary arithmetic is exact decimal
//! arithmetic with explicit scales and HALF_UP rounding.
//!
//! Results are ranked and disjoint: every returned plan uses a set of
//! orders no other returned plan touches, so up to `result_limit`
//! genuine alternatives come back from one request.

#![deny(clippy::unreadable_literal)]


mod api;
mod decimal;
mod error;
mod graph;
mod money;
mod orderbook;
mod plan;
mod search;

pub use self::api::{HopLimits, SearchConfig, SearchConfigBuilder, ToleranceWindow};
pub use self::decimal::{Decimal, Scale, CANONICAL_SCALE, COMPARISON_SCALE, MAX_SCALE};
pub use self::error::{Error, Result};
pub use self::graph::{
    ConversionGraph, EdgeSegment, ExclusionSet, GraphEdge, GraphNode, OrderId,
};
pub use self::money::{Currency, ExchangeRate, Money, SpendConstraints, SpendRange};
pub use self::orderbook::{
    AssetPair, FeeBreakdown, FeePolicy, Order, OrderBounds, OrderFilter, OrderSide,
    ProportionalFeePolicy,
};
pub use self::plan::{Outcome, Plan, Step};
pub use self::search::{
    DefaultPathOrdering, MonotonicClock, PathOrderKey, PathOrdering, SearchGuardReport,
    SearchGuards, SystemClock,
};

use std::sync::Arc;

/// API entry point for finding conversion plans over an order book.
///
/// The order book is captured once; every call to
/// [`Routegraph::find_best_plans`] builds a fresh graph view from it
/// under the request's filters, so calls never observe each other.
#[derive(Clone, Debug)]
pub struct Routegraph {
    orders: Vec<Arc<Order>>,
}

impl Routegraph {
    /// Creates a new `Routegraph` from an iterator of orders.
    pub fn new(orders: impl IntoIterator<Item = Order>) -> Self {
        Routegraph {
            orders: orders.into_iter().map(Arc::new).collect(),
        }
    }

    /// Creates a new `Routegraph` from already shared orders.
    pub fn from_shared(orders: Vec<Arc<Order>>) -> Self {
        Routegraph { orders }
    }

    pub fn num_orders(&self) -> usize {
        self.orders.len()
    }

    /// Finds up to `result_limit` order-disjoint execution plans from
    /// the configured spend asset to `target`, best first.
    ///
    /// A tripped guard is a normal outcome with the corresponding
    /// report flag set; an empty plan list means no viable path.
    pub fn find_best_plans(&self, config: &SearchConfig, target: &Currency) -> Result<Outcome> {
        plan::service::find_best_plans(&self.orders, config, target)
    }
}
