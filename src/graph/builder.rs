//! Translates an order book into the conversion graph.

use crate::error::{Error, Result};
use crate::graph::edge::{EdgeSegment, GraphEdge, OrderId};
use crate::graph::{ConversionGraph, GraphNode};
use crate::money::{Currency, Money, SpendRange};
use crate::orderbook::{accepts_all, Order, OrderFilter, OrderSide};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) fn build(
    orders: &[Arc<Order>],
    filters: &[Arc<dyn OrderFilter>],
) -> Result<ConversionGraph> {
    let mut zero_cache = ZeroCache::default();
    let mut edges_by_origin: HashMap<Currency, Vec<Arc<GraphEdge>>> = HashMap::new();
    let mut destinations: Vec<Currency> = Vec::new();
    let mut edge_count = 0usize;

    for (index, order) in orders.iter().enumerate() {
        if !accepts_all(filters, order) {
            continue;
        }
        let edge = project(order, OrderId(index), &mut zero_cache)?;
        destinations.push(edge.to.clone());
        edges_by_origin
            .entry(edge.from.clone())
            .or_default()
            .push(Arc::new(edge));
        edge_count += 1;
    }

    let mut nodes: HashMap<Currency, GraphNode> = HashMap::new();
    for (currency, mut edges) in edges_by_origin {
        edges.sort_by(|a, b| a.cmp_canonical(b));
        nodes.insert(currency.clone(), GraphNode::new(currency, edges));
    }
    // Destination-only assets still appear as (edgeless) nodes.
    for currency in destinations {
        nodes
            .entry(currency.clone())
            .or_insert_with(|| GraphNode::new(currency, Vec::new()));
    }

    log::debug!(
        "projected {} orders into {} nodes and {} edges",
        orders.len(),
        nodes.len(),
        edge_count,
    );
    Ok(ConversionGraph::from_nodes(nodes))
}

/// Projects one order onto its directed edge, deriving the base,
/// quote and gross-base capacities and the segment split.
fn project(order: &Arc<Order>, order_id: OrderId, zeros: &mut ZeroCache) -> Result<GraphEdge> {
    let fee_fingerprint = match order.fee_policy() {
        None => String::new(),
        Some(policy) => {
            let fingerprint = policy.fingerprint();
            if fingerprint.is_empty() {
                return Err(Error::invalid_input(format!(
                    "empty fee-policy fingerprint on {} order {}/{}",
                    order.side(),
                    order.pair().base(),
                    order.pair().quote()
                )));
            }
            fingerprint
        }
    };

    let rate = order.effective_rate();
    let bounds = order.bounds();
    let base_capacity = SpendRange::new(bounds.min().clone(), bounds.max().clone())?;
    let quote_capacity = SpendRange::new(rate.convert(bounds.min())?, rate.convert(bounds.max())?)?;
    let gross_base_capacity = match (order.side(), order.fee_policy()) {
        (OrderSide::Buy, Some(policy)) => SpendRange::new(
            policy.gross_spend(OrderSide::Buy, bounds.min())?,
            policy.gross_spend(OrderSide::Buy, bounds.max())?,
        )?,
        _ => base_capacity.clone(),
    };

    let (from, to, conversion) = match order.side() {
        OrderSide::Buy => (
            order.pair().base().clone(),
            order.pair().quote().clone(),
            rate.clone(),
        ),
        OrderSide::Sell => (
            order.pair().quote().clone(),
            order.pair().base().clone(),
            rate.invert()?,
        ),
    };

    let segments = split_segments(
        order,
        &base_capacity,
        &quote_capacity,
        &gross_base_capacity,
        zeros,
    )?;

    Ok(GraphEdge {
        from,
        to,
        side: order.side(),
        order: order.clone(),
        order_id,
        fee_fingerprint,
        rate,
        conversion,
        base_capacity,
        quote_capacity,
        gross_base_capacity,
        segments,
    })
}

/// Splits per-order capacity into at most one mandatory segment
/// `[min, min]` plus one optional segment `[0, max - min]`. The
/// mandatory segment is omitted when the minimum is zero, the
/// optional one when the bounds collapse to a point. An order with a
/// zero minimum and no fees carries its single optional segment
/// implicitly in the edge capacities and allocates nothing.
fn split_segments(
    order: &Arc<Order>,
    base: &SpendRange,
    quote: &SpendRange,
    gross_base: &SpendRange,
    zeros: &mut ZeroCache,
) -> Result<Vec<EdgeSegment>> {
    let has_mandatory = !base.min().is_zero();
    let has_optional = base.min() != base.max();
    if !has_mandatory && order.fee_policy().is_none() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::with_capacity(2);
    if has_mandatory {
        segments.push(EdgeSegment::new(
            true,
            point(base.min())?,
            point(quote.min())?,
            point(gross_base.min())?,
        ));
    }
    if has_optional {
        segments.push(EdgeSegment::new(
            false,
            headroom(base, zeros)?,
            headroom(quote, zeros)?,
            headroom(gross_base, zeros)?,
        ));
    }
    Ok(segments)
}

fn point(at: &Money) -> Result<SpendRange> {
    SpendRange::new(at.clone(), at.clone())
}

fn headroom(capacity: &SpendRange, zeros: &mut ZeroCache) -> Result<SpendRange> {
    let zero = zeros.zero_for(capacity.currency());
    let span = capacity.max().sub(
        capacity.min(),
        capacity.max().scale().max(capacity.min().scale()),
    )?;
    SpendRange::new(zero, span)
}

/// Shared zero amounts, one per currency, so segment floors do not
/// re-allocate.
#[derive(Default)]
struct ZeroCache(HashMap<Currency, Money>);

impl ZeroCache {
    fn zero_for(&mut self, currency: &Currency) -> Money {
        self.0
            .entry(currency.clone())
            .or_insert_with(|| Money::zero(currency.clone()))
            .clone()
    }
}
