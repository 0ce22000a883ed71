//! Search states, their signatures and spend-range propagation.

use crate::decimal::{Decimal, CANONICAL_SCALE};
use crate::error::Result;
use crate::graph::{GraphEdge, OrderId};
use crate::money::{Currency, SpendConstraints, SpendRange};
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::sync::Arc;

/// One state of the best-first search: a node, the accumulated cost
/// in source units per target unit, and the path that led here.
#[derive(Clone, Debug)]
pub(crate) struct SearchState {
    pub node: Currency,
    pub cost: Decimal,
    /// Cumulative conversion ratio along the path; `cost` is its
    /// inverse once at least one edge has been traversed.
    pub product: Decimal,
    pub hops: u32,
    pub edges: Vec<Arc<GraphEdge>>,
    pub signature: String,
    pub spend: Option<SpendConstraints>,
}

impl SearchState {
    pub(crate) fn seed(node: Currency, spend: Option<SpendConstraints>) -> Self {
        let signature = signature_for(&node, &[]);
        SearchState {
            node,
            cost: Decimal::zero(0),
            product: Decimal::one(),
            hops: 0,
            edges: Vec::new(),
            signature,
            spend,
        }
    }

    pub(crate) fn uses_order(&self, id: OrderId) -> bool {
        self.edges.iter().any(|edge| edge.order_id() == id)
    }

    /// The state after traversing `edge`, or `None` when the spend
    /// range does not survive the edge's capacity.
    pub(crate) fn successor(&self, edge: &Arc<GraphEdge>) -> Result<Option<SearchState>> {
        let spend = match &self.spend {
            None => None,
            Some(constraints) => match propagate(constraints, edge)? {
                None => return Ok(None),
                Some(next) => Some(next),
            },
        };

        let ratio = edge.conversion.rate();
        let numerator = if self.hops == 0 {
            Decimal::one()
        } else {
            self.cost.clone()
        };
        let cost = numerator.div(ratio, CANONICAL_SCALE)?;
        let product = self.product.mul(ratio, CANONICAL_SCALE)?;

        let mut edges = self.edges.clone();
        edges.push(edge.clone());
        let signature = signature_for(edge.to(), &edges);

        Ok(Some(SearchState {
            node: edge.to().clone(),
            cost,
            product,
            hops: self.hops + 1,
            edges,
            signature,
            spend,
        }))
    }
}

/// A stable signature of `(node, set of traversed orders, fee
/// fingerprints)`. Order identities are sorted so that two paths
/// using the same orders in different sequence collate together.
pub(crate) fn signature_for(node: &Currency, edges: &[Arc<GraphEdge>]) -> String {
    let mut used: Vec<(usize, &str)> = edges
        .iter()
        .map(|edge| (edge.order_id().index(), edge.fee_fingerprint.as_str()))
        .collect();
    used.sort_unstable();

    let mut signature = format!("{}::", node);
    for (position, (id, fingerprint)) in used.iter().enumerate() {
        if position > 0 {
            signature.push('|');
        }
        let _ = write!(signature, "#{}={}", id, fingerprint);
    }
    signature
}

/// Clips a spend range against the edge's applicable capacity and
/// converts the survivors into the destination currency.
///
/// The capacity floor is lifted to the segment mandatory total when
/// that exceeds the raw minimum. An empty intersection prunes the
/// edge; a zero-capacity edge survives only if the range reaches
/// zero.
fn propagate(
    constraints: &SpendConstraints,
    edge: &Arc<GraphEdge>,
) -> Result<Option<SpendConstraints>> {
    let capacity = edge.spend_capacity();
    let mandatory = edge.mandatory_total(edge.spend_measure())?;
    let floor = if mandatory.compare(capacity.min())? == Ordering::Greater {
        mandatory
    } else {
        capacity.min().clone()
    };
    let capacity = SpendRange::new(floor, capacity.max().clone())?;

    let clipped = match constraints.range().intersect(&capacity)? {
        None => return Ok(None),
        Some(clipped) => clipped,
    };

    let min = edge.conversion.convert(clipped.min())?;
    let max = edge.conversion.convert(clipped.max())?;
    let desired = edge.conversion.convert(&clipped.clamp(constraints.desired())?)?;
    Ok(Some(SpendConstraints::new(
        SpendRange::new(min, max)?,
        desired,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ConversionGraph;
    use crate::money::Money;

    fn single_edge(orders: Vec<crate::orderbook::Order>, origin: &str) -> Arc<GraphEdge> {
        let orders: Vec<_> = orders.into_iter().map(Arc::new).collect();
        let graph = ConversionGraph::from_orders(&orders, &[]).unwrap();
        graph.node(&Currency::new(origin).unwrap()).unwrap().edges()[0].clone()
    }

    fn constraints(currency: &str, min: &str, max: &str, desired: &str) -> SpendConstraints {
        SpendConstraints::new(
            SpendRange::new(
                Money::parse(currency, min).unwrap(),
                Money::parse(currency, max).unwrap(),
            )
            .unwrap(),
            Money::parse(currency, desired).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn signatures_ignore_traversal_sequence() {
        let orders: Vec<_> = orders! {
            sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"],
            buy "USD" / "JPY" @ "150.000" bounds ["50.000", "200.000"],
        }
        .into_iter()
        .map(Arc::new)
        .collect();
        let graph = ConversionGraph::from_orders(&orders, &[]).unwrap();
        let eur_edge = graph
            .node(&Currency::new("EUR").unwrap())
            .unwrap()
            .edges()[0]
            .clone();
        let usd_edge = graph
            .node(&Currency::new("USD").unwrap())
            .unwrap()
            .edges()[0]
            .clone();

        let node = Currency::new("JPY").unwrap();
        let forward = signature_for(&node, &[eur_edge.clone(), usd_edge.clone()]);
        let backward = signature_for(&node, &[usd_edge, eur_edge]);
        assert_eq!(forward, backward);
        assert!(forward.starts_with("JPY::"));
    }

    #[test]
    fn successor_converts_range_and_cost_through_the_edge() {
        let edge = single_edge(
            orders! { sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"] },
            "EUR",
        );
        let seed = SearchState::seed(
            Currency::new("EUR").unwrap(),
            Some(constraints("EUR", "75.000", "125.000", "100.000")),
        );
        let next = seed.successor(&edge).unwrap().unwrap();
        assert_eq!(next.node.as_str(), "USD");
        assert_eq!(next.hops, 1);

        let spend = next.spend.unwrap();
        assert_eq!(spend.desired(), &Money::parse("USD", "111.100").unwrap());
        assert_eq!(spend.range().min(), &Money::parse("USD", "83.325").unwrap());
        assert_eq!(spend.range().max(), &Money::parse("USD", "138.875").unwrap());

        // 1 / 1.111 at the canonical scale
        assert_eq!(next.cost.to_string(), "0.900090009000900090");
    }

    #[test]
    fn capacity_clips_and_prunes_the_spend_range() {
        let edge = single_edge(
            orders! { sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"] },
            "EUR",
        );
        // quote capacity is [9.000, 180.000] EUR
        let seed = SearchState::seed(
            Currency::new("EUR").unwrap(),
            Some(constraints("EUR", "5.000", "8.000", "6.000")),
        );
        assert!(seed.successor(&edge).unwrap().is_none());

        let clipped = SearchState::seed(
            Currency::new("EUR").unwrap(),
            Some(constraints("EUR", "5.000", "20.000", "6.000")),
        );
        let next = clipped.successor(&edge).unwrap().unwrap();
        let spend = next.spend.unwrap();
        // the floor came from the capacity minimum (9.000 EUR), the
        // desired point was clamped up to it before conversion
        assert_eq!(spend.range().min(), &Money::parse("USD", "9.999").unwrap());
        assert_eq!(spend.desired(), &Money::parse("USD", "9.999").unwrap());
    }

    #[test]
    fn mandatory_minimum_lifts_the_capacity_floor() {
        let edge = single_edge(
            orders! { sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"] },
            "EUR",
        );
        let mandatory = edge
            .mandatory_total(edge.spend_measure())
            .unwrap();
        assert_eq!(mandatory, Money::parse("EUR", "9.000").unwrap());
    }
}
