//! Graph representation of an order book where assets are nodes and
//! orders are directed edges.
//!
//! Nodes own their outgoing edges in a canonical total order, which is
//! what makes traversal, and therefore result ordering, deterministic
//! for a fixed order book. Top-K iterations never mutate a graph; they
//! work against derived views with an exclusion set.

mod builder;
mod edge;

pub(crate) use self::edge::CapacityMeasure;
pub use self::edge::{EdgeSegment, GraphEdge, OrderId};
use crate::error::Result;
use crate::money::Currency;
use crate::orderbook::{Order, OrderFilter};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A node and its canonically ordered outgoing edges.
#[derive(Clone, Debug)]
pub struct GraphNode {
    currency: Currency,
    edges: Vec<Arc<GraphEdge>>,
}

impl GraphNode {
    pub(crate) fn new(currency: Currency, edges: Vec<Arc<GraphEdge>>) -> Self {
        debug_assert!(edges.iter().all(|edge| edge.from() == &currency));
        GraphNode { currency, edges }
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn edges(&self) -> &[Arc<GraphEdge>] {
        &self.edges
    }
}

/// The conversion graph built from an order book.
#[derive(Clone, Debug, Default)]
pub struct ConversionGraph {
    nodes: HashMap<Currency, GraphNode>,
}

impl ConversionGraph {
    /// Builds the graph from an ordered sequence of orders, keeping
    /// only orders every filter accepts.
    pub fn from_orders(
        orders: &[Arc<Order>],
        filters: &[Arc<dyn OrderFilter>],
    ) -> Result<Self> {
        builder::build(orders, filters)
    }

    pub(crate) fn from_nodes(nodes: HashMap<Currency, GraphNode>) -> Self {
        ConversionGraph { nodes }
    }

    pub fn node(&self, currency: &Currency) -> Option<&GraphNode> {
        self.nodes.get(currency)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.edges.len()).sum()
    }

    /// A view of the graph without the excluded orders. Nodes whose
    /// edges are untouched share their edge storage with the base
    /// graph; an empty exclusion returns the graph unchanged.
    pub fn without_orders(&self, excluded: &ExclusionSet) -> ConversionGraph {
        if excluded.is_empty() {
            return self.clone();
        }
        let nodes = self
            .nodes
            .iter()
            .map(|(currency, node)| {
                let filtered = if node
                    .edges
                    .iter()
                    .any(|edge| excluded.contains(edge.order_id()))
                {
                    let edges = node
                        .edges
                        .iter()
                        .filter(|edge| !excluded.contains(edge.order_id()))
                        .cloned()
                        .collect();
                    GraphNode::new(currency.clone(), edges)
                } else {
                    node.clone()
                };
                (currency.clone(), filtered)
            })
            .collect();
        ConversionGraph { nodes }
    }
}

/// Order identities excluded from a derived graph view; membership is
/// O(1).
#[derive(Clone, Debug, Default)]
pub struct ExclusionSet(HashSet<OrderId>);

impl ExclusionSet {
    pub fn new() -> Self {
        ExclusionSet::default()
    }

    pub fn insert(&mut self, id: OrderId) {
        self.0.insert(id);
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = OrderId>) {
        self.0.extend(ids);
    }
}
