//! The order filter port applied while assembling the graph.

use crate::orderbook::order::Order;
use std::sync::Arc;

/// A predicate over orders, applied in declaration order while the
/// graph is assembled. An order is kept iff every filter accepts it.
#[cfg_attr(test, mockall::automock)]
pub trait OrderFilter: Send + Sync {
    /// Returns whether the order should be kept.
    fn accepts(&self, order: &Order) -> bool;
}

pub(crate) fn accepts_all(filters: &[Arc<dyn OrderFilter>], order: &Order) -> bool {
    filters.iter().all(|filter| filter.accepts(order))
}
