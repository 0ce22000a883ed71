//! Deterministic ranking of accepted candidate paths.

use crate::decimal::{Decimal, Scale, COMPARISON_SCALE, MAX_SCALE};
use crate::error::{Error, Result};
use std::cmp::Ordering;

/// The key accepted paths are ranked by.
#[derive(Clone, Debug)]
pub struct PathOrderKey {
    pub cost: Decimal,
    pub hops: u32,
    /// Canonical `from->to->...->to` route string.
    pub route_signature: String,
    /// Acceptance sequence number; the mandatory final tie-breaker.
    pub insertion_order: u64,
}

/// Total ordering over accepted paths. Implementations must be total,
/// transitive, deterministic and stable; insertion order as the final
/// tie-breaker is mandatory.
pub trait PathOrdering: Send + Sync {
    fn compare(&self, a: &PathOrderKey, b: &PathOrderKey) -> Ordering;
}

/// The default order: cost ascending (compared at a configurable
/// scale), hops ascending, route signature ascending, insertion order
/// ascending.
#[derive(Clone, Debug)]
pub struct DefaultPathOrdering {
    cost_scale: Scale,
}

impl DefaultPathOrdering {
    pub const DEFAULT_COST_SCALE: Scale = COMPARISON_SCALE;

    pub fn new(cost_scale: Scale) -> Result<Self> {
        if !(0..=MAX_SCALE).contains(&cost_scale) {
            return Err(Error::invalid_input(format!(
                "cost comparison scale {} out of range 0..={}",
                cost_scale, MAX_SCALE
            )));
        }
        Ok(DefaultPathOrdering { cost_scale })
    }
}

impl Default for DefaultPathOrdering {
    fn default() -> Self {
        DefaultPathOrdering {
            cost_scale: DefaultPathOrdering::DEFAULT_COST_SCALE,
        }
    }
}

impl PathOrdering for DefaultPathOrdering {
    fn compare(&self, a: &PathOrderKey, b: &PathOrderKey) -> Ordering {
        a.cost
            .compare_rounded(&b.cost, self.cost_scale)
            .then_with(|| a.hops.cmp(&b.hops))
            .then_with(|| a.route_signature.cmp(&b.route_signature))
            .then_with(|| a.insertion_order.cmp(&b.insertion_order))
    }
}

/// Keeps the best `limit` entries under a path ordering; inserting
/// beyond the limit drops the largest entry.
pub(crate) struct BoundedResults<T> {
    limit: usize,
    entries: Vec<(PathOrderKey, T)>,
}

impl<T> BoundedResults<T> {
    pub(crate) fn new(limit: usize) -> Self {
        BoundedResults {
            limit,
            entries: Vec::with_capacity(limit.saturating_add(1)),
        }
    }

    pub(crate) fn insert(&mut self, key: PathOrderKey, value: T, ordering: &dyn PathOrdering) {
        let at = self
            .entries
            .iter()
            .position(|(existing, _)| ordering.compare(&key, existing) == Ordering::Less)
            .unwrap_or_else(|| self.entries.len());
        self.entries.insert(at, (key, value));
        if self.entries.len() > self.limit {
            self.entries.pop();
        }
    }

    pub(crate) fn into_sorted(self) -> Vec<(PathOrderKey, T)> {
        self.entries
    }
}
