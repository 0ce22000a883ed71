//! Signature-keyed dominance registry.
//!
//! A signature identifies a state by its node and the set of orders
//! already traversed, so partial-fill availability is part of the
//! key; the registry keeps at most one non-dominated (cost, hops)
//! record per signature, with the first-seen record winning ties.

use crate::decimal::{Decimal, COMPARISON_SCALE};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Clone, Debug)]
struct DominanceRecord {
    cost: Decimal,
    hops: u32,
}

/// How a registration attempt resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Registration {
    /// First record for this signature; counts as a new visited state.
    New,
    /// Strictly better than the stored record, which was replaced.
    /// Not a new state.
    Improved,
    /// Strictly worse than the stored record; drop the state.
    Dominated,
    /// Neither dominates; the first-seen record is retained but the
    /// state remains viable.
    Incomparable,
    /// The registry hit its size ceiling and rejects new signatures.
    Rejected,
}

pub(crate) struct DominanceRegistry {
    records: HashMap<String, DominanceRecord>,
    limit: u64,
    limit_reached: bool,
}

impl DominanceRegistry {
    pub(crate) fn new(limit: u64) -> Self {
        DominanceRegistry {
            records: HashMap::new(),
            limit,
            limit_reached: false,
        }
    }

    pub(crate) fn len(&self) -> u64 {
        self.records.len() as u64
    }

    pub(crate) fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    pub(crate) fn register(
        &mut self,
        signature: &str,
        cost: &Decimal,
        hops: u32,
    ) -> Registration {
        match self.records.get_mut(signature) {
            None => {
                if self.records.len() as u64 >= self.limit {
                    self.limit_reached = true;
                    return Registration::Rejected;
                }
                self.records.insert(
                    signature.to_owned(),
                    DominanceRecord {
                        cost: cost.clone(),
                        hops,
                    },
                );
                if self.records.len() as u64 >= self.limit {
                    self.limit_reached = true;
                }
                Registration::New
            }
            Some(record) => {
                if dominates(cost, hops, &record.cost, record.hops) {
                    record.cost = cost.clone();
                    record.hops = hops;
                    Registration::Improved
                } else if dominates(&record.cost, record.hops, cost, hops) {
                    Registration::Dominated
                } else {
                    Registration::Incomparable
                }
            }
        }
    }

    /// Whether the stored record strictly dominates the given state;
    /// checked when a state is popped, since a better record may have
    /// arrived while it sat in the queue.
    pub(crate) fn is_superseded(&self, signature: &str, cost: &Decimal, hops: u32) -> bool {
        self.records
            .get(signature)
            .map_or(false, |record| dominates(&record.cost, record.hops, cost, hops))
    }
}

/// `a` dominates `b` when both its cost and hops are less than or
/// equal, at least one strictly, with costs compared at the
/// comparison scale.
fn dominates(a_cost: &Decimal, a_hops: u32, b_cost: &Decimal, b_hops: u32) -> bool {
    let cost = a_cost.compare_rounded(b_cost, COMPARISON_SCALE);
    let hops = a_hops.cmp(&b_hops);
    cost != Ordering::Greater
        && hops != Ordering::Greater
        && (cost == Ordering::Less || hops == Ordering::Less)
}
