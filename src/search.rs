//! Best-first path search with tolerance pruning, dominance and guard
//! rails.
//!
//! The search is single threaded and fully deterministic for a fixed
//! graph and request: the queue is total-ordered by `(cost, hops,
//! signature, insertion index)`, edges are expanded in canonical
//! order, dominance ties resolve first-seen, and the clock only feeds
//! the time-budget guard.

mod dominance;
mod guard;
mod ordering;
mod state;

use self::dominance::{DominanceRegistry, Registration};
use self::guard::GuardCounters;
pub use self::guard::{MonotonicClock, SearchGuardReport, SearchGuards, SystemClock};
pub(crate) use self::ordering::BoundedResults;
pub use self::ordering::{DefaultPathOrdering, PathOrderKey, PathOrdering};
use self::state::SearchState;
use crate::decimal::{Decimal, CANONICAL_SCALE};
use crate::error::Result;
use crate::graph::{ConversionGraph, GraphEdge};
use crate::money::{Currency, SpendConstraints};
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

/// A path that reached the target but has not been materialised yet.
#[derive(Clone, Debug)]
pub(crate) struct CandidatePath {
    cost: Decimal,
    product: Decimal,
    hops: u32,
    edges: Vec<Arc<GraphEdge>>,
    spend: Option<SpendConstraints>,
}

impl CandidatePath {
    fn from_state(state: &SearchState) -> Self {
        CandidatePath {
            cost: state.cost.clone(),
            product: state.product.clone(),
            hops: state.hops,
            edges: state.edges.clone(),
            spend: state.spend.clone(),
        }
    }

    pub(crate) fn cost(&self) -> &Decimal {
        &self.cost
    }

    pub(crate) fn product(&self) -> &Decimal {
        &self.product
    }

    pub(crate) fn hops(&self) -> u32 {
        self.hops
    }

    pub(crate) fn edges(&self) -> &[Arc<GraphEdge>] {
        &self.edges
    }

    pub(crate) fn spend(&self) -> Option<&SpendConstraints> {
        self.spend.as_ref()
    }

    /// The canonical `from->to->...->to` route string.
    pub(crate) fn route_signature(&self) -> String {
        let mut route = String::new();
        for (index, edge) in self.edges.iter().enumerate() {
            if index == 0 {
                route.push_str(edge.from().as_str());
            }
            route.push_str("->");
            route.push_str(edge.to().as_str());
        }
        route
    }
}

/// Inputs of one search run.
pub(crate) struct SearchParams {
    pub source: Currency,
    pub target: Currency,
    pub max_hops: u32,
    pub constraints: Option<SpendConstraints>,
    /// The upper tolerance bound; successors costing more than the
    /// best accepted cost amplified by this factor are pruned.
    /// `None` disables the prune.
    pub tolerance_amplifier: Option<Decimal>,
    pub result_limit: usize,
}

struct QueueEntry {
    seq: u64,
    state: SearchState,
}

impl QueueEntry {
    fn key(&self) -> (&Decimal, u32, &str, u64) {
        (
            &self.state.cost,
            self.state.hops,
            self.state.signature.as_str(),
            self.seq,
        )
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.key().cmp(&other.key())
    }
}

/// Runs the search, feeding every candidate that reaches the target
/// through `accept`. A `Some` payload enters the bounded result
/// collection and lowers the tolerance frontier; `None` rejects the
/// candidate and the search continues. Errors from the callback
/// propagate and abort the search.
pub(crate) fn run<P>(
    graph: &ConversionGraph,
    params: &SearchParams,
    guards: SearchGuards,
    clock: &dyn MonotonicClock,
    ordering: &dyn PathOrdering,
    accept: &mut dyn FnMut(&CandidatePath) -> Result<Option<P>>,
) -> Result<(Vec<(PathOrderKey, P)>, SearchGuardReport)> {
    // A missing source node is an empty outcome that leaves every
    // guard untouched.
    if graph.node(&params.source).is_none() {
        return Ok((Vec::new(), SearchGuardReport::empty(&guards)));
    }

    let mut registry = DominanceRegistry::new(guards.max_visited_states());
    let mut counters = GuardCounters::new(guards, clock);
    let mut queue: BinaryHeap<Reverse<QueueEntry>> = BinaryHeap::new();
    let mut results = BoundedResults::new(params.result_limit);
    let mut best_target_cost: Option<Decimal> = None;
    let mut seq: u64 = 0;
    let mut accepted: u64 = 0;

    let seed = SearchState::seed(params.source.clone(), params.constraints.clone());
    registry.register(&seed.signature, &seed.cost, seed.hops);
    queue.push(Reverse(QueueEntry { seq, state: seed }));
    seq += 1;

    loop {
        if queue.is_empty() {
            break;
        }
        if !counters.can_expand() {
            log::warn!(
                "search guard tripped after {} visited states",
                registry.len()
            );
            break;
        }
        let state = match queue.pop() {
            Some(Reverse(entry)) => entry.state,
            None => break,
        };

        if registry.is_superseded(&state.signature, &state.cost, state.hops) {
            continue;
        }

        if state.node == params.target && state.hops > 0 {
            let candidate = CandidatePath::from_state(&state);
            if let Some(payload) = accept(&candidate)? {
                log::trace!("accepted candidate {}", candidate.route_signature());
                let key = PathOrderKey {
                    cost: candidate.cost.clone(),
                    hops: candidate.hops,
                    route_signature: candidate.route_signature(),
                    insertion_order: accepted,
                };
                accepted += 1;
                results.insert(key, payload, ordering);
                best_target_cost = Some(match best_target_cost.take() {
                    None => state.cost.clone(),
                    Some(best) => {
                        if state.cost < best {
                            state.cost.clone()
                        } else {
                            best
                        }
                    }
                });
            }
            // target states are never expanded further
            continue;
        }

        if state.hops >= params.max_hops {
            continue;
        }
        counters.record_expansion();

        let node = match graph.node(&state.node) {
            Some(node) => node,
            None => continue,
        };
        for edge in node.edges() {
            // an order can be traversed at most once per path
            if state.uses_order(edge.order_id()) {
                continue;
            }
            let successor = match state.successor(edge)? {
                Some(successor) => successor,
                None => continue,
            };

            if let (Some(best), Some(amplifier)) = (&best_target_cost, &params.tolerance_amplifier)
            {
                let factor = Decimal::one().add(amplifier, amplifier.scale().max(1))?;
                let frontier = best.mul(&factor, CANONICAL_SCALE)?;
                if successor.cost.compare(&frontier, CANONICAL_SCALE) == CmpOrdering::Greater {
                    continue;
                }
            }

            match registry.register(&successor.signature, &successor.cost, successor.hops) {
                Registration::Dominated | Registration::Rejected => continue,
                Registration::New | Registration::Improved | Registration::Incomparable => {
                    queue.push(Reverse(QueueEntry {
                        seq,
                        state: successor,
                    }));
                    seq += 1;
                }
            }
        }
    }

    let report = counters.report(registry.len(), registry.limit_reached());
    Ok((results.into_sorted(), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Money, SpendRange};
    use crate::orderbook::Order;

    fn graph(orders: Vec<Order>) -> ConversionGraph {
        let orders: Vec<_> = orders.into_iter().map(Arc::new).collect();
        ConversionGraph::from_orders(&orders, &[]).unwrap()
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

    fn params(source: &str, target: &str, constraints: Option<SpendConstraints>) -> SearchParams {
        SearchParams {
            source: Currency::new(source).unwrap(),
            target: Currency::new(target).unwrap(),
            max_hops: 3,
            constraints,
            tolerance_amplifier: None,
            result_limit: 4,
        }
    }

    fn accept_all(
        candidate: &CandidatePath,
    ) -> Result<Option<String>> {
        Ok(Some(candidate.route_signature()))
    }

    #[test]
    fn missing_source_is_an_empty_outcome_with_untouched_guards() {
        let graph = graph(orders! {
            sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"],
        });
        let clock = SystemClock::new();
        let ordering = DefaultPathOrdering::default();
        let (results, report) = run(
            &graph,
            &params("GBP", "USD", None),
            SearchGuards::default(),
            &clock,
            &ordering,
            &mut accept_all,
        )
        .unwrap();
        assert!(results.is_empty());
        assert_eq!(report.expansions, 0);
        assert_eq!(report.visited_states, 0);
        assert!(!report.any_limit_reached());
    }

    #[test]
    fn finds_direct_and_bridged_routes_deterministically() {
        let book = || {
            orders! {
                sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"],
                buy "USD" / "JPY" @ "150.000" bounds ["50.000", "200.000"],
                sell "JPY" / "EUR" @ "0.007500" bounds ["10.000000", "20000.000000"],
            }
        };
        let clock = SystemClock::new();
        let ordering = DefaultPathOrdering::default();

        let mut runs = Vec::new();
        for _ in 0..5 {
            let graph = graph(book());
            let (results, _) = run(
                &graph,
                &params(
                    "EUR",
                    "JPY",
                    Some(constraints("EUR", "75.000", "125.000", "100.000")),
                ),
                SearchGuards::default(),
                &clock,
                &ordering,
                &mut accept_all,
            )
            .unwrap();
            let routes: Vec<_> = results.into_iter().map(|(_, route)| route).collect();
            runs.push(routes);
        }
        for window in runs.windows(2) {
            assert_eq!(window[0], window[1]);
        }
        // the bridge beats the direct conversion on cost
        assert_eq!(runs[0], ["EUR->USD->JPY", "EUR->JPY"]);
    }

    #[test]
    fn hop_limit_cuts_expansion() {
        let graph = graph(orders! {
            sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"],
            buy "USD" / "JPY" @ "150.000" bounds ["50.000", "200.000"],
        });
        let clock = SystemClock::new();
        let ordering = DefaultPathOrdering::default();
        let mut params = params(
            "EUR",
            "JPY",
            Some(constraints("EUR", "75.000", "125.000", "100.000")),
        );
        params.max_hops = 1;
        let (results, _) = run(
            &graph,
            &params,
            SearchGuards::default(),
            &clock,
            &ordering,
            &mut accept_all,
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn rejected_candidates_do_not_lower_the_frontier() {
        let graph = graph(orders! {
            sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"],
            buy "USD" / "JPY" @ "150.000" bounds ["50.000", "200.000"],
            sell "JPY" / "EUR" @ "0.007500" bounds ["10.000000", "20000.000000"],
        });
        let clock = SystemClock::new();
        let ordering = DefaultPathOrdering::default();
        let mut params = params(
            "EUR",
            "JPY",
            Some(constraints("EUR", "75.000", "125.000", "100.000")),
        );
        params.tolerance_amplifier = Some(Decimal::parse("0.25").unwrap());

        // rejecting everything must still visit both candidates
        let mut seen = 0usize;
        let mut reject_all = |_: &CandidatePath| -> Result<Option<()>> {
            seen += 1;
            Ok(None)
        };
        let (results, _) = run(
            &graph,
            &params,
            SearchGuards::default(),
            &clock,
            &ordering,
            &mut reject_all,
        )
        .unwrap();
        assert!(results.is_empty());
        assert_eq!(seen, 2);
    }

    #[test]
    fn tight_guards_flag_and_return_empty() {
        let graph = graph(orders! {
            sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"],
            buy "USD" / "JPY" @ "150.000" bounds ["50.000", "200.000"],
            sell "JPY" / "EUR" @ "0.007500" bounds ["10.000000", "20000.000000"],
        });
        let clock = SystemClock::new();
        let ordering = DefaultPathOrdering::default();
        let (results, report) = run(
            &graph,
            &params(
                "EUR",
                "JPY",
                Some(constraints("EUR", "75.000", "125.000", "100.000")),
            ),
            SearchGuards::new(1, 1, None).unwrap(),
            &clock,
            &ordering,
            &mut accept_all,
        )
        .unwrap();
        assert!(results.is_empty());
        assert!(report.any_limit_reached());
        assert!(report.expansions <= 1);
        assert!(report.visited_states <= 1);
    }

    #[test]
    fn an_order_is_never_traversed_twice_on_one_path() {
        // EUR -> USD -> EUR would need the same order in both
        // directions; only the one-hop cycle through a second order
        // can return, and the target equals the source which the
        // service rejects anyway. Assert no candidate repeats an
        // order identity.
        let graph = graph(orders! {
            sell "USD" / "EUR" @ "0.900" bounds ["10.000", "200.000"],
            buy "USD" / "EUR" @ "1.100" bounds ["10.000", "200.000"],
        });
        let clock = SystemClock::new();
        let ordering = DefaultPathOrdering::default();
        let mut check = |candidate: &CandidatePath| -> Result<Option<()>> {
            let mut ids: Vec<_> = candidate
                .edges()
                .iter()
                .map(|edge| edge.order_id())
                .collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), candidate.edges().len());
            Ok(Some(()))
        };
        let (_, report) = run(
            &graph,
            &params("EUR", "USD", None),
            SearchGuards::default(),
            &clock,
            &ordering,
            &mut check,
        )
        .unwrap();
        assert!(!report.any_limit_reached());
    }
}
