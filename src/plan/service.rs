//! Request validation, tolerance evaluation and the top-K driver.
//!
//! The driver builds the graph once and re-runs the search per
//! iteration against a view that excludes every order used by an
//! already accepted plan, so returned plans are disjoint by
//! construction. Guard budgets are aggregated: each iteration runs
//! against what the previous iterations left over.

use crate::api::SearchConfig;
use crate::decimal::{Decimal, CANONICAL_SCALE};
use crate::error::{Error, Result};
use crate::graph::{ConversionGraph, ExclusionSet};
use crate::money::{Currency, Money, SpendConstraints, SpendRange};
use crate::orderbook::Order;
use crate::plan::materialize::{analyze_spend, materialize, MaterializedPlan};
use crate::plan::{merge_fee_breakdowns, Outcome, Plan, Step};
use crate::search::{self, CandidatePath, SearchGuardReport, SearchParams};
use std::cmp::Ordering;
use std::sync::Arc;

pub(crate) fn find_best_plans(
    orders: &[Arc<Order>],
    config: &SearchConfig,
    target: &Currency,
) -> Result<Outcome> {
    let source = config.spend_amount().currency().clone();
    if &source == target {
        return Err(Error::invalid_input(format!(
            "source and target are both {}",
            source
        )));
    }

    let constraints = derive_spend_constraints(config)?;
    let graph = ConversionGraph::from_orders(orders, config.order_filters())?;

    let amplifier = if config.tolerance().upper().is_zero() {
        None
    } else {
        Some(config.tolerance().upper().clone())
    };

    let mut excluded = ExclusionSet::new();
    let mut plans: Vec<Plan> = Vec::new();
    let mut aggregate = SearchGuardReport::empty(config.guards());
    let mut remaining = Some(config.guards().clone());

    for iteration in 0..config.result_limit() {
        let guards = match remaining.take() {
            None => break,
            Some(guards) => guards,
        };
        let view = graph.without_orders(&excluded);
        let params = SearchParams {
            source: source.clone(),
            target: target.clone(),
            max_hops: config.hop_limits().max(),
            constraints: Some(constraints.clone()),
            tolerance_amplifier: amplifier.clone(),
            result_limit: config.result_limit(),
        };

        let mut callback = |candidate: &CandidatePath| -> Result<Option<Plan>> {
            evaluate_candidate(candidate, config, target, &constraints)
        };
        let (results, report) = search::run(
            &view,
            &params,
            guards,
            config.clock().as_ref(),
            config.path_ordering().as_ref(),
            &mut callback,
        )?;
        aggregate.merge(&report);
        remaining = config.guards().remaining_after(&aggregate);

        let best = match results.into_iter().next() {
            None => break,
            Some((_, plan)) => plan,
        };
        log::debug!(
            "iteration {} selected route {} spending {}",
            iteration,
            best.route_signature(),
            best.total_spent(),
        );
        excluded.extend(best.order_ids());
        plans.push(best);
    }

    if config.throw_on_guard_limit() && aggregate.any_limit_reached() {
        return Err(Error::GuardLimitExceeded(aggregate.violation_message()));
    }
    Ok(Outcome::new(plans, aggregate))
}

/// The acceptance gate: hop bounds, materialisation, tolerance
/// window.
fn evaluate_candidate(
    candidate: &CandidatePath,
    config: &SearchConfig,
    target: &Currency,
    constraints: &SpendConstraints,
) -> Result<Option<Plan>> {
    let hops = candidate.hops();
    if hops < config.hop_limits().min() || hops > config.hop_limits().max() {
        return Ok(None);
    }
    let first = match candidate.edges().first() {
        None => return Ok(None),
        Some(first) => first,
    };
    let seed = match analyze_spend(first, constraints.desired(), constraints.range().max())? {
        None => return Ok(None),
        Some(seed) => seed,
    };
    let materialized = match materialize(candidate.edges(), &seed, target)? {
        None => return Ok(None),
        Some(materialized) => materialized,
    };
    if let Some(projected) = candidate.spend() {
        log::trace!(
            "candidate {} materialised {} against the projected window [{}, {}]",
            candidate.route_signature(),
            materialized.total_received,
            projected.range().min(),
            projected.range().max(),
        );
    }

    let residual = residual_tolerance(constraints.desired(), &materialized.tolerance_spent)?;
    let magnitude = residual.abs();
    if magnitude.compare(config.tolerance().lower(), CANONICAL_SCALE) == Ordering::Less
        || magnitude.compare(config.tolerance().upper(), CANONICAL_SCALE) == Ordering::Greater
    {
        log::trace!(
            "candidate {} rejected: residual tolerance {} outside [{}, {}] (cost {}, cumulative rate {})",
            candidate.route_signature(),
            residual,
            config.tolerance().lower(),
            config.tolerance().upper(),
            candidate.cost(),
            candidate.product(),
        );
        return Ok(None);
    }

    build_plan(candidate, materialized, residual).map(Some)
}

/// The signed fraction `(desired - spent) / desired`.
fn residual_tolerance(desired: &Money, spent: &Money) -> Result<Decimal> {
    let difference = desired.amount().sub(spent.amount(), CANONICAL_SCALE)?;
    difference.div(desired.amount(), CANONICAL_SCALE)
}

fn build_plan(
    candidate: &CandidatePath,
    materialized: MaterializedPlan,
    residual: Decimal,
) -> Result<Plan> {
    let fee_breakdown = merge_fee_breakdowns(materialized.legs.iter().map(|leg| &leg.fees))?;
    let steps = materialized
        .legs
        .into_iter()
        .enumerate()
        .map(|(index, leg)| Step {
            sequence: index as u32 + 1,
            from: leg.edge.from().clone(),
            to: leg.edge.to().clone(),
            spent: leg.spent,
            received: leg.received,
            fees: leg.fees,
            order: leg.edge.order().clone(),
            order_id: leg.edge.order_id(),
        })
        .collect();
    Ok(Plan::new(
        steps,
        materialized.total_spent,
        materialized.total_received,
        residual,
        fee_breakdown,
        candidate.route_signature(),
    ))
}

/// Derives the spend window from the desired amount and the tolerance
/// bounds, at the spend amount's own scale. A window that collapses
/// to a point while the upper bound is positive means the scale
/// cannot express the tolerance.
fn derive_spend_constraints(config: &SearchConfig) -> Result<SpendConstraints> {
    let desired = config.spend_amount();
    if desired.is_zero() {
        return Err(Error::invalid_input("spend amount must be positive"));
    }
    let upper = config.tolerance().upper();
    let scale = desired.scale();

    let one = Decimal::one();
    let shrink = one.sub(upper, upper.scale().max(1))?;
    let grow = one.add(upper, upper.scale().max(1))?;
    let spend_min = desired.mul_decimal(&shrink, scale)?;
    let spend_max = desired.mul_decimal(&grow, scale)?;

    if !upper.is_zero() && spend_min == spend_max {
        return Err(Error::precision(format!(
            "tolerance bound {} collapses the spend window around {} at scale {}",
            upper, desired, scale
        )));
    }
    SpendConstraints::new(SpendRange::new(spend_min, spend_max)?, desired.clone())
}
