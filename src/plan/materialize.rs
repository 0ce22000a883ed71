//! The leg materialiser: turns an accepted edge sequence into
//! concrete per-hop spent/received amounts with fees.
//!
//! Materialisation either produces exact amounts or reports the
//! candidate as not materialisable; the caller discards such
//! candidates and the search moves on.

use crate::decimal::{working_scale, Decimal, CANONICAL_SCALE};
use crate::error::Result;
use crate::graph::GraphEdge;
use crate::money::{Currency, Money};
use crate::orderbook::{FeeBreakdown, OrderSide};
use std::cmp::Ordering;
use std::sync::Arc;

/// Relative mismatch the sell-leg resolver absorbs between the
/// targeted and the actually collectable quote amount; covers HALF_UP
/// rounding noise, never business-level gaps.
const SELL_RESOLUTION_SCALE: i64 = 6;

fn sell_resolution_tolerance() -> Decimal {
    Decimal::from_units(1, 4).expect("static scale is valid")
}

fn sell_resolution_epsilon() -> Decimal {
    Decimal::from_units(1, 6).expect("static scale is valid")
}

/// The first-leg seed produced by the spend analyser: the
/// maker-credited net, the router-side gross and the spend ceiling.
#[derive(Clone, Debug)]
pub(crate) struct SpendSeed {
    pub net: Money,
    pub gross: Money,
    pub ceiling: Money,
}

/// Seeds the first leg for a desired spend, picking the largest
/// feasible gross at or below the window maximum. Returns `None` when
/// the edge's mandatory minimum already exceeds the ceiling.
pub(crate) fn analyze_spend(
    edge: &GraphEdge,
    desired: &Money,
    spend_max: &Money,
) -> Result<Option<SpendSeed>> {
    if edge
        .spend_capacity()
        .min()
        .compare(spend_max)?
        == Ordering::Greater
    {
        return Ok(None);
    }
    let (net, gross) = match edge.order().fee_policy() {
        None => (desired.clone(), desired.clone()),
        Some(policy) => {
            let net = policy.seed_spend(edge.side(), desired)?;
            let gross = policy.gross_spend(edge.side(), &net)?;
            (net, gross)
        }
    };
    Ok(Some(SpendSeed {
        net,
        gross,
        ceiling: spend_max.clone(),
    }))
}

/// One materialised hop.
#[derive(Clone, Debug)]
pub(crate) struct Leg {
    pub edge: Arc<GraphEdge>,
    pub spent: Money,
    pub received: Money,
    pub fees: FeeBreakdown,
}

/// The materialised whole: per-leg amounts plus totals.
#[derive(Clone, Debug)]
pub(crate) struct MaterializedPlan {
    pub legs: Vec<Leg>,
    pub total_spent: Money,
    pub total_received: Money,
    /// Source budget actually consumed, the input to the tolerance
    /// evaluator.
    pub tolerance_spent: Money,
}

pub(crate) fn materialize(
    edges: &[Arc<GraphEdge>],
    seed: &SpendSeed,
    target: &Currency,
) -> Result<Option<MaterializedPlan>> {
    let source = seed.gross.currency().clone();
    let mut tolerance_spent = Money::zero(source.clone());
    let mut legs: Vec<Leg> = Vec::with_capacity(edges.len());
    let mut current = seed.gross.clone();

    for (index, edge) in edges.iter().enumerate() {
        let fill = if index == 0 {
            resolve_first_leg(edge, seed)?
        } else {
            resolve_leg(edge, &current)?
        };
        let fill = match fill {
            None => return Ok(None),
            Some(fill) => fill,
        };

        // only spends in the source currency consume the budget
        if fill.spent.currency() == &source {
            tolerance_spent = tolerance_spent.add(
                &fill.spent,
                working_scale(tolerance_spent.scale(), fill.spent.scale()),
            )?;
        }

        current = fill.received.clone();
        if let Some(next) = edges.get(index + 1) {
            // align the running amount to the downstream bounds scale
            let scale = current.scale().max(next.order().bounds().scale());
            current = current.with_scale(scale)?;
        }
        legs.push(Leg {
            edge: edge.clone(),
            spent: fill.spent,
            received: fill.received,
            fees: fill.fees,
        });
    }

    if current.currency() != target {
        return Ok(None);
    }
    let total_spent = match legs.first() {
        None => return Ok(None),
        Some(first) => first.spent.clone(),
    };
    Ok(Some(MaterializedPlan {
        total_received: current,
        legs,
        total_spent,
        tolerance_spent,
    }))
}

struct LegFill {
    spent: Money,
    received: Money,
    fees: FeeBreakdown,
}

/// The first leg is driven by the analyser seed; the gross is scaled
/// down proportionally when the ceiling tightens it and lifted to the
/// order minimum when feasible.
fn resolve_first_leg(edge: &Arc<GraphEdge>, seed: &SpendSeed) -> Result<Option<LegFill>> {
    let mut net = seed.net.clone();
    let mut gross = seed.gross.clone();

    if gross.compare(&seed.ceiling)? == Ordering::Greater {
        let ratio = seed
            .ceiling
            .amount()
            .div(gross.amount(), CANONICAL_SCALE)?;
        if ratio.is_zero() || ratio.is_negative() {
            return Ok(None);
        }
        net = net.mul_decimal(&ratio, working_scale(net.scale(), seed.ceiling.scale()))?;
        gross = gross_spend(edge, &net)?;
        if gross.compare(&seed.ceiling)? == Ordering::Greater {
            // rounding dust after the rescale; the budget still holds
            gross = seed.ceiling.clone();
        }
    }

    resolve_leg_amounts(edge, net, gross, Some(&seed.ceiling))
}

/// Later legs push the full amount delivered upstream through the
/// edge.
fn resolve_leg(edge: &Arc<GraphEdge>, incoming: &Money) -> Result<Option<LegFill>> {
    let net = match edge.order().fee_policy() {
        None => incoming.clone(),
        Some(policy) => policy.net_spend(edge.side(), incoming)?,
    };
    resolve_leg_amounts(edge, net, incoming.clone(), None)
}

fn gross_spend(edge: &Arc<GraphEdge>, net: &Money) -> Result<Money> {
    match edge.order().fee_policy() {
        None => Ok(net.clone()),
        Some(policy) => policy.gross_spend(edge.side(), net),
    }
}

fn resolve_leg_amounts(
    edge: &Arc<GraphEdge>,
    net: Money,
    gross: Money,
    ceiling: Option<&Money>,
) -> Result<Option<LegFill>> {
    match edge.side() {
        OrderSide::Buy => resolve_buy_fill(edge, net, gross, ceiling),
        OrderSide::Sell => resolve_sell_leg(edge, net, gross, ceiling),
    }
}

/// Resolves a buy leg: the net base is the maker-credited fill and
/// must respect the order bounds; fees gross the router's spend up
/// and trim the quote delivered.
fn resolve_buy_fill(
    edge: &Arc<GraphEdge>,
    mut net: Money,
    mut gross: Money,
    ceiling: Option<&Money>,
) -> Result<Option<LegFill>> {
    let bounds = edge.order().bounds();
    if net.compare(bounds.min())? == Ordering::Less {
        // only the budget-driven first leg may spend more to reach
        // the mandatory minimum
        let ceiling = match ceiling {
            None => return Ok(None),
            Some(ceiling) => ceiling,
        };
        net = bounds.min().clone();
        gross = gross_spend(edge, &net)?;
        if gross.compare(ceiling)? == Ordering::Greater {
            return Ok(None);
        }
    }
    if net.compare(bounds.max())? == Ordering::Greater {
        net = bounds.max().clone();
        gross = gross_spend(edge, &net)?;
    }

    let quote = edge.rate().convert(&net)?;
    let (quote_fee, base_fee) = match edge.order().fee_policy() {
        None => (None, None),
        Some(policy) => {
            let fees = policy.assess(OrderSide::Buy, &net, &quote)?;
            let base_fee = gross.sub(&net, working_scale(gross.scale(), net.scale()))?;
            (fees.quote_fee, Some(base_fee))
        }
    };
    let received = match &quote_fee {
        None => quote,
        Some(fee) => quote.sub(fee, working_scale(quote.scale(), fee.scale()))?,
    };

    Ok(Some(LegFill {
        spent: gross,
        received,
        fees: FeeBreakdown {
            base_fee,
            quote_fee,
        },
    }))
}

/// Resolves a sell leg: finds the base amount whose quote cost equals
/// the incoming net quote, or the largest feasible amount when the
/// order capacity binds. Mid-path legs absorb inversion rounding by
/// rescaling proportionally against the actually collectable quote.
fn resolve_sell_leg(
    edge: &Arc<GraphEdge>,
    net_quote: Money,
    gross_quote: Money,
    ceiling: Option<&Money>,
) -> Result<Option<LegFill>> {
    let bounds = edge.order().bounds();
    let mut net = net_quote;
    let mut gross = gross_quote;
    let mut base = edge.conversion.convert(&net)?;

    if base.compare(bounds.min())? == Ordering::Less {
        let ceiling = match ceiling {
            None => return Ok(None),
            Some(ceiling) => ceiling,
        };
        base = bounds.min().clone();
        net = edge.rate().convert(&base)?;
        gross = gross_spend(edge, &net)?;
        if gross.compare(ceiling)? == Ordering::Greater {
            return Ok(None);
        }
    } else if base.compare(bounds.max())? == Ordering::Greater {
        // capacity binds: deliver the largest feasible amount
        base = bounds.max().clone();
        net = edge.rate().convert(&base)?;
        gross = gross_spend(edge, &net)?;
    } else if ceiling.is_none() {
        // a budgeted mid-path leg must collect the incoming quote
        // exactly; rescale against the collectable amount
        let actual = edge.rate().convert(&base)?;
        let ratio = net.amount().div(actual.amount(), CANONICAL_SCALE)?;
        if ratio.is_zero() || ratio.is_negative() {
            return Ok(None);
        }
        if !within_sell_resolution_tolerance(&net, &actual)? {
            return Ok(None);
        }
        base = base.mul_decimal(&ratio, base.scale())?;
    }

    let (base_fee, quote_fee) = match edge.order().fee_policy() {
        None => (None, None),
        Some(policy) => {
            let fees = policy.assess(OrderSide::Sell, &base, &net)?;
            let quote_fee = gross.sub(&net, working_scale(gross.scale(), net.scale()))?;
            (fees.base_fee, Some(quote_fee))
        }
    };
    let received = match &base_fee {
        None => base,
        Some(fee) => base.sub(fee, working_scale(base.scale(), fee.scale()))?,
    };

    Ok(Some(LegFill {
        spent: gross,
        received,
        fees: FeeBreakdown {
            base_fee,
            quote_fee,
        },
    }))
}

/// Exact match when both are zero; otherwise the relative mismatch
/// `|target - actual| / max(|target|, eps)` must stay within the
/// resolution tolerance.
fn within_sell_resolution_tolerance(target: &Money, actual: &Money) -> Result<bool> {
    if target.is_zero() || actual.is_zero() {
        return Ok(target.is_zero() && actual.is_zero());
    }
    let difference = target
        .amount()
        .sub(actual.amount(), CANONICAL_SCALE)?
        .abs();
    let magnitude = target.amount().abs();
    let epsilon = sell_resolution_epsilon();
    let denominator = if magnitude.compare(&epsilon, SELL_RESOLUTION_SCALE) == Ordering::Less {
        epsilon
    } else {
        magnitude
    };
    let relative = difference.div(&denominator, SELL_RESOLUTION_SCALE)?;
    Ok(relative.compare_rounded(&sell_resolution_tolerance(), SELL_RESOLUTION_SCALE)
        != Ordering::Greater)
}
