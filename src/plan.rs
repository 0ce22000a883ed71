//! Concrete execution plans: per-hop quantities, fees and totals.

pub(crate) mod materialize;
pub(crate) mod service;

use crate::decimal::{working_scale, Decimal};
use crate::error::Result;
use crate::graph::OrderId;
use crate::money::{Currency, Money};
use crate::orderbook::{FeeBreakdown, Order};
use crate::search::SearchGuardReport;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One hop of a concrete plan.
#[derive(Clone, Debug)]
pub struct Step {
    sequence: u32,
    from: Currency,
    to: Currency,
    spent: Money,
    received: Money,
    fees: FeeBreakdown,
    order: Arc<Order>,
    order_id: OrderId,
}

impl Step {
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn from(&self) -> &Currency {
        &self.from
    }

    pub fn to(&self) -> &Currency {
        &self.to
    }

    pub fn spent(&self) -> &Money {
        &self.spent
    }

    pub fn received(&self) -> &Money {
        &self.received
    }

    pub fn fees(&self) -> &FeeBreakdown {
        &self.fees
    }

    pub fn order(&self) -> &Arc<Order> {
        &self.order
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }
}

/// A fully materialised conversion plan.
#[derive(Clone, Debug)]
pub struct Plan {
    steps: Vec<Step>,
    total_spent: Money,
    total_received: Money,
    residual_tolerance: Decimal,
    fee_breakdown: Vec<Money>,
    is_linear: bool,
    route_signature: String,
}

impl Plan {
    pub(crate) fn new(
        steps: Vec<Step>,
        total_spent: Money,
        total_received: Money,
        residual_tolerance: Decimal,
        fee_breakdown: Vec<Money>,
        route_signature: String,
    ) -> Self {
        let is_linear = is_linear(&steps);
        Plan {
            steps,
            total_spent,
            total_received,
            residual_tolerance,
            fee_breakdown,
            is_linear,
            route_signature,
        }
    }

    pub fn source_currency(&self) -> &Currency {
        self.total_spent.currency()
    }

    pub fn target_currency(&self) -> &Currency {
        self.total_received.currency()
    }

    pub fn total_spent(&self) -> &Money {
        &self.total_spent
    }

    pub fn total_received(&self) -> &Money {
        &self.total_received
    }

    /// The signed fraction `(desired - spent) / desired`.
    pub fn residual_tolerance(&self) -> &Decimal {
        &self.residual_tolerance
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// Whether no asset recurs along the route, source and target
    /// excepted.
    pub fn is_linear(&self) -> bool {
        self.is_linear
    }

    pub fn route_signature(&self) -> &str {
        &self.route_signature
    }

    /// Per-currency fee totals, sorted lexicographically by currency
    /// with zero entries elided.
    pub fn fee_breakdown(&self) -> &[Money] {
        &self.fee_breakdown
    }

    pub fn order_ids(&self) -> impl Iterator<Item = OrderId> + '_ {
        self.steps.iter().map(Step::order_id)
    }
}

/// Search results in discovery order plus the aggregated guard
/// report.
#[derive(Clone, Debug)]
pub struct Outcome {
    plans: Vec<Plan>,
    guard_limits: SearchGuardReport,
}

impl Outcome {
    pub(crate) fn new(plans: Vec<Plan>, guard_limits: SearchGuardReport) -> Self {
        Outcome {
            plans,
            guard_limits,
        }
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn into_plans(self) -> Vec<Plan> {
        self.plans
    }

    pub fn guard_limits(&self) -> &SearchGuardReport {
        &self.guard_limits
    }
}

fn is_linear(steps: &[Step]) -> bool {
    let mut assets: Vec<&Currency> = Vec::with_capacity(steps.len() + 1);
    if let Some(first) = steps.first() {
        assets.push(first.from());
    }
    for step in steps {
        assets.push(step.to());
    }
    for (i, a) in assets.iter().enumerate() {
        for (j, b) in assets.iter().enumerate().skip(i + 1) {
            let endpoints = i == 0 && j == assets.len() - 1;
            if a == b && !endpoints {
                return false;
            }
        }
    }
    true
}

/// Merges per-leg fees into per-currency totals, dropping zero
/// entries and sorting currencies lexicographically.
pub(crate) fn merge_fee_breakdowns<'a>(
    breakdowns: impl Iterator<Item = &'a FeeBreakdown>,
) -> Result<Vec<Money>> {
    let mut totals: BTreeMap<Currency, Money> = BTreeMap::new();
    for breakdown in breakdowns {
        for fee in breakdown
            .base_fee
            .iter()
            .chain(breakdown.quote_fee.iter())
        {
            match totals.remove(fee.currency()) {
                None => {
                    totals.insert(fee.currency().clone(), fee.clone());
                }
                Some(total) => {
                    let sum = total.add(fee, working_scale(total.scale(), fee.scale()))?;
                    totals.insert(fee.currency().clone(), sum);
                }
            }
        }
    }
    Ok(totals
        .into_iter()
        .map(|(_, total)| total)
        .filter(|total| !total.is_zero())
        .collect())
}
