//! The request contract: search configuration and its validating
//! builder.
//!
//! The builder only validates and ships values; every behavioural
//! knob of a search lives in [`SearchConfig`].

use crate::decimal::Decimal;
use crate::error::{Error, Result};
use crate::money::Money;
use crate::orderbook::OrderFilter;
use crate::search::{DefaultPathOrdering, MonotonicClock, PathOrdering, SearchGuards, SystemClock};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// The tolerance window `[lower, upper]`, both in `[0, 1)`. It seeds
/// the spend range around the desired amount and caps the search's
/// cost frontier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToleranceWindow {
    lower: Decimal,
    upper: Decimal,
}

impl ToleranceWindow {
    pub fn new(lower: Decimal, upper: Decimal) -> Result<Self> {
        for (name, bound) in &[("lower", &lower), ("upper", &upper)] {
            let in_range = !bound.is_negative()
                && bound.compare(&Decimal::one(), 0) == Ordering::Less;
            if !in_range {
                return Err(Error::invalid_input(format!(
                    "{} tolerance bound {} out of range [0, 1)",
                    name, bound
                )));
            }
        }
        if lower.compare(&upper, 0) == Ordering::Greater {
            return Err(Error::invalid_input(format!(
                "lower tolerance bound {} exceeds upper bound {}",
                lower, upper
            )));
        }
        Ok(ToleranceWindow { lower, upper })
    }

    pub fn parse(lower: &str, upper: &str) -> Result<Self> {
        ToleranceWindow::new(Decimal::parse(lower)?, Decimal::parse(upper)?)
    }

    pub fn exact() -> Self {
        ToleranceWindow {
            lower: Decimal::zero(0),
            upper: Decimal::zero(0),
        }
    }

    pub fn lower(&self) -> &Decimal {
        &self.lower
    }

    pub fn upper(&self) -> &Decimal {
        &self.upper
    }
}

/// Bounds on the number of hops a plan may take.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HopLimits {
    min: u32,
    max: u32,
}

impl HopLimits {
    pub const DEFAULT_MIN: u32 = 1;
    pub const DEFAULT_MAX: u32 = 3;

    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min < 1 {
            return Err(Error::invalid_input("minimum hop count must be at least 1"));
        }
        if max < min {
            return Err(Error::invalid_input(format!(
                "maximum hop count {} below the minimum {}",
                max, min
            )));
        }
        Ok(HopLimits { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

impl Default for HopLimits {
    fn default() -> Self {
        HopLimits {
            min: HopLimits::DEFAULT_MIN,
            max: HopLimits::DEFAULT_MAX,
        }
    }
}

/// A fully validated search request, minus the order book and target
/// asset.
#[derive(Clone)]
pub struct SearchConfig {
    spend_amount: Money,
    tolerance: ToleranceWindow,
    hop_limits: HopLimits,
    result_limit: usize,
    guards: SearchGuards,
    throw_on_guard_limit: bool,
    path_ordering: Arc<dyn PathOrdering>,
    order_filters: Vec<Arc<dyn OrderFilter>>,
    clock: Arc<dyn MonotonicClock>,
}

impl SearchConfig {
    pub fn builder(spend_amount: Money) -> SearchConfigBuilder {
        SearchConfigBuilder::new(spend_amount)
    }

    pub fn spend_amount(&self) -> &Money {
        &self.spend_amount
    }

    pub fn tolerance(&self) -> &ToleranceWindow {
        &self.tolerance
    }

    pub fn hop_limits(&self) -> &HopLimits {
        &self.hop_limits
    }

    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    pub fn guards(&self) -> &SearchGuards {
        &self.guards
    }

    pub fn throw_on_guard_limit(&self) -> bool {
        self.throw_on_guard_limit
    }

    pub fn path_ordering(&self) -> &Arc<dyn PathOrdering> {
        &self.path_ordering
    }

    pub fn order_filters(&self) -> &[Arc<dyn OrderFilter>] {
        &self.order_filters
    }

    pub fn clock(&self) -> &Arc<dyn MonotonicClock> {
        &self.clock
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("spend_amount", &self.spend_amount)
            .field("tolerance", &self.tolerance)
            .field("hop_limits", &self.hop_limits)
            .field("result_limit", &self.result_limit)
            .field("guards", &self.guards)
            .field("throw_on_guard_limit", &self.throw_on_guard_limit)
            .field("order_filters", &self.order_filters.len())
            .finish()
    }
}

/// Collects raw request values and validates them all in `build`.
pub struct SearchConfigBuilder {
    spend_amount: Money,
    tolerance_lower: String,
    tolerance_upper: String,
    hop_min: u32,
    hop_max: u32,
    result_limit: usize,
    guards: SearchGuards,
    throw_on_guard_limit: bool,
    path_ordering: Option<Arc<dyn PathOrdering>>,
    order_filters: Vec<Arc<dyn OrderFilter>>,
    clock: Option<Arc<dyn MonotonicClock>>,
}

impl SearchConfigBuilder {
    fn new(spend_amount: Money) -> Self {
        SearchConfigBuilder {
            spend_amount,
            tolerance_lower: "0".to_owned(),
            tolerance_upper: "0".to_owned(),
            hop_min: HopLimits::DEFAULT_MIN,
            hop_max: HopLimits::DEFAULT_MAX,
            result_limit: 1,
            guards: SearchGuards::default(),
            throw_on_guard_limit: false,
            path_ordering: None,
            order_filters: Vec::new(),
            clock: None,
        }
    }

    /// Tolerance bounds as decimal strings, e.g. `("0", "0.01")`.
    pub fn tolerance(mut self, lower: &str, upper: &str) -> Self {
        self.tolerance_lower = lower.to_owned();
        self.tolerance_upper = upper.to_owned();
        self
    }

    pub fn hop_limits(mut self, min: u32, max: u32) -> Self {
        self.hop_min = min;
        self.hop_max = max;
        self
    }

    pub fn result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    pub fn guards(mut self, guards: SearchGuards) -> Self {
        self.guards = guards;
        self
    }

    pub fn throw_on_guard_limit(mut self, throw: bool) -> Self {
        self.throw_on_guard_limit = throw;
        self
    }

    pub fn path_ordering(mut self, ordering: Arc<dyn PathOrdering>) -> Self {
        self.path_ordering = Some(ordering);
        self
    }

    pub fn order_filter(mut self, filter: Arc<dyn OrderFilter>) -> Self {
        self.order_filters.push(filter);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn MonotonicClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<SearchConfig> {
        if self.result_limit < 1 {
            return Err(Error::invalid_input("result limit must be at least 1"));
        }
        let tolerance = ToleranceWindow::parse(&self.tolerance_lower, &self.tolerance_upper)?;
        let hop_limits = HopLimits::new(self.hop_min, self.hop_max)?;
        Ok(SearchConfig {
            spend_amount: self.spend_amount,
            tolerance,
            hop_limits,
            result_limit: self.result_limit,
            guards: self.guards,
            throw_on_guard_limit: self.throw_on_guard_limit,
            path_ordering: self
                .path_ordering
                .unwrap_or_else(|| Arc::new(DefaultPathOrdering::default())),
            order_filters: self.order_filters,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock::new())),
        })
    }
}
