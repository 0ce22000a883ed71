//! End-to-end scenarios over the public API.

use routegraph::{
    AssetPair, Currency, ExchangeRate, FeePolicy, Money, Order, OrderBounds, OrderSide, Plan,
    ProportionalFeePolicy, Routegraph, SearchConfig, SearchGuards,
};
use std::collections::HashSet;
use std::sync::Arc;

fn order(
    side: OrderSide,
    base: &str,
    quote: &str,
    rate: &str,
    min: &str,
    max: &str,
    fees: Option<(&str, &str)>,
) -> Order {
    let policy = fees.map(|(base_fee, quote_fee)| {
        Arc::new(ProportionalFeePolicy::parse(base_fee, quote_fee).unwrap()) as Arc<dyn FeePolicy>
    });
    Order::new(
        side,
        AssetPair::parse(base, quote).unwrap(),
        OrderBounds::new(
            Money::parse(base, min).unwrap(),
            Money::parse(base, max).unwrap(),
        )
        .unwrap(),
        ExchangeRate::parse(base, quote, rate).unwrap(),
        policy,
    )
    .unwrap()
}

fn currency(code: &str) -> Currency {
    Currency::new(code).unwrap()
}

fn money(code: &str, amount: &str) -> Money {
    Money::parse(code, amount).unwrap()
}

fn bridge_book() -> Routegraph {
    Routegraph::new(vec![
        order(OrderSide::Sell, "USD", "EUR", "0.900", "10.000", "200.000", None),
        order(OrderSide::Buy, "USD", "JPY", "150.000", "50.000", "200.000", None),
        order(
            OrderSide::Sell,
            "JPY",
            "EUR",
            "0.007500",
            "10.000000",
            "20000.000000",
            None,
        ),
    ])
}

#[test]
fn direct_single_hop_conversion() {
    let book = Routegraph::new(vec![order(
        OrderSide::Sell,
        "USDT",
        "USD",
        "1.0000",
        "10.0000",
        "1000.0000",
        None,
    )]);
    let config = SearchConfig::builder(money("USD", "100.00"))
        .tolerance("0", "0.01")
        .hop_limits(1, 2)
        .build()
        .unwrap();

    let outcome = book.find_best_plans(&config, &currency("USDT")).unwrap();
    assert_eq!(outcome.plans().len(), 1);

    let plan = &outcome.plans()[0];
    assert_eq!(plan.step_count(), 1);
    assert_eq!(plan.total_spent(), &money("USD", "100.00"));
    assert_eq!(plan.total_received(), &money("USDT", "100.0000"));
    assert_eq!(plan.total_received().amount().to_string(), "100.0000");
    assert!(plan.residual_tolerance().is_zero());
    assert!(plan.is_linear());
    assert!(plan.fee_breakdown().is_empty());
}

#[test]
fn two_hop_bridge_beats_the_direct_route() {
    let config = SearchConfig::builder(money("EUR", "100.000"))
        .tolerance("0", "0.25")
        .hop_limits(1, 3)
        .build()
        .unwrap();

    let outcome = bridge_book()
        .find_best_plans(&config, &currency("JPY"))
        .unwrap();
    assert_eq!(outcome.plans().len(), 1);

    let plan = &outcome.plans()[0];
    assert_eq!(plan.route_signature(), "EUR->USD->JPY");
    assert_eq!(plan.total_spent(), &money("EUR", "100.000"));
    assert_eq!(plan.total_received(), &money("JPY", "16665.000"));
    assert!(plan.residual_tolerance().is_zero());

    let steps: Vec<_> = plan.steps().collect();
    assert_eq!(steps[0].received(), &money("USD", "111.100"));
    assert_eq!(steps[1].spent(), &money("USD", "111.100"));
    assert_eq!(steps[0].sequence(), 1);
    assert_eq!(steps[1].sequence(), 2);
}

#[test]
fn guarded_exhaustion_returns_a_flagged_empty_outcome() {
    let config = SearchConfig::builder(money("EUR", "100.000"))
        .tolerance("0", "0.25")
        .hop_limits(1, 3)
        .guards(SearchGuards::new(1, 1, None).unwrap())
        .build()
        .unwrap();

    let outcome = bridge_book()
        .find_best_plans(&config, &currency("JPY"))
        .unwrap();
    assert!(outcome.plans().is_empty());
    assert!(outcome.guard_limits().any_limit_reached());
    assert!(outcome.guard_limits().expansions <= 1);
    assert!(outcome.guard_limits().visited_states <= 1);
}

#[test]
fn minimum_hops_reject_the_only_direct_route() {
    let book = Routegraph::new(vec![order(
        OrderSide::Sell,
        "EUR",
        "USD",
        "1.1000",
        "10.0000",
        "200.0000",
        None,
    )]);
    let config = SearchConfig::builder(money("USD", "100.00"))
        .tolerance("0", "0.01")
        .hop_limits(2, 3)
        .build()
        .unwrap();

    let outcome = book.find_best_plans(&config, &currency("EUR")).unwrap();
    assert!(outcome.plans().is_empty());
    assert!(!outcome.guard_limits().any_limit_reached());
}

#[test]
fn top_k_returns_disjoint_alternatives_best_first() {
    let book = Routegraph::new(vec![
        order(
            OrderSide::Sell,
            "USDT",
            "RUB",
            "95.000000",
            "0.000000",
            "1000000.000000",
            None,
        ),
        order(
            OrderSide::Sell,
            "USDT",
            "RUB",
            "97.000000",
            "0.000000",
            "1000000.000000",
            None,
        ),
        order(
            OrderSide::Sell,
            "USDT",
            "RUB",
            "99.000000",
            "0.000000",
            "1000000.000000",
            None,
        ),
    ]);
    let config = SearchConfig::builder(money("RUB", "100000.00"))
        .tolerance("0", "0.01")
        .hop_limits(1, 3)
        .result_limit(3)
        .build()
        .unwrap();

    let outcome = book.find_best_plans(&config, &currency("USDT")).unwrap();
    assert_eq!(outcome.plans().len(), 3);

    // the best rate converts the same spend into the most target
    let received: Vec<String> = outcome
        .plans()
        .iter()
        .map(|plan| plan.total_received().amount().to_string())
        .collect();
    assert_eq!(received, ["1052.600000", "1030.900000", "1010.100000"]);

    for plan in outcome.plans() {
        assert_eq!(plan.step_count(), 1);
        assert!(plan.is_linear());
        assert_eq!(plan.total_spent(), &money("RUB", "100000.00"));
    }

    let mut seen = HashSet::new();
    for plan in outcome.plans() {
        for id in plan.order_ids() {
            assert!(seen.insert(id), "plans share an order identity");
        }
    }
}

#[test]
fn fee_aware_two_hop_accounts_every_fee() {
    let book = Routegraph::new(vec![
        order(
            OrderSide::Sell,
            "AAA",
            "USD",
            "1.000",
            "10.000",
            "500.000",
            Some(("0.05", "0.02")),
        ),
        order(
            OrderSide::Buy,
            "AAA",
            "EUR",
            "2.000",
            "5.000",
            "500.000",
            Some(("0.03", "0.015")),
        ),
    ]);
    let config = SearchConfig::builder(money("USD", "100.000"))
        .tolerance("0", "0.15")
        .hop_limits(1, 3)
        .build()
        .unwrap();

    let outcome = book.find_best_plans(&config, &currency("EUR")).unwrap();
    assert_eq!(outcome.plans().len(), 1);

    let plan = &outcome.plans()[0];
    assert_eq!(plan.total_spent(), &money("USD", "104.082"));
    assert_eq!(plan.total_received(), &money("EUR", "185.409"));
    assert_eq!(
        plan.fee_breakdown().to_vec(),
        vec![
            money("AAA", "7.925"),
            money("EUR", "2.823"),
            money("USD", "2.041"),
        ]
    );

    // spent 4.082% over the desired amount, inside the window
    assert!(plan.residual_tolerance().is_negative());
    let magnitude = plan.residual_tolerance().abs();
    assert!(magnitude > routegraph::Decimal::parse("0.04").unwrap());
    assert!(magnitude < routegraph::Decimal::parse("0.15").unwrap());
}

#[test]
fn five_runs_produce_byte_identical_orderings() {
    let run = || -> Vec<String> {
        let config = SearchConfig::builder(money("EUR", "100.000"))
            .tolerance("0", "0.25")
            .hop_limits(1, 3)
            .result_limit(2)
            .build()
            .unwrap();
        bridge_book()
            .find_best_plans(&config, &currency("JPY"))
            .unwrap()
            .plans()
            .iter()
            .map(|plan| plan.route_signature().to_owned())
            .collect()
    };

    let first = run();
    assert!(!first.is_empty());
    for _ in 0..4 {
        assert_eq!(run(), first);
    }
}

#[test]
fn capacity_prunes_the_cheaper_but_too_small_order() {
    // the 1:1 order can only absorb 100 USD and never supports a
    // 500 USD spend window; the worse-priced order wins by default
    let book = Routegraph::new(vec![
        order(
            OrderSide::Sell,
            "USDT",
            "USD",
            "1.0000",
            "10.0000",
            "100.0000",
            None,
        ),
        order(
            OrderSide::Sell,
            "USDT",
            "USD",
            "1.2500",
            "10.0000",
            "1000.0000",
            None,
        ),
    ]);
    let config = SearchConfig::builder(money("USD", "500.00"))
        .tolerance("0", "0.01")
        .build()
        .unwrap();

    let outcome = book.find_best_plans(&config, &currency("USDT")).unwrap();
    assert_eq!(outcome.plans().len(), 1);
    let plan = &outcome.plans()[0];
    assert_eq!(plan.total_received(), &money("USDT", "400.0000"));
    assert_eq!(plan.total_spent(), &money("USD", "500.00"));
}

#[test]
fn a_custom_path_ordering_can_prefer_shorter_routes() {
    use routegraph::{PathOrderKey, PathOrdering};
    use std::cmp::Ordering;

    #[derive(Debug)]
    struct HopsFirst;
    impl PathOrdering for HopsFirst {
        fn compare(&self, a: &PathOrderKey, b: &PathOrderKey) -> Ordering {
            a.hops
                .cmp(&b.hops)
                .then_with(|| a.cost.compare_rounded(&b.cost, 6))
                .then_with(|| a.route_signature.cmp(&b.route_signature))
                .then_with(|| a.insertion_order.cmp(&b.insertion_order))
        }
    }

    let config = SearchConfig::builder(money("EUR", "100.000"))
        .tolerance("0", "0.25")
        .hop_limits(1, 3)
        .path_ordering(Arc::new(HopsFirst))
        .build()
        .unwrap();
    let outcome = bridge_book()
        .find_best_plans(&config, &currency("JPY"))
        .unwrap();
    assert_eq!(outcome.plans()[0].route_signature(), "EUR->JPY");
}

#[test]
fn configured_filters_trim_the_book_before_the_search() {
    use routegraph::OrderFilter;

    #[derive(Debug)]
    struct NoJpyBridges;
    impl OrderFilter for NoJpyBridges {
        fn accepts(&self, order: &Order) -> bool {
            order.pair().quote().as_str() != "JPY"
        }
    }

    let config = SearchConfig::builder(money("EUR", "100.000"))
        .tolerance("0", "0.25")
        .hop_limits(1, 3)
        .order_filter(Arc::new(NoJpyBridges))
        .build()
        .unwrap();
    let outcome = bridge_book()
        .find_best_plans(&config, &currency("JPY"))
        .unwrap();
    // the USD->JPY leg is filtered away; only the direct route remains
    assert_eq!(outcome.plans().len(), 1);
    assert_eq!(outcome.plans()[0].route_signature(), "EUR->JPY");
}

#[test]
fn every_plan_respects_hop_and_tolerance_bounds() {
    let config = SearchConfig::builder(money("EUR", "100.000"))
        .tolerance("0", "0.25")
        .hop_limits(1, 3)
        .result_limit(2)
        .build()
        .unwrap();
    let outcome = bridge_book()
        .find_best_plans(&config, &currency("JPY"))
        .unwrap();

    let upper = routegraph::Decimal::parse("0.25").unwrap();
    let check = |plan: &Plan| {
        assert!(plan.step_count() >= 1 && plan.step_count() <= 3);
        assert!(plan.residual_tolerance().abs() <= upper);
    };
    assert!(!outcome.plans().is_empty());
    outcome.plans().iter().for_each(check);

    let report = outcome.guard_limits();
    assert!(report.expansions <= report.expansion_limit);
    assert!(report.visited_states <= report.visited_state_limit);
}
