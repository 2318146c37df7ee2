//! Checkout pricing: delivery fee by address, subtotals, and the split of an
//! order total into what is paid now and what is due later.
//!
//! Everything here is pure; the same figures are shown on the checkout page
//! and frozen into the order record. Amounts are exact decimals so that
//! `paid + due` always equals `total`.

use rust_decimal::prelude::*;

use crate::config::PricingConfig;
use crate::domain::{OrderLine, PaymentMethod};

/// Amounts for one checkout. `paid + due == total == subtotal + delivery_fee`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub paid: Decimal,
    pub due: Decimal,
}

/// Fee for shipping to `address`, picked by the first configured zone whose
/// keyword occurs in the address, ignoring case.
pub fn delivery_fee(address: &str, config: &PricingConfig) -> Decimal {
    let address = address.to_lowercase();
    config
        .zones
        .iter()
        .find(|zone| address.contains(&zone.keyword.to_lowercase()))
        .map(|zone| zone.fee)
        .unwrap_or(config.fallback_fee)
}

pub fn line_subtotal(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

pub fn subtotal(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(OrderLine::line_total).sum()
}

/// Up-front share of a pre-order, rounded half away from zero to the nearest
/// rounding step. A zero step disables rounding.
pub fn upfront_amount(subtotal: Decimal, config: &PricingConfig) -> Decimal {
    let share = subtotal * config.pre_order_ratio;
    let step = config.rounding_step;
    match share.checked_div(step) {
        Some(steps) => steps.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step,
        None => share,
    }
}

/// Splits an order into pay-now and due amounts.
///
/// Pre-orders collect the rounded up-front share regardless of method. Other
/// orders depend on the method: Bkash pays everything now, cash on delivery
/// pays only the delivery fee now. Returns `None` when neither applies, i.e.
/// no method has been chosen for a regular order.
pub fn quote(
    subtotal: Decimal,
    delivery_fee: Decimal,
    pre_order: bool,
    method: Option<PaymentMethod>,
    config: &PricingConfig,
) -> Option<Quote> {
    let total = subtotal + delivery_fee;
    let paid = if pre_order {
        upfront_amount(subtotal, config)
    } else {
        match method? {
            PaymentMethod::Bkash => total,
            PaymentMethod::CashOnDelivery => delivery_fee,
        }
    };

    Some(Quote {
        subtotal,
        delivery_fee,
        total,
        paid,
        due: total - paid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn money(text: &str) -> Decimal {
        text.parse().unwrap()
    }

    #[rstest]
    #[case("House 4, Savar Cantonment", 70)]
    #[case("SAVAR bazar", 70)]
    #[case("savar, dhaka", 70)]
    #[case("Mirpur 10, Dhaka", 110)]
    #[case("DHAKA", 110)]
    #[case("Agrabad, Chattogram", 150)]
    #[case("", 150)]
    fn test_delivery_fee_tiers(#[case] address: &str, #[case] expected: i64) {
        assert_eq!(
            delivery_fee(address, &PricingConfig::default()),
            Decimal::from(expected)
        );
    }

    #[test]
    fn test_cash_on_delivery_example() {
        let config = PricingConfig::default();
        let fee = delivery_fee("Dhaka", &config);
        let sub = line_subtotal(Decimal::from(500), 2);
        let quote = quote(sub, fee, false, Some(PaymentMethod::CashOnDelivery), &config).unwrap();

        assert_eq!(quote.subtotal, Decimal::from(1000));
        assert_eq!(quote.delivery_fee, Decimal::from(110));
        assert_eq!(quote.paid, Decimal::from(110));
        assert_eq!(quote.due, Decimal::from(1000));
        assert_eq!(quote.total, Decimal::from(1110));
    }

    #[test]
    fn test_pre_order_example() {
        let config = PricingConfig::default();
        let fee = delivery_fee("Savar", &config);
        let quote = quote(Decimal::from(400), fee, true, Some(PaymentMethod::Bkash), &config).unwrap();

        assert_eq!(quote.delivery_fee, Decimal::from(70));
        assert_eq!(quote.paid, Decimal::from(100));
        assert_eq!(quote.due, Decimal::from(370));
        assert_eq!(quote.total, Decimal::from(470));
    }

    #[test]
    fn test_fractional_pre_order_balances_exactly() {
        let config = PricingConfig::default();
        let fee = delivery_fee("Dhaka", &config);
        let quote = quote(money("22.98"), fee, true, None, &config).unwrap();

        assert_eq!(quote.total, money("132.98"));
        assert_eq!(quote.paid, Decimal::from(5));
        assert_eq!(quote.due, money("127.98"));
        assert_eq!(quote.paid + quote.due, quote.total);
    }

    #[test]
    fn test_bkash_pays_everything_now() {
        let quote = quote(
            Decimal::from(300),
            Decimal::from(150),
            false,
            Some(PaymentMethod::Bkash),
            &PricingConfig::default(),
        )
        .unwrap();
        assert_eq!(quote.paid, Decimal::from(450));
        assert_eq!(quote.due, Decimal::ZERO);
    }

    #[test]
    fn test_no_method_has_no_figures() {
        let config = PricingConfig::default();
        let (sub, fee) = (Decimal::from(300), Decimal::from(150));
        assert_eq!(quote(sub, fee, false, None, &config), None);
        assert!(quote(sub, fee, true, None, &config).is_some());
    }

    #[test]
    fn test_upfront_rounds_to_nearest_step() {
        let config = PricingConfig::default();
        // 0.25 * 1010 = 252.5 -> 50.5 steps -> 51 steps
        assert_eq!(upfront_amount(Decimal::from(1010), &config), Decimal::from(255));
        // 0.25 * 990 = 247.5 -> 49.5 steps -> 50 steps
        assert_eq!(upfront_amount(Decimal::from(990), &config), Decimal::from(250));
        assert_eq!(upfront_amount(Decimal::from(30), &config), Decimal::from(10));
    }

    #[test]
    fn test_zero_rounding_step_keeps_exact_share() {
        let config = PricingConfig {
            rounding_step: Decimal::ZERO,
            ..PricingConfig::default()
        };
        assert_eq!(upfront_amount(money("22.98"), &config), money("5.745"));
    }

    proptest! {
        #[test]
        fn prop_upfront_formula_and_balance(sub in 0i64..200_000, fee in prop::sample::select(vec![70i64, 110, 150])) {
            let config = PricingConfig::default();
            let (s, fee) = (Decimal::from(sub), Decimal::from(fee));
            let quote = quote(s, fee, true, None, &config).unwrap();
            // Integer subtotals times 0.25 land on quarter steps, so the
            // nearest multiple of 5 is exact in i64 arithmetic.
            let upfront = (sub * 25 + 250) / 500 * 5;
            prop_assert_eq!(quote.paid, Decimal::from(upfront));
            prop_assert_eq!(quote.paid + quote.due, s + fee);
        }

        #[test]
        fn prop_fractional_subtotals_balance(
            cents in 0i64..50_000_000,
            pre_order in any::<bool>(),
            bkash in any::<bool>(),
            fee in prop::sample::select(vec![70i64, 110, 150]),
        ) {
            let config = PricingConfig::default();
            let method = if bkash { PaymentMethod::Bkash } else { PaymentMethod::CashOnDelivery };
            let (s, fee) = (Decimal::new(cents, 2), Decimal::from(fee));
            let quote = quote(s, fee, pre_order, Some(method), &config).unwrap();
            prop_assert_eq!(quote.paid + quote.due, quote.total);
            prop_assert_eq!(quote.total, s + fee);
            prop_assert!(quote.due >= Decimal::ZERO);
        }

        #[test]
        fn prop_fractional_unit_prices_sum_exactly(
            prices in prop::collection::vec((1i64..1_000_000, 1u32..20), 1..6),
        ) {
            let lines: Vec<OrderLine> = prices
                .iter()
                .enumerate()
                .map(|(i, (cents, quantity))| OrderLine {
                    product_id: format!("product_{i}"),
                    name: format!("Item {i}"),
                    color: None,
                    unit_price: Decimal::new(*cents, 2),
                    quantity: *quantity,
                    pre_order: false,
                    reserved: false,
                })
                .collect();
            let expected: i64 = prices.iter().map(|(cents, q)| cents * i64::from(*q)).sum();
            prop_assert_eq!(subtotal(&lines), Decimal::new(expected, 2));
        }

        #[test]
        fn prop_delivery_fee_is_one_of_three(address in ".{0,40}") {
            let fee = delivery_fee(&address, &PricingConfig::default());
            prop_assert!([70, 110, 150].map(Decimal::from).contains(&fee));
        }

        #[test]
        fn prop_keyword_match_ignores_case(prefix in "[a-z ]{0,10}", upper in any::<bool>()) {
            let keyword = if upper { "SAVAR" } else { "Savar" };
            let address = format!("{prefix}{keyword}");
            prop_assert_eq!(delivery_fee(&address, &PricingConfig::default()), Decimal::from(70));
        }
    }
}
