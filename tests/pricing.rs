//! Property tests for the order total calculator.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use uuid::Uuid;

use preorder_market::{price_order, CheckoutItem, FeeSchedule, Money};

fn bundle(n: u8) -> Uuid {
    Uuid::from_u128(u128::from(n) + 1)
}

/// Deterministic catalog: six bundles spread over three stores.
fn store_of(bundle_id: Uuid) -> Option<Uuid> {
    Some(Uuid::from_u128(1_000 + bundle_id.as_u128() % 3))
}

fn cart_strategy() -> impl Strategy<Value = Vec<CheckoutItem>> {
    prop::collection::vec((0u8..6, 1u32..=5, 0i64..=1_000_000), 1..=12).prop_map(|raw| {
        raw.into_iter()
            .map(|(b, quantity, price)| CheckoutItem { bundle_id: bundle(b), quantity, unit_price: Money::new(price) })
            .collect()
    })
}

proptest! {
    #[test]
    fn subtotal_is_exact_sum_of_line_totals(items in cart_strategy(), fee in 0i64..=100_000) {
        let fees = FeeSchedule::PerStore(Money::new(fee));
        let breakdown = price_order(&items, store_of, &fees).unwrap();

        let expected: i64 = items.iter().map(|i| i.unit_price.amount() * i64::from(i.quantity)).sum();
        prop_assert_eq!(breakdown.subtotal.amount(), expected);
    }

    #[test]
    fn total_is_subtotal_plus_service_fee(items in cart_strategy(), fee in 0i64..=100_000) {
        let fees = FeeSchedule::PerStore(Money::new(fee));
        let breakdown = price_order(&items, store_of, &fees).unwrap();

        prop_assert_eq!(breakdown.total.amount(), breakdown.subtotal.amount() + breakdown.service_fee.amount());
        prop_assert_eq!(
            breakdown.service_fee.amount(),
            fee * breakdown.distinct_store_count() as i64
        );
    }

    #[test]
    fn grouping_partitions_the_cart_in_order(items in cart_strategy()) {
        let fees = FeeSchedule::PerStore(Money::new(25_000));
        let breakdown = price_order(&items, store_of, &fees).unwrap();

        // Every group is exactly the cart filtered to that store, in cart order.
        for group in &breakdown.store_groups {
            let expected: Vec<CheckoutItem> = items
                .iter()
                .filter(|i| store_of(i.bundle_id) == Some(group.store_id))
                .cloned()
                .collect();
            prop_assert_eq!(&group.items, &expected);
        }

        // No item is lost or duplicated across groups.
        let grouped: usize = breakdown.store_groups.iter().map(|g| g.items.len()).sum();
        prop_assert_eq!(grouped, items.len());

        // Each store appears as at most one group.
        let mut stores: Vec<Uuid> = breakdown.store_groups.iter().map(|g| g.store_id).collect();
        stores.sort();
        stores.dedup();
        prop_assert_eq!(stores.len(), breakdown.store_groups.len());
    }

    #[test]
    fn service_fee_is_monotone_in_store_count(fee in 0i64..=100_000, n in 0usize..16) {
        for fees in [FeeSchedule::PerStore(Money::new(fee)), FeeSchedule::Flat(Money::new(fee))] {
            prop_assert!(fees.fee_for(n) <= fees.fee_for(n + 1));
        }
    }
}

#[test]
fn worked_example_two_stores() {
    // 2 × 75 000 from one store plus 1 × 55 000 from another, 25 000 fee per
    // store: subtotal 205 000, fee 50 000, total 255 000.
    let b1 = bundle(0);
    let b2 = bundle(1);
    let items = vec![
        CheckoutItem { bundle_id: b1, quantity: 2, unit_price: Money::new(75_000) },
        CheckoutItem { bundle_id: b2, quantity: 1, unit_price: Money::new(55_000) },
    ];
    let fees = FeeSchedule::PerStore(Money::new(25_000));

    let breakdown = price_order(&items, store_of, &fees).unwrap();

    assert_eq!(breakdown.subtotal.amount(), 205_000);
    assert_eq!(breakdown.distinct_store_count(), 2);
    assert_eq!(breakdown.service_fee.amount(), 50_000);
    assert_eq!(breakdown.total.amount(), 255_000);
    assert_eq!(breakdown.store_groups[0].items, vec![items[0].clone()]);
    assert_eq!(breakdown.store_groups[1].items, vec![items[1].clone()]);
}
