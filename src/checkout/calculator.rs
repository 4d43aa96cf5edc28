//! Order total calculator
//!
//! Pure pricing of a validated cart: line totals, subtotal, per-store service
//! fee, grand total, and the per-store grouping used for downstream
//! fulfillment and vendor notification. Persistence is the caller's job; this
//! module never touches the database.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::Money;

use super::fees::FeeSchedule;

/// A single cart line handed to the calculator. The caller has already
/// resolved the bundle's current catalog price.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutItem {
    pub bundle_id: Uuid,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CheckoutItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

/// Items belonging to one store, in the order they appeared in the cart.
#[derive(Clone, Debug)]
pub struct StoreGroup {
    pub store_id: Uuid,
    pub items: Vec<CheckoutItem>,
}

impl StoreGroup {
    pub fn items_total(&self) -> Money {
        self.items.iter().fold(Money::ZERO, |acc, i| acc.add(&i.line_total()))
    }
}

/// Monetary breakdown of an order before it is written.
#[derive(Clone, Debug)]
pub struct OrderBreakdown {
    pub subtotal: Money,
    pub service_fee: Money,
    pub total: Money,
    /// Groups ordered by first appearance of each store in the cart.
    pub store_groups: Vec<StoreGroup>,
}

impl OrderBreakdown {
    pub fn distinct_store_count(&self) -> usize { self.store_groups.len() }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Bundle {bundle_id} has a non-positive quantity")]
    ZeroQuantity { bundle_id: Uuid },

    #[error("Bundle {bundle_id} has a negative unit price")]
    NegativeUnitPrice { bundle_id: Uuid },

    #[error("Bundle {bundle_id} is not linked to any store")]
    UnresolvedStore { bundle_id: Uuid },
}

impl CheckoutError {
    /// Malformed carts are the client's fault; a bundle without a store is a
    /// catalog consistency fault upstream.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::UnresolvedStore { .. })
    }
}

/// Price a cart.
///
/// `store_of` resolves each bundle to its owning store (catalog lookup,
/// injected for purity). `fees` is the configured service-fee schedule, a
/// monotonic step function of the distinct store count.
pub fn price_order<F>(
    items: &[CheckoutItem],
    store_of: F,
    fees: &FeeSchedule,
) -> Result<OrderBreakdown, CheckoutError>
where
    F: Fn(Uuid) -> Option<Uuid>,
{
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut subtotal = Money::ZERO;
    let mut store_groups: Vec<StoreGroup> = Vec::new();
    let mut group_index: HashMap<Uuid, usize> = HashMap::new();

    for item in items {
        if item.quantity == 0 {
            return Err(CheckoutError::ZeroQuantity { bundle_id: item.bundle_id });
        }
        if item.unit_price.is_negative() {
            return Err(CheckoutError::NegativeUnitPrice { bundle_id: item.bundle_id });
        }

        subtotal = subtotal.add(&item.line_total());

        let store_id = store_of(item.bundle_id)
            .ok_or(CheckoutError::UnresolvedStore { bundle_id: item.bundle_id })?;
        let slot = *group_index.entry(store_id).or_insert_with(|| {
            store_groups.push(StoreGroup { store_id, items: Vec::new() });
            store_groups.len() - 1
        });
        store_groups[slot].items.push(item.clone());
    }

    let service_fee = fees.fee_for(store_groups.len());
    let total = subtotal.add(&service_fee);

    Ok(OrderBreakdown { subtotal, service_fee, total, store_groups })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(n: u128) -> Uuid { Uuid::from_u128(n) }
    fn store(n: u128) -> Uuid { Uuid::from_u128(0xF000 + n) }

    fn item(bundle_id: Uuid, quantity: u32, unit_price: i64) -> CheckoutItem {
        CheckoutItem { bundle_id, quantity, unit_price: Money::new(unit_price) }
    }

    /// b1 and b2 belong to s1, b3 to s2, anything else unresolved.
    fn catalog(bundle_id: Uuid) -> Option<Uuid> {
        if bundle_id == bundle(1) || bundle_id == bundle(2) {
            Some(store(1))
        } else if bundle_id == bundle(3) {
            Some(store(2))
        } else {
            None
        }
    }

    #[test]
    fn test_two_store_cart() {
        let items = vec![item(bundle(1), 2, 75_000), item(bundle(3), 1, 55_000)];
        let fees = FeeSchedule::PerStore(Money::new(25_000));

        let breakdown = price_order(&items, catalog, &fees).unwrap();

        assert_eq!(breakdown.subtotal, Money::new(205_000));
        assert_eq!(breakdown.distinct_store_count(), 2);
        assert_eq!(breakdown.service_fee, Money::new(50_000));
        assert_eq!(breakdown.total, Money::new(255_000));
        assert_eq!(breakdown.store_groups[0].store_id, store(1));
        assert_eq!(breakdown.store_groups[0].items, vec![items[0].clone()]);
        assert_eq!(breakdown.store_groups[1].store_id, store(2));
        assert_eq!(breakdown.store_groups[1].items, vec![items[1].clone()]);
    }

    #[test]
    fn test_single_store_fee_charged_once() {
        let items = vec![item(bundle(1), 1, 10_000), item(bundle(2), 3, 5_000)];
        let fees = FeeSchedule::PerStore(Money::new(25_000));

        let breakdown = price_order(&items, catalog, &fees).unwrap();

        assert_eq!(breakdown.subtotal, Money::new(25_000));
        assert_eq!(breakdown.service_fee, Money::new(25_000));
        assert_eq!(breakdown.total, Money::new(50_000));
        assert_eq!(breakdown.store_groups.len(), 1);
        assert_eq!(breakdown.store_groups[0].items.len(), 2);
    }

    #[test]
    fn test_grouping_preserves_cart_order() {
        // Interleave the stores; each group must keep cart order.
        let items = vec![
            item(bundle(1), 1, 1_000),
            item(bundle(3), 1, 2_000),
            item(bundle(2), 1, 3_000),
        ];
        let fees = FeeSchedule::PerStore(Money::new(25_000));

        let breakdown = price_order(&items, catalog, &fees).unwrap();

        let s1 = &breakdown.store_groups[0];
        assert_eq!(s1.store_id, store(1));
        assert_eq!(s1.items, vec![items[0].clone(), items[2].clone()]);
        assert_eq!(s1.items_total(), Money::new(4_000));
        assert_eq!(breakdown.store_groups[1].items, vec![items[1].clone()]);

        // Partition: every item lands in exactly one group.
        let grouped: usize = breakdown.store_groups.iter().map(|g| g.items.len()).sum();
        assert_eq!(grouped, items.len());
    }

    #[test]
    fn test_empty_cart_rejected() {
        let fees = FeeSchedule::PerStore(Money::new(25_000));
        let err = price_order(&[], catalog, &fees).unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let items = vec![item(bundle(1), 0, 10_000)];
        let fees = FeeSchedule::PerStore(Money::new(25_000));
        let err = price_order(&items, catalog, &fees).unwrap_err();
        assert!(matches!(err, CheckoutError::ZeroQuantity { bundle_id } if bundle_id == bundle(1)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_negative_price_rejected() {
        let items = vec![item(bundle(1), 1, -500)];
        let fees = FeeSchedule::PerStore(Money::new(25_000));
        let err = price_order(&items, catalog, &fees).unwrap_err();
        assert!(matches!(err, CheckoutError::NegativeUnitPrice { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unresolved_store_is_server_fault() {
        let items = vec![item(bundle(99), 1, 10_000)];
        let fees = FeeSchedule::PerStore(Money::new(25_000));
        let err = price_order(&items, catalog, &fees).unwrap_err();
        assert!(matches!(err, CheckoutError::UnresolvedStore { .. }));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_zero_priced_item_allowed() {
        // Free bundles are legal, only negative prices are not.
        let items = vec![item(bundle(1), 2, 0)];
        let fees = FeeSchedule::PerStore(Money::new(25_000));
        let breakdown = price_order(&items, catalog, &fees).unwrap();
        assert_eq!(breakdown.subtotal, Money::ZERO);
        assert_eq!(breakdown.total, Money::new(25_000));
    }
}
