//! Pre-Order Marketplace
//!
//! Ordering platform for event-based pre-order sales: vendor stores publish
//! priced bundles, customers check out carts spanning multiple stores, and
//! each checkout writes an order, its line items, and a pending payment in
//! one transaction.
//!
//! ## Features
//! - Order total calculation with a per-store service fee
//! - Per-store grouping of line items for vendor fulfillment
//! - 24-hour payment deadline countdown derivation
//! - Bundle / cart / order aggregates with guarded status transitions
//! - Domain events for downstream notification over NATS

pub mod checkout;
pub mod domain;

pub use checkout::{
    payment_countdown, price_order, CheckoutError, CheckoutItem, CountdownStatus, FeeSchedule,
    OrderBreakdown, PaymentCountdown, Remaining, StoreGroup,
};
pub use domain::value_objects::{Money, OrderNumber};
