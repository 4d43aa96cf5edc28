//! Checkout core: order pricing, service-fee policy, payment countdown
pub mod calculator;
pub mod countdown;
pub mod fees;

pub use calculator::{price_order, CheckoutError, CheckoutItem, OrderBreakdown, StoreGroup};
pub use countdown::{payment_countdown, CountdownStatus, PaymentCountdown, Remaining};
pub use fees::FeeSchedule;
