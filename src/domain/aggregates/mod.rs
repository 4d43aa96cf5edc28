//! Aggregates module
pub mod bundle;
pub mod order;
pub mod cart;

pub use bundle::{Bundle, BundleError, BundleStatus};
pub use order::{Order, OrderError, OrderLine, OrderStatus, PaymentStatus};
pub use cart::{Cart, CartError, CartItem};
