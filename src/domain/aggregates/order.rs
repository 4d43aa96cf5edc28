//! Order Aggregate

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use crate::checkout::OrderBreakdown;
use crate::domain::value_objects::{Money, OrderNumber};
use crate::domain::events::{DomainEvent, OrderEvent};

/// A customer's checkout record, possibly spanning multiple stores.
///
/// Totals are taken verbatim from the priced `OrderBreakdown`, so
/// `total == subtotal + service_fee` holds by construction.
#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    order_number: OrderNumber,
    customer_email: String,
    status: OrderStatus,
    payment: PaymentStatus,
    lines: Vec<OrderLine>,
    subtotal: Money,
    service_fee: Money,
    total: Money,
    bank_id: Option<Uuid>,
    pickup_date: Option<NaiveDate>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

/// Immutable once written; `total == unit_price × quantity`.
#[derive(Clone, Debug)]
pub struct OrderLine {
    pub bundle_id: Uuid,
    pub store_id: Uuid,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Ready, Completed, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Confirmed => "confirmed", Self::Processing => "processing",
            Self::Ready => "ready", Self::Completed => "completed", Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending), "confirmed" => Some(Self::Confirmed), "processing" => Some(Self::Processing),
            "ready" => Some(Self::Ready), "completed" => Some(Self::Completed), "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Fulfillment advances one step at a time; cancellation is reachable
    /// from every non-terminal state.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Confirmed) | (Confirmed, Processing) | (Processing, Ready) | (Ready, Completed) => true,
            (from, Cancelled) => !matches!(from, Completed | Cancelled),
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Failed => "failed", Self::Refunded => "refunded" }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending), "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed), "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl Order {
    /// Builds a pending order from a priced breakdown and raises one
    /// `Placed` event per store group for vendor notification.
    pub fn place(order_number: OrderNumber, customer_email: impl Into<String>, breakdown: &OrderBreakdown) -> Self {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let lines = breakdown
            .store_groups
            .iter()
            .flat_map(|g| g.items.iter().map(|i| OrderLine {
                bundle_id: i.bundle_id, store_id: g.store_id, quantity: i.quantity,
                unit_price: i.unit_price, total: i.line_total(),
            }))
            .collect();
        let mut order = Self {
            id, order_number, customer_email: customer_email.into(),
            status: OrderStatus::Pending, payment: PaymentStatus::Pending, lines,
            subtotal: breakdown.subtotal, service_fee: breakdown.service_fee, total: breakdown.total,
            bank_id: None, pickup_date: None, notes: None,
            created_at: now, updated_at: now, events: vec![],
        };
        for group in &breakdown.store_groups {
            order.events.push(DomainEvent::Order(OrderEvent::Placed {
                order_id: id,
                order_number: order.order_number.to_string(),
                store_id: group.store_id,
                bundle_ids: group.items.iter().map(|i| i.bundle_id).collect(),
                items_total: group.items_total().amount(),
            }));
        }
        order
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn customer_email(&self) -> &str { &self.customer_email }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment(&self) -> PaymentStatus { self.payment }
    pub fn lines(&self) -> &[OrderLine] { &self.lines }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn service_fee(&self) -> Money { self.service_fee }
    pub fn total(&self) -> Money { self.total }
    pub fn bank_id(&self) -> Option<Uuid> { self.bank_id }
    pub fn pickup_date(&self) -> Option<NaiveDate> { self.pickup_date }
    pub fn notes(&self) -> Option<&str> { self.notes.as_deref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn set_bank(&mut self, bank_id: Option<Uuid>) { self.bank_id = bank_id; self.touch(); }
    pub fn set_pickup_date(&mut self, date: Option<NaiveDate>) { self.pickup_date = date; self.touch(); }
    pub fn set_notes(&mut self, notes: Option<String>) { self.notes = notes; self.touch(); }

    pub fn confirm(&mut self) -> Result<(), OrderError> { self.transition(OrderStatus::Confirmed) }
    pub fn start_processing(&mut self) -> Result<(), OrderError> { self.transition(OrderStatus::Processing) }
    pub fn mark_ready(&mut self) -> Result<(), OrderError> { self.transition(OrderStatus::Ready) }
    pub fn complete(&mut self) -> Result<(), OrderError> { self.transition(OrderStatus::Completed) }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Cancelled)?;
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled {
            order_id: self.id,
            order_number: self.order_number.to_string(),
        }));
        Ok(())
    }

    pub fn mark_paid(&mut self) { self.payment = PaymentStatus::Paid; self.touch(); }

    fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition(next) {
            return Err(OrderError::IllegalTransition { from: self.status, to: next });
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone)] pub enum OrderError { IllegalTransition { from: OrderStatus, to: OrderStatus } }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalTransition { from, to } => write!(f, "Cannot move order from {} to {}", from.as_str(), to.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{price_order, CheckoutItem, FeeSchedule};

    fn two_store_breakdown() -> OrderBreakdown {
        let items = vec![
            CheckoutItem { bundle_id: Uuid::from_u128(1), quantity: 2, unit_price: Money::new(75_000) },
            CheckoutItem { bundle_id: Uuid::from_u128(2), quantity: 1, unit_price: Money::new(55_000) },
        ];
        let store_of = |b: Uuid| Some(Uuid::from_u128(100 + b.as_u128()));
        price_order(&items, store_of, &FeeSchedule::PerStore(Money::new(25_000))).unwrap()
    }

    #[test]
    fn test_place_keeps_breakdown_invariant() {
        let mut order = Order::place(OrderNumber::generate(), "dina@example.com", &two_store_breakdown());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment(), PaymentStatus::Pending);
        assert_eq!(order.total(), order.subtotal().add(&order.service_fee()));
        let lines_total = order.lines().iter().fold(Money::ZERO, |acc, l| acc.add(&l.total));
        assert_eq!(order.total(), lines_total.add(&order.service_fee()));
        // One Placed event per store.
        assert_eq!(order.take_events().len(), 2);
    }

    #[test]
    fn test_fulfillment_workflow() {
        let mut order = Order::place(OrderNumber::generate(), "dina@example.com", &two_store_breakdown());
        order.confirm().unwrap();
        order.mark_paid();
        order.start_processing().unwrap();
        order.mark_ready().unwrap();
        order.complete().unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(order.payment(), PaymentStatus::Paid);
    }

    #[test]
    fn test_cannot_skip_ahead() {
        let mut order = Order::place(OrderNumber::generate(), "dina@example.com", &two_store_breakdown());
        assert!(order.mark_ready().is_err());
        assert!(order.complete().is_err());
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_cancel_guards() {
        let mut order = Order::place(OrderNumber::generate(), "dina@example.com", &two_store_breakdown());
        order.take_events();
        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.take_events().len(), 1);
        assert!(order.cancel().is_err()); // already terminal

        let mut done = Order::place(OrderNumber::generate(), "dina@example.com", &two_store_breakdown());
        done.confirm().unwrap();
        done.start_processing().unwrap();
        done.mark_ready().unwrap();
        done.complete().unwrap();
        assert!(done.cancel().is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for s in [OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Processing, OrderStatus::Ready, OrderStatus::Completed, OrderStatus::Cancelled] {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
        assert_eq!(PaymentStatus::parse("paid"), Some(PaymentStatus::Paid));
    }
}
