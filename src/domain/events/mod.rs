//! Domain events, published to NATS after the owning transaction commits.
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Bundle(BundleEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BundleEvent {
    Created { bundle_id: Uuid, store_id: Uuid },
    Published { bundle_id: Uuid, store_id: Uuid },
    Archived { bundle_id: Uuid, store_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    /// One per distinct store in the order, addressed to that store's
    /// fulfillment/notification consumers.
    Placed { order_id: Uuid, order_number: String, store_id: Uuid, bundle_ids: Vec<Uuid>, items_total: i64 },
    PaymentProofSubmitted { order_id: Uuid, order_number: String },
    Cancelled { order_id: Uuid, order_number: String },
}

impl DomainEvent {
    pub fn subject(&self) -> String {
        match self {
            DomainEvent::Bundle(BundleEvent::Created { bundle_id, .. }) => format!("catalog.bundle.{}.created", bundle_id),
            DomainEvent::Bundle(BundleEvent::Published { bundle_id, .. }) => format!("catalog.bundle.{}.published", bundle_id),
            DomainEvent::Bundle(BundleEvent::Archived { bundle_id, .. }) => format!("catalog.bundle.{}.archived", bundle_id),
            DomainEvent::Order(OrderEvent::Placed { store_id, .. }) => format!("orders.store.{}.placed", store_id),
            DomainEvent::Order(OrderEvent::PaymentProofSubmitted { order_id, .. }) => format!("orders.{}.payment_proof", order_id),
            DomainEvent::Order(OrderEvent::Cancelled { order_id, .. }) => format!("orders.{}.cancelled", order_id),
        }
    }
}
